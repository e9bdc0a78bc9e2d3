use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;

/// Field the object store adds to every stored profile.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for rule profiles, keyed by profile id.
pub trait ProfileStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Fetch a stored object. The result carries the [`ID_FIELD`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn get_object(&self, id: &str) -> Result<Value, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn create_object(&self, id: &str, object: Value) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under `id`.
    fn update_object(&self, id: &str, object: Value) -> Result<(), StoreError>;
}

/// Thread-safe in-memory [`ProfileStore`].
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    objects: RwLock<HashMap<String, Value>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.objects.read().map_err(poisoned)?.len())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn with_id(id: &str, mut object: Value) -> Value {
    if let Value::Object(map) = &mut object {
        map.insert(ID_FIELD.to_owned(), Value::String(id.to_owned()));
    }
    object
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_owned())
}

impl ProfileStore for MemoryProfileStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.objects.read().map_err(poisoned)?.contains_key(id))
    }

    fn get_object(&self, id: &str) -> Result<Value, StoreError> {
        self.objects
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    fn create_object(&self, id: &str, object: Value) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(poisoned)?
            .insert(id.to_owned(), with_id(id, object));
        Ok(())
    }

    fn update_object(&self, id: &str, object: Value) -> Result<(), StoreError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        let slot = objects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        *slot = with_id(id, object);
        Ok(())
    }
}
