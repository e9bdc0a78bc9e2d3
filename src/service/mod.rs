//! Transport-free rule profile service.
//!
//! [`RulesService`] stores named rule profiles in a [`ProfileStore`] and
//! validates documents against them or against inline rules. Every request
//! logs one structured `tracing` record with its outcome.

mod config;
mod error;
mod store;

use regex::Regex;
use serde_json::{json, Value};

use crate::{CancelToken, CommandRegistry, Engine, RulecheckError, ValidationReport};

pub use config::{ServiceConfig, DEFAULT_PROFILE_PATTERN, ENV_PREFIX};
pub use error::{ErrorBody, ErrorDetail, ServiceError};
pub use store::{MemoryProfileStore, ProfileStore, StoreError, ID_FIELD};

pub struct RulesService<S> {
    store: S,
    engine: Engine,
    config: ServiceConfig,
    profile_id: Regex,
}

impl<S: ProfileStore> RulesService<S> {
    /// Build a service with the built-in commands.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidConfig`] if the profile pattern is not
    /// a valid regular expression.
    pub fn new(store: S, config: ServiceConfig) -> Result<Self, ServiceError> {
        Self::with_registry(store, config, CommandRegistry::new())
    }

    /// Build a service whose engine uses `registry`, e.g. one extended with
    /// custom commands.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidConfig`] if the profile pattern is not
    /// a valid regular expression.
    pub fn with_registry(
        store: S,
        config: ServiceConfig,
        registry: CommandRegistry,
    ) -> Result<Self, ServiceError> {
        // Ids must match the pattern in full, not just contain a match.
        let profile_id = Regex::new(&format!("^(?:{})$", config.profile_pattern))
            .map_err(|e| ServiceError::InvalidConfig(format!("profile_pattern: {e}")))?;
        let engine = Engine::builder()
            .registry(registry)
            .presence_policy(config.presence_policy)
            .parallel_threshold(config.parallel_threshold)
            .build();
        Ok(Self {
            store,
            engine,
            config,
            profile_id,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn index(&self) -> Value {
        tracing::info!(method = "index", version = %self.config.version, "request served");
        json!({ "version": self.config.version })
    }

    /// Create or replace the rule profile `profile`.
    ///
    /// The payload must be a JSON object that compiles as a rule document
    /// (an empty object stores a profile with no rules).
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid id, a non-object payload, rules that
    /// do not compile, or a store failure. Nothing is stored on error.
    pub fn upsert_profile(&self, profile: &str, payload: &Value) -> Result<Value, ServiceError> {
        let result = self.try_upsert(profile, payload);
        match &result {
            Ok(_) => tracing::info!(method = "upsert_profile", profile, success = true, "request served"),
            Err(e) => log_failure("upsert_profile", profile, e),
        }
        result
    }

    fn try_upsert(&self, profile: &str, payload: &Value) -> Result<Value, ServiceError> {
        self.check_id(profile)?;
        let Some(object) = payload.as_object() else {
            return Err(ServiceError::InvalidPayload(
                "a rule profile must be a JSON object".to_owned(),
            ));
        };
        let mut object = object.clone();
        object.remove(ID_FIELD);
        let rules = Value::Object(object);
        if !rules.as_object().is_some_and(serde_json::Map::is_empty) {
            self.engine.compile(&rules)?;
        }

        if self.store.exists(profile)? {
            self.store.update_object(profile, rules)?;
        } else {
            self.store.create_object(profile, rules)?;
        }
        Ok(json!({ "success": true, "profile": profile }))
    }

    /// Fetch the stored profile, including its `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ProfileNotFound`] for an unknown profile.
    pub fn get_profile(&self, profile: &str) -> Result<Value, ServiceError> {
        let result = self
            .check_id(profile)
            .and_then(|()| self.store.get_object(profile).map_err(ServiceError::from));
        match &result {
            Ok(_) => tracing::info!(method = "get_profile", profile, success = true, "request served"),
            Err(e) => log_failure("get_profile", profile, e),
        }
        result
    }

    /// Validate `target` against the stored profile.
    ///
    /// A profile that does not exist has no rules, so the target is valid,
    /// unless `strict_profiles` is configured.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid id, an unreachable store, a stored
    /// profile that does not compile, or an unknown profile in strict mode.
    pub fn validate_profile(
        &self,
        profile: &str,
        target: &Value,
        explain: bool,
    ) -> Result<ValidationReport, ServiceError> {
        let result = self.try_validate_profile(profile, target, explain, None);
        log_validation("validate_profile", Some(profile), &result);
        result
    }

    /// Like [`validate_profile()`](Self::validate_profile), but abandons the
    /// evaluation once `token` fires.
    ///
    /// # Errors
    ///
    /// As [`validate_profile()`](Self::validate_profile), plus
    /// [`RulecheckError::Cancelled`] when the token fires first.
    pub fn validate_profile_until(
        &self,
        profile: &str,
        target: &Value,
        explain: bool,
        token: &CancelToken,
    ) -> Result<ValidationReport, ServiceError> {
        let result = self.try_validate_profile(profile, target, explain, Some(token));
        log_validation("validate_profile", Some(profile), &result);
        result
    }

    fn try_validate_profile(
        &self,
        profile: &str,
        target: &Value,
        explain: bool,
        token: Option<&CancelToken>,
    ) -> Result<ValidationReport, ServiceError> {
        self.check_id(profile)?;
        let rules = self.load_rules(profile)?;
        self.run(rules.as_ref(), target, explain, token)
    }

    fn load_rules(&self, profile: &str) -> Result<Option<Value>, ServiceError> {
        match self.store.get_object(profile) {
            Ok(mut rules) => {
                if let Some(object) = rules.as_object_mut() {
                    object.remove(ID_FIELD);
                }
                Ok(Some(rules))
            }
            Err(StoreError::NotFound(_)) if !self.config.strict_profiles => {
                tracing::warn!(profile, "profile not found, validating without rules");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate `target` against rules supplied with the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules do not compile.
    pub fn validate_inline(
        &self,
        rules: Option<&Value>,
        target: &Value,
        explain: bool,
    ) -> Result<ValidationReport, ServiceError> {
        let result = self.run(rules, target, explain, None);
        log_validation("validate_inline", None, &result);
        result
    }

    /// Validate uploaded JSON text against uploaded rule text.
    ///
    /// # Errors
    ///
    /// Returns [`RulecheckError::Json`] if either input is not valid JSON,
    /// or an error if the rules do not compile.
    pub fn validate_inline_str(
        &self,
        target: &str,
        rules: &str,
        explain: bool,
    ) -> Result<ValidationReport, ServiceError> {
        let result = parse_json(target).and_then(|target| {
            let rules = parse_json(rules)?;
            self.run(Some(&rules), &target, explain, None)
        });
        log_validation("validate_inline", None, &result);
        result
    }

    fn run(
        &self,
        rules: Option<&Value>,
        target: &Value,
        explain: bool,
        token: Option<&CancelToken>,
    ) -> Result<ValidationReport, ServiceError> {
        match token {
            Some(token) => Ok(self.engine.validate_until(rules, target, explain, token)?),
            None => Ok(self.engine.validate(rules, target, explain)?),
        }
    }

    fn check_id(&self, profile: &str) -> Result<(), ServiceError> {
        if self.profile_id.is_match(profile) {
            Ok(())
        } else {
            Err(ServiceError::InvalidProfileId {
                pattern: self.config.profile_pattern.clone(),
            })
        }
    }
}

fn parse_json(text: &str) -> Result<Value, ServiceError> {
    serde_json::from_str(text).map_err(|e| ServiceError::Rules(RulecheckError::Json(e)))
}

fn log_validation(
    method: &'static str,
    profile: Option<&str>,
    result: &Result<ValidationReport, ServiceError>,
) {
    match result {
        Ok(report) => tracing::info!(
            method,
            profile,
            success = true,
            valid = report.valid(),
            errors = report.errors(),
            "request served"
        ),
        Err(e) => log_failure(method, profile.unwrap_or_default(), e),
    }
}

fn log_failure(method: &'static str, profile: &str, error: &ServiceError) {
    match error {
        ServiceError::StoreUnavailable(_) => {
            tracing::error!(method, profile, error = %error, "profile store failure");
        }
        ServiceError::Rules(RulecheckError::Cancelled { .. }) => {
            tracing::warn!(method, profile, error = %error, "request cancelled");
        }
        _ => tracing::info!(method, profile, success = false, error = %error, "request rejected"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::PresencePolicy;

    fn service() -> RulesService<MemoryProfileStore> {
        RulesService::new(MemoryProfileStore::new(), ServiceConfig::default()).unwrap()
    }

    fn rules() -> Value {
        json!({"operator": "AND", "children": [
            {"selector": "$.name", "command": "required", "description": "name"},
            {"selector": "$.age", "command": "range", "arguments": {"min": 0, "max": 120}, "description": "age"}
        ]})
    }

    struct DownStore;

    impl ProfileStore for DownStore {
        fn exists(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn get_object(&self, _: &str) -> Result<Value, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn create_object(&self, _: &str, _: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn update_object(&self, _: &str, _: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn index_reports_version() {
        let config = ServiceConfig {
            version: "1.2.3".into(),
            ..ServiceConfig::default()
        };
        let service = RulesService::new(MemoryProfileStore::new(), config).unwrap();
        assert_eq!(service.index(), json!({"version": "1.2.3"}));
    }

    #[test]
    fn upsert_then_get() {
        let service = service();
        let reply = service.upsert_profile("people", &rules()).unwrap();
        assert_eq!(reply, json!({"success": true, "profile": "people"}));
        let stored = service.get_profile("people").unwrap();
        assert_eq!(stored["_id"], json!("people"));
        assert_eq!(stored["operator"], json!("AND"));

        service
            .upsert_profile("people", &json!({"selector": "$.x", "command": "required"}))
            .unwrap();
        assert_eq!(service.get_profile("people").unwrap()["command"], json!("required"));
        assert_eq!(service.store().len(), Ok(1));
    }

    #[test]
    fn upsert_rejects_bad_input_before_storing() {
        let service = service();
        assert!(matches!(
            service.upsert_profile("bad id!", &rules()),
            Err(ServiceError::InvalidProfileId { .. })
        ));
        assert!(matches!(
            service.upsert_profile("p", &json!([1, 2])),
            Err(ServiceError::InvalidPayload(_))
        ));
        let err = service
            .upsert_profile("p", &json!({"selector": "$.a", "command": "teleport"}))
            .unwrap_err();
        assert_eq!(err.status_and_code(), (400, "INVALID_RULES"));
        assert!(service.store().is_empty().unwrap());
    }

    #[test]
    fn pattern_must_match_whole_id() {
        let config = ServiceConfig {
            profile_pattern: "[a-z]+".into(),
            ..ServiceConfig::default()
        };
        let service = RulesService::new(MemoryProfileStore::new(), config).unwrap();
        assert!(service.upsert_profile("abc", &json!({})).is_ok());
        let err = service.upsert_profile("abc1", &json!({})).unwrap_err();
        assert!(err.to_string().ends_with(": [a-z]+"));
    }

    #[test]
    fn invalid_pattern_rejected_at_construction() {
        let config = ServiceConfig {
            profile_pattern: "(".into(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            RulesService::new(MemoryProfileStore::new(), config),
            Err(ServiceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn get_unknown_profile() {
        let err = service().get_profile("nope").unwrap_err();
        assert_eq!(err.status_and_code().0, 404);
    }

    #[test]
    fn validate_stored_profile() {
        let service = service();
        service.upsert_profile("people", &rules()).unwrap();

        let ok = service
            .validate_profile("people", &json!({"name": "A", "age": 30}), false)
            .unwrap();
        assert!(ok.valid());

        let bad = service
            .validate_profile("people", &json!({"age": 200}), true)
            .unwrap();
        assert_eq!(bad.errors(), 2);
        let ids: Vec<&str> = bad.details().unwrap().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["name", "age"]);
    }

    #[test]
    fn missing_profile_is_valid_unless_strict() {
        let report = service().validate_profile("ghost", &json!({}), true).unwrap();
        assert!(report.valid());
        assert_eq!(report.details(), Some(&[][..]));

        let strict = RulesService::new(
            MemoryProfileStore::new(),
            ServiceConfig {
                strict_profiles: true,
                ..ServiceConfig::default()
            },
        )
        .unwrap();
        assert!(matches!(
            strict.validate_profile("ghost", &json!({}), false),
            Err(ServiceError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn unavailable_store_is_surfaced() {
        let service = RulesService::new(DownStore, ServiceConfig::default()).unwrap();
        let err = service.validate_profile("p", &json!({}), false).unwrap_err();
        assert_eq!(err.status_and_code(), (503, "STORE_UNAVAILABLE"));
        assert!(matches!(
            service.upsert_profile("p", &rules()),
            Err(ServiceError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn validate_inline_and_text() {
        let service = service();
        let report = service
            .validate_inline(Some(&rules()), &json!({"name": "A", "age": 30}), false)
            .unwrap();
        assert!(report.valid());
        assert!(service.validate_inline(None, &json!(1), false).unwrap().valid());

        let report = service
            .validate_inline_str(r#"{"age": 200}"#, &rules().to_string(), false)
            .unwrap();
        assert_eq!(report.errors(), 2);

        let err = service
            .validate_inline_str("{not json", &rules().to_string(), false)
            .unwrap_err();
        assert_eq!(err.status_and_code(), (400, "INVALID_JSON"));
    }

    #[test]
    fn cancelled_profile_validation() {
        let service = service();
        service.upsert_profile("people", &rules()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = service
            .validate_profile_until("people", &json!({}), false, &token)
            .unwrap_err();
        assert_eq!(err.status_and_code().0, 504);
    }

    #[test]
    fn configured_presence_policy_reaches_engine() {
        let config = ServiceConfig {
            presence_policy: PresencePolicy::FailFast,
            ..ServiceConfig::default()
        };
        let service = RulesService::new(MemoryProfileStore::new(), config).unwrap();
        assert_eq!(service.engine().presence_policy(), PresencePolicy::FailFast);
        let rules = json!({"operator": "AND", "children": [
            {"selector": "$.age", "command": "required"},
            {"selector": "$.age", "command": "range", "arguments": {"min": 0}}
        ]});
        let report = service.validate_inline(Some(&rules), &json!({}), false).unwrap();
        assert_eq!(report.errors(), 1);
    }
}
