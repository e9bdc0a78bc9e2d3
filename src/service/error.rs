use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CompileError, RulecheckError};

use super::store::StoreError;

/// Structured error body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code, e.g. `PROFILE_NOT_FOUND`.
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("The profile identifier is not valid, it must match the following expression: {pattern}")]
    InvalidProfileId { pattern: String },

    #[error("This profile doesn't exist.")]
    ProfileNotFound { profile: String },

    #[error("profile store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Rules(#[from] RulecheckError),
}

impl ServiceError {
    /// Status code and machine-readable code for this error.
    #[must_use]
    pub fn status_and_code(&self) -> (u16, &'static str) {
        match self {
            Self::InvalidProfileId { .. } => (400, "INVALID_PROFILE_ID"),
            Self::ProfileNotFound { .. } => (404, "PROFILE_NOT_FOUND"),
            Self::StoreUnavailable(_) => (503, "STORE_UNAVAILABLE"),
            Self::InvalidPayload(_) => (400, "INVALID_PAYLOAD"),
            Self::InvalidConfig(_) => (500, "INVALID_CONFIG"),
            Self::Rules(RulecheckError::Compile(_)) => (400, "INVALID_RULES"),
            Self::Rules(RulecheckError::Json(_)) => (400, "INVALID_JSON"),
            Self::Rules(RulecheckError::Cancelled { .. }) => (504, "VALIDATION_CANCELLED"),
        }
    }

    /// Whether the same request may succeed if retried later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Rules(RulecheckError::Cancelled { .. })
        )
    }

    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let (_, code) = self.status_and_code();
        ErrorBody {
            error: ErrorDetail {
                code: code.to_owned(),
                message: self.to_string(),
            },
        }
    }
}

impl From<CompileError> for ServiceError {
    fn from(err: CompileError) -> Self {
        Self::Rules(err.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(profile) => Self::ProfileNotFound { profile },
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}
