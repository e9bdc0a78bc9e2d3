use thiserror::Error;

use crate::CompileError;

/// Unified error type covering compilation, cancellation, and JSON input.
///
/// Returned by [`Engine::validate_until()`](crate::Engine::validate_until) and
/// by the service layer.
#[derive(Debug, Error)]
pub enum RulecheckError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("validation cancelled after {evaluated} of {total} checks")]
    Cancelled { evaluated: usize, total: usize },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
