use thiserror::Error;

/// Structural problems found while compiling a rule document.
///
/// Every variant carries `path`, the location of the offending node inside
/// the rule document (`$` for the root, `$.children[1]` for the second child).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("malformed rule at {path}: {reason}")]
    MalformedRule { path: String, reason: String },

    #[error("unknown operator '{operator}' at {path}")]
    UnknownOperator { path: String, operator: String },

    #[error("unknown command '{command}' at {path}")]
    UnknownCommand { path: String, command: String },

    #[error("invalid selector '{selector}' at {path}: {reason}")]
    InvalidSelector {
        path: String,
        selector: String,
        reason: String,
    },

    #[error("invalid arguments for command '{command}' at {path}: {reason}")]
    InvalidArguments {
        path: String,
        command: String,
        reason: String,
    },
}

impl CompileError {
    /// Location of the offending node in the rule document.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            CompileError::MalformedRule { path, .. }
            | CompileError::UnknownOperator { path, .. }
            | CompileError::UnknownCommand { path, .. }
            | CompileError::InvalidSelector { path, .. }
            | CompileError::InvalidArguments { path, .. } => path,
        }
    }

    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        CompileError::MalformedRule {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}
