mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::selector::Resolution;
use crate::types::{json_eq, CompareOp};

use builtin::Builtin;
pub use builtin::JsonType;

/// Signature of a host-registered command: `(value, arguments) -> passed`.
///
/// The predicate is called once per value the selector resolves to; the check
/// passes only when every call returns `true`.
pub type Predicate = dyn Fn(&Value, &Value) -> bool + Send + Sync;

#[derive(Clone)]
enum CommandDef {
    Builtin(Builtin),
    Custom(Arc<Predicate>),
}

/// Mapping from command names to the checks they run.
///
/// [`CommandRegistry::new()`] installs the built-in vocabulary (`required`,
/// `equals`, `range`, `pattern`, ...). Hosts add their own commands with
/// [`register()`](Self::register). Rule documents referencing a name that is
/// not registered fail to compile.
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDef>,
}

/// Why a command could not be prepared for a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PrepareError {
    Unknown,
    InvalidArguments(String),
}

impl CommandRegistry {
    /// A registry with every built-in command installed.
    #[must_use]
    pub fn new() -> Self {
        let commands = Builtin::ALL
            .iter()
            .map(|&(name, builtin)| (name.to_owned(), CommandDef::Builtin(builtin)))
            .collect();
        Self { commands }
    }

    /// A registry with no commands at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a custom command. Replaces any existing command with the same name,
    /// built-ins included.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if self.commands.contains_key(&name) {
            tracing::debug!(command = %name, "replacing registered command");
        }
        self.commands
            .insert(name, CommandDef::Custom(Arc::new(predicate)));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn prepare(&self, name: &str, arguments: &Value) -> Result<Check, PrepareError> {
        match self.commands.get(name) {
            None => Err(PrepareError::Unknown),
            Some(CommandDef::Builtin(builtin)) => builtin
                .prepare(arguments)
                .map_err(PrepareError::InvalidArguments),
            Some(CommandDef::Custom(predicate)) => Ok(Check::Custom {
                predicate: Arc::clone(predicate),
                arguments: arguments.clone(),
            }),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// A command bound to its validated arguments, ready to run.
#[derive(Clone)]
pub(crate) enum Check {
    Required,
    Absent,
    Equals(Value),
    NotEquals(Value),
    Compare {
        op: CompareOp,
        value: Value,
    },
    /// Bounds are JSON numbers, so integer bounds order exactly.
    Range {
        min: Option<Value>,
        max: Option<Value>,
        exclusive: bool,
    },
    Pattern(Regex),
    OneOf(Vec<Value>),
    Type(JsonType),
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    NotEmpty,
    Contains(Value),
    Custom {
        predicate: Arc<Predicate>,
        arguments: Value,
    },
}

impl Check {
    /// Presence checks decide on whether the selector matched at all, so a
    /// selector miss is an answer for them rather than an automatic failure.
    pub(crate) fn checks_presence(&self) -> bool {
        matches!(self, Check::Required | Check::Absent)
    }

    /// Run the check over a selector resolution. When some wildcard branch
    /// missed, the location is only partly present: every check fails except
    /// `absent`, which passes only if no branch matched at all.
    pub(crate) fn test_resolution(&self, found: &Resolution<'_>) -> bool {
        if found.complete {
            self.test(&found.values)
        } else {
            matches!(self, Check::Absent) && found.values.is_empty()
        }
    }

    /// Run the check over every value the selector resolved to.
    pub(crate) fn test(&self, values: &[&Value]) -> bool {
        match self {
            Check::Required => !values.is_empty() && values.iter().all(|v| !v.is_null()),
            Check::Absent => values.is_empty(),
            _ => !values.is_empty() && values.iter().all(|v| self.test_value(v)),
        }
    }

    fn test_value(&self, value: &Value) -> bool {
        match self {
            Check::Required | Check::Absent => true,
            Check::Equals(expected) => json_eq(value, expected),
            Check::NotEquals(expected) => !json_eq(value, expected),
            Check::Compare { op, value: rhs } => op.apply(value, rhs).unwrap_or(false),
            Check::Range {
                min,
                max,
                exclusive,
            } => {
                let (above, below) = if *exclusive {
                    (CompareOp::Gt, CompareOp::Lt)
                } else {
                    (CompareOp::Gte, CompareOp::Lte)
                };
                let within = |op: CompareOp, bound: &Option<Value>| {
                    bound.as_ref().map_or(true, |b| op.apply(value, b) == Some(true))
                };
                value.is_number() && within(above, min) && within(below, max)
            }
            Check::Pattern(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Check::OneOf(allowed) => allowed.iter().any(|a| json_eq(value, a)),
            Check::Type(ty) => ty.matches(value),
            Check::Length { min, max } => builtin::length(value).is_some_and(|len| {
                min.map_or(true, |lo| len >= lo) && max.map_or(true, |hi| len <= hi)
            }),
            Check::NotEmpty => !builtin::is_empty(value),
            Check::Contains(needle) => builtin::contains(value, needle),
            Check::Custom {
                predicate,
                arguments,
            } => predicate(value, arguments),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Required => write!(f, "Required"),
            Check::Absent => write!(f, "Absent"),
            Check::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Check::NotEquals(v) => f.debug_tuple("NotEquals").field(v).finish(),
            Check::Compare { op, value } => write!(f, "Compare({op} {value})"),
            Check::Range {
                min,
                max,
                exclusive,
            } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .field("exclusive", exclusive)
                .finish(),
            Check::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Check::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Check::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            Check::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            Check::NotEmpty => write!(f, "NotEmpty"),
            Check::Contains(v) => f.debug_tuple("Contains").field(v).finish(),
            Check::Custom { arguments, .. } => {
                f.debug_struct("Custom").field("arguments", arguments).finish()
            }
        }
    }
}
