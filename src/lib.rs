//! Declarative JSON rule profiles with explainable validation verdicts.
//!
//! A rule document is a tree of composite rules (`AND`, `OR`, `NOT`) whose
//! leaves are atomic checks: a selector into the target document plus a
//! named command. [`Engine`] compiles rule documents and validates targets
//! against them, producing a [`ValidationReport`].
//!
//! ```
//! use rulecheck::Engine;
//! use serde_json::json;
//!
//! let rules = json!({
//!     "operator": "AND",
//!     "children": [
//!         {"selector": "$.name", "command": "required"},
//!         {"selector": "$.age", "command": "range", "arguments": {"min": 0, "max": 120}}
//!     ]
//! });
//!
//! let report = Engine::new()
//!     .validate(Some(&rules), &json!({"name": "A", "age": 30}), false)
//!     .unwrap();
//! assert!(report.valid());
//! assert_eq!(report.errors(), 0);
//! ```

mod commands;
mod compile;
mod error;
mod evaluate;
mod selector;
pub mod service;
mod types;
mod validate;

pub use commands::{CommandRegistry, JsonType, Predicate};
pub use error::RulecheckError;
pub use selector::{Resolution, Segment, Selector, SelectorError};
pub use types::{
    json_eq, AtomicResult, AtomicRule, CancelToken, CompareOp, CompileError, CompiledRules,
    CompositeRule, Detail, Engine, EngineBuilder, EvaluationContext, Operator, PresencePolicy,
    ResultTree, RuleNode, ValidationReport, DEFAULT_PARALLEL_THRESHOLD,
};
