mod cancel;
mod compare;
mod engine;
mod error;
mod node;
mod report;
mod result;

pub use cancel::CancelToken;
pub use compare::{json_eq, CompareOp};
pub use engine::{
    CompiledRules, Engine, EngineBuilder, EvaluationContext, PresencePolicy,
    DEFAULT_PARALLEL_THRESHOLD,
};
pub use error::CompileError;
pub use node::{AtomicRule, CompositeRule, Operator, RuleNode};
pub use report::{Detail, ValidationReport};
pub use result::{AtomicResult, ResultTree};
