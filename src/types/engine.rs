use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::CommandRegistry;

use super::cancel::CancelToken;
use super::error::CompileError;
use super::node::RuleNode;
use super::result::ResultTree;

/// Composite rules with at least this many children evaluate them in parallel
/// when the `parallel` feature is enabled.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// How failures following a failed presence check are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresencePolicy {
    /// Every failing atomic check counts as an error.
    #[default]
    ReportAll,
    /// Once a `required` check fails on a selector, later failing checks on the
    /// same selector are reported as suppressed and not counted.
    FailFast,
}

/// Builder for an [`Engine`].
///
/// # Example
///
/// ```
/// use rulecheck::{EngineBuilder, PresencePolicy};
///
/// let engine = EngineBuilder::new()
///     .command("even", |value, _args| value.as_i64().is_some_and(|n| n % 2 == 0))
///     .presence_policy(PresencePolicy::FailFast)
///     .build();
/// assert!(engine.registry().contains("even"));
/// ```
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    registry: CommandRegistry,
    presence_policy: PresencePolicy,
    parallel_threshold: usize,
}

impl EngineBuilder {
    /// Start from the built-in command vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: CommandRegistry::new(),
            presence_policy: PresencePolicy::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Register a custom command. See [`CommandRegistry::register()`].
    #[must_use]
    pub fn command<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.registry.register(name, predicate);
        self
    }

    /// Replace the whole command registry.
    #[must_use]
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn presence_policy(mut self, policy: PresencePolicy) -> Self {
        self.presence_policy = policy;
        self
    }

    /// Minimum child count for fork-join evaluation of a composite rule.
    /// Clamped to at least 2.
    #[must_use]
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(2);
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            registry: Arc::new(self.registry),
            presence_policy: self.presence_policy,
            parallel_threshold: self.parallel_threshold,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles rule documents and validates JSON documents against them.
///
/// Holds no mutable state. Cheap to clone and safe to share behind `Arc`.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) registry: Arc<CommandRegistry>,
    pub(crate) presence_policy: PresencePolicy,
    pub(crate) parallel_threshold: usize,
}

impl Engine {
    /// An engine with the built-in commands and default settings.
    #[must_use]
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Compile a raw rule document.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if the document is structurally invalid or
    /// references an operator or command the engine does not know.
    pub fn compile(&self, document: &Value) -> Result<CompiledRules, CompileError> {
        let root = crate::compile::compile(document, &self.registry)?;
        Ok(CompiledRules {
            root,
            parallel_threshold: self.parallel_threshold,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[must_use]
    pub fn presence_policy(&self) -> PresencePolicy {
        self.presence_policy
    }

    #[must_use]
    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled rule tree. Immutable and thread-safe.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub(crate) root: RuleNode,
    pub(crate) parallel_threshold: usize,
}

impl CompiledRules {
    #[must_use]
    pub fn root(&self) -> &RuleNode {
        &self.root
    }

    /// Number of atomic checks, which is also the length of every flattened
    /// result produced from these rules.
    #[must_use]
    pub fn atomic_count(&self) -> usize {
        self.root.atomic_count()
    }

    /// Evaluate against `document` without explain metadata or cancellation.
    #[must_use]
    pub fn evaluate(&self, document: &Value) -> ResultTree {
        self.context(document).evaluate()
    }

    /// Build an [`EvaluationContext`] to configure explain mode or cancellation.
    #[must_use]
    pub fn context<'a>(&'a self, document: &'a Value) -> EvaluationContext<'a> {
        EvaluationContext::new(self, document)
    }
}

impl fmt::Display for CompiledRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledRules({} checks): {}", self.atomic_count(), self.root)
    }
}

/// Immutable per-call evaluation state.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub(crate) rules: &'a CompiledRules,
    pub(crate) document: &'a Value,
    pub(crate) explain: bool,
    pub(crate) cancel: Option<&'a CancelToken>,
}

impl<'a> EvaluationContext<'a> {
    #[must_use]
    pub fn new(rules: &'a CompiledRules, document: &'a Value) -> Self {
        Self {
            rules,
            document,
            explain: false,
            cancel: None,
        }
    }

    /// Retain the raw rule definition in every [`AtomicResult`](super::AtomicResult).
    #[must_use]
    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Stop descending into composite rules once `token` fires.
    #[must_use]
    pub fn cancel_with(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn document(&self) -> &'a Value {
        self.document
    }

    #[must_use]
    pub fn is_explain(&self) -> bool {
        self.explain
    }

    #[must_use]
    pub fn evaluate(&self) -> ResultTree {
        crate::evaluate::evaluate(&self.rules.root, self)
    }
}
