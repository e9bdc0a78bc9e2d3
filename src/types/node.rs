use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::commands::Check;
use crate::selector::Selector;

/// Logical operators for composite rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Combine child verdicts. `NOT` looks at its first (and only) child.
    #[must_use]
    pub fn combine(self, children: &[bool]) -> bool {
        match self {
            Operator::And => children.iter().all(|&v| v),
            Operator::Or => children.iter().any(|&v| v),
            Operator::Not => children.first().is_some_and(|&v| !v),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
            Operator::Not => write!(f, "NOT"),
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            "NOT" => Ok(Operator::Not),
            _ => Err(s.to_owned()),
        }
    }
}

/// A node in a compiled rule tree.
#[derive(Debug, Clone)]
pub enum RuleNode {
    Atomic(AtomicRule),
    Composite(CompositeRule),
}

/// A single named check applied to the values a selector resolves to.
#[derive(Debug, Clone)]
pub struct AtomicRule {
    pub(crate) selector: Selector,
    pub(crate) command: String,
    pub(crate) arguments: Value,
    pub(crate) description: String,
    pub(crate) comment: String,
    pub(crate) check: Check,
    /// The rule object as it appeared in the rule document.
    pub(crate) raw: Value,
}

/// A logical combination of child rules, kept in declaration order.
#[derive(Debug, Clone)]
pub struct CompositeRule {
    pub(crate) operator: Operator,
    pub(crate) children: Vec<RuleNode>,
}

impl RuleNode {
    /// Number of atomic checks in this subtree.
    #[must_use]
    pub fn atomic_count(&self) -> usize {
        match self {
            RuleNode::Atomic(_) => 1,
            RuleNode::Composite(c) => c.children.iter().map(RuleNode::atomic_count).sum(),
        }
    }

    /// Atomic checks in depth-first, declaration order.
    #[must_use]
    pub fn atomics(&self) -> Vec<&AtomicRule> {
        let mut out = Vec::with_capacity(self.atomic_count());
        collect_atomics(self, &mut out);
        out
    }
}

fn collect_atomics<'a>(node: &'a RuleNode, out: &mut Vec<&'a AtomicRule>) {
    match node {
        RuleNode::Atomic(a) => out.push(a),
        RuleNode::Composite(c) => {
            for child in &c.children {
                collect_atomics(child, out);
            }
        }
    }
}

impl AtomicRule {
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Command configuration; `null` when the rule has none.
    #[must_use]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    #[must_use]
    pub fn checks_presence(&self) -> bool {
        self.check.checks_presence()
    }
}

impl CompositeRule {
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn children(&self) -> &[RuleNode] {
        &self.children
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Atomic(a) => write!(f, "{}({})", a.command, a.selector),
            RuleNode::Composite(c) => {
                write!(f, "({}", c.operator)?;
                for child in &c.children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}
