use serde_json::Value;

use super::node::Operator;

/// Outcome of one atomic check.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicResult {
    pub(crate) description: String,
    pub(crate) comment: String,
    pub(crate) command: String,
    pub(crate) selector: String,
    pub(crate) rule: Option<Value>,
    pub(crate) valid: bool,
    pub(crate) evaluated: bool,
}

impl AtomicResult {
    /// Stable identifier of the check.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Human-readable title of the check.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The raw rule definition. Only retained when evaluating in explain mode.
    #[must_use]
    pub fn rule(&self) -> Option<&Value> {
        self.rule.as_ref()
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// `false` when cancellation stopped this check from running. Such
    /// results are always invalid.
    #[must_use]
    pub fn evaluated(&self) -> bool {
        self.evaluated
    }
}

/// Nested outcome of evaluating a rule tree. Mirrors the shape of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultTree {
    Atomic(AtomicResult),
    Compound {
        operator: Operator,
        valid: bool,
        children: Vec<ResultTree>,
    },
}

impl ResultTree {
    pub(crate) fn compound(operator: Operator, children: Vec<ResultTree>) -> Self {
        let verdicts: Vec<bool> = children.iter().map(ResultTree::valid).collect();
        ResultTree::Compound {
            operator,
            valid: operator.combine(&verdicts),
            children,
        }
    }

    /// Validity of this node: the leaf verdict, or the operator applied to
    /// the children's verdicts.
    #[must_use]
    pub fn valid(&self) -> bool {
        match self {
            ResultTree::Atomic(r) => r.valid,
            ResultTree::Compound { valid, .. } => *valid,
        }
    }

    /// Leaf results in depth-first, left-to-right order.
    #[must_use]
    pub fn flatten(&self) -> Vec<&AtomicResult> {
        let mut out = Vec::new();
        flatten_into(self, &mut out);
        out
    }

    /// Owned variant of [`flatten()`](Self::flatten).
    #[must_use]
    pub fn into_flat(self) -> Vec<AtomicResult> {
        let mut out = Vec::new();
        into_flat_inner(self, &mut out);
        out
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            ResultTree::Atomic(_) => 1,
            ResultTree::Compound { children, .. } => {
                children.iter().map(ResultTree::leaf_count).sum()
            }
        }
    }

    /// `true` when every leaf was actually evaluated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            ResultTree::Atomic(r) => r.evaluated,
            ResultTree::Compound { children, .. } => children.iter().all(ResultTree::is_complete),
        }
    }
}

fn flatten_into<'a>(tree: &'a ResultTree, out: &mut Vec<&'a AtomicResult>) {
    match tree {
        ResultTree::Atomic(r) => out.push(r),
        ResultTree::Compound { children, .. } => {
            for child in children {
                flatten_into(child, out);
            }
        }
    }
}

fn into_flat_inner(tree: ResultTree, out: &mut Vec<AtomicResult>) {
    match tree {
        ResultTree::Atomic(r) => out.push(r),
        ResultTree::Compound { children, .. } => {
            for child in children {
                into_flat_inner(child, out);
            }
        }
    }
}
