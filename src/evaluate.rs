use crate::types::{AtomicResult, AtomicRule, CompositeRule, EvaluationContext, ResultTree, RuleNode};

pub(crate) fn evaluate(node: &RuleNode, ctx: &EvaluationContext<'_>) -> ResultTree {
    match node {
        RuleNode::Atomic(rule) => ResultTree::Atomic(eval_atomic(rule, ctx)),
        RuleNode::Composite(rule) => eval_composite(rule, ctx),
    }
}

fn eval_atomic(rule: &AtomicRule, ctx: &EvaluationContext<'_>) -> AtomicResult {
    // An empty or partial resolution is a selector miss: non-presence checks fail on it.
    let found = rule.selector.locate(ctx.document);
    let valid = rule.check.test_resolution(&found);
    atomic_result(rule, ctx, valid, true)
}

fn atomic_result(
    rule: &AtomicRule,
    ctx: &EvaluationContext<'_>,
    valid: bool,
    evaluated: bool,
) -> AtomicResult {
    AtomicResult {
        description: rule.description.clone(),
        comment: rule.comment.clone(),
        command: rule.command.clone(),
        selector: rule.selector.as_str().to_owned(),
        rule: ctx.explain.then(|| rule.raw.clone()),
        valid,
        evaluated,
    }
}

fn eval_composite(rule: &CompositeRule, ctx: &EvaluationContext<'_>) -> ResultTree {
    if ctx.cancel.is_some_and(|token| token.is_cancelled()) {
        return skip_composite(rule, ctx);
    }
    // Every child is evaluated; no short-circuit, so explain mode sees all checks.
    let children = eval_children(&rule.children, ctx);
    ResultTree::compound(rule.operator, children)
}

#[cfg(feature = "parallel")]
fn eval_children(children: &[RuleNode], ctx: &EvaluationContext<'_>) -> Vec<ResultTree> {
    use rayon::prelude::*;

    if children.len() >= ctx.rules.parallel_threshold {
        // `collect` on an indexed parallel iterator keeps declaration order.
        return children.par_iter().map(|c| evaluate(c, ctx)).collect();
    }
    children.iter().map(|c| evaluate(c, ctx)).collect()
}

#[cfg(not(feature = "parallel"))]
fn eval_children(children: &[RuleNode], ctx: &EvaluationContext<'_>) -> Vec<ResultTree> {
    children.iter().map(|c| evaluate(c, ctx)).collect()
}

/// Emit unevaluated leaves for a subtree cut off by cancellation, so the
/// result keeps the shape of the rule tree. Skipped subtrees are never valid,
/// whatever their operator.
fn skip_composite(rule: &CompositeRule, ctx: &EvaluationContext<'_>) -> ResultTree {
    ResultTree::Compound {
        operator: rule.operator,
        valid: false,
        children: rule.children.iter().map(|c| skip(c, ctx)).collect(),
    }
}

fn skip(node: &RuleNode, ctx: &EvaluationContext<'_>) -> ResultTree {
    match node {
        RuleNode::Atomic(rule) => ResultTree::Atomic(atomic_result(rule, ctx, false, false)),
        RuleNode::Composite(rule) => skip_composite(rule, ctx),
    }
}
