use std::collections::HashSet;
use std::time::Instant;

use serde_json::Value;

use crate::commands::Check;
use crate::error::RulecheckError;
use crate::selector::Segment;
use crate::types::{
    AtomicResult, AtomicRule, CancelToken, CompileError, CompiledRules, Detail, Engine,
    PresencePolicy, ResultTree, ValidationReport,
};

impl Engine {
    /// Validate `target` against a raw rule document.
    ///
    /// An absent rule document, `null`, or `{}` means there is nothing to check
    /// and the target is valid. With `explain` set, the report carries one
    /// [`Detail`] per atomic check in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if the rule document does not compile.
    /// Failing checks are never errors; they are counted in the report.
    pub fn validate(
        &self,
        rules: Option<&Value>,
        target: &Value,
        explain: bool,
    ) -> Result<ValidationReport, CompileError> {
        let start = Instant::now();
        let Some(rules) = rules.filter(|r| !is_empty_rules(r)) else {
            return Ok(empty_report(explain));
        };
        let compiled = self.compile(rules)?;
        let tree = compiled.context(target).explain(explain).evaluate();
        Ok(self.report(&compiled, &tree, explain, start))
    }

    /// Like [`validate()`](Self::validate), but stops descending into
    /// composite rules once `token` fires.
    ///
    /// # Errors
    ///
    /// Returns [`RulecheckError::Compile`] if the rule document does not
    /// compile, or [`RulecheckError::Cancelled`] if the token fired before
    /// every check was evaluated. A partial verdict is never reported.
    pub fn validate_until(
        &self,
        rules: Option<&Value>,
        target: &Value,
        explain: bool,
        token: &CancelToken,
    ) -> Result<ValidationReport, RulecheckError> {
        let start = Instant::now();
        let Some(rules) = rules.filter(|r| !is_empty_rules(r)) else {
            return Ok(empty_report(explain));
        };
        let compiled = self.compile(rules)?;
        let tree = compiled
            .context(target)
            .explain(explain)
            .cancel_with(token)
            .evaluate();

        if !tree.is_complete() {
            let leaves = tree.flatten();
            let evaluated = leaves.iter().filter(|r| r.evaluated()).count();
            tracing::warn!(evaluated, total = leaves.len(), "validation cancelled");
            return Err(RulecheckError::Cancelled {
                evaluated,
                total: leaves.len(),
            });
        }
        Ok(self.report(&compiled, &tree, explain, start))
    }

    /// Validate against rules compiled ahead of time.
    pub fn validate_compiled(
        &self,
        compiled: &CompiledRules,
        target: &Value,
        explain: bool,
    ) -> ValidationReport {
        let start = Instant::now();
        let tree = compiled.context(target).explain(explain).evaluate();
        self.report(compiled, &tree, explain, start)
    }

    fn report(
        &self,
        compiled: &CompiledRules,
        tree: &ResultTree,
        explain: bool,
        start: Instant,
    ) -> ValidationReport {
        let leaves = tree.flatten();
        let suppressed = match self.presence_policy {
            PresencePolicy::ReportAll => vec![false; leaves.len()],
            PresencePolicy::FailFast => suppressed_after_presence(&compiled.root.atomics(), &leaves),
        };

        let errors = leaves
            .iter()
            .zip(&suppressed)
            .filter(|(r, s)| !r.valid() && !**s)
            .count();

        let details = explain.then(|| {
            leaves
                .iter()
                .zip(&suppressed)
                .map(|(r, s)| detail(r, *s))
                .collect()
        });

        let duration = start.elapsed();
        tracing::debug!(
            checks = leaves.len(),
            errors,
            verdict = tree.valid(),
            ?duration,
            "validated document"
        );
        ValidationReport::new(errors, details, tree.valid(), duration)
    }
}

fn is_empty_rules(rules: &Value) -> bool {
    match rules {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn empty_report(explain: bool) -> ValidationReport {
    let report = ValidationReport::trivially_valid();
    if explain {
        report.with_empty_details()
    } else {
        report
    }
}

/// Marks failing non-presence checks that follow a failed `required` check
/// on the same location. Selectors are compared by their parsed segments, so
/// `age`, `$.age` and `$['age']` are one location. `rules` and `leaves` are in
/// the same flattened order.
fn suppressed_after_presence(rules: &[&AtomicRule], leaves: &[&AtomicResult]) -> Vec<bool> {
    let mut missing: HashSet<&[Segment]> = HashSet::new();
    rules
        .iter()
        .zip(leaves)
        .map(|(rule, result)| {
            let selector = rule.selector.segments();
            if matches!(rule.check, Check::Required) {
                if !result.valid() {
                    missing.insert(selector);
                }
                return false;
            }
            !rule.check.checks_presence() && !result.valid() && missing.contains(selector)
        })
        .collect()
}

fn detail(result: &AtomicResult, suppressed: bool) -> Detail {
    Detail {
        id: result.description.clone(),
        title: result.comment.clone(),
        command: result.command.clone(),
        rule: result.rule.clone(),
        passed: result.valid,
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{CancelToken, Engine, PresencePolicy, RulecheckError};

    fn profile() -> serde_json::Value {
        json!({
            "operator": "AND",
            "children": [
                {"selector": "$.name", "command": "required", "description": "name", "comment": "Name is present"},
                {"selector": "$.age", "command": "range", "arguments": {"min": 0, "max": 120}, "description": "age", "comment": "Age is plausible"}
            ]
        })
    }

    #[test]
    fn valid_document() {
        let report = Engine::new()
            .validate(Some(&profile()), &json!({"name": "A", "age": 30}), false)
            .unwrap();
        assert!(report.valid());
        assert_eq!(report.errors(), 0);
        assert!(report.details().is_none());
        assert!(report.verdict());
    }

    #[test]
    fn failing_document_with_explain() {
        let report = Engine::new()
            .validate(Some(&profile()), &json!({"age": 200}), true)
            .unwrap();
        assert!(!report.valid());
        assert_eq!(report.errors(), 2);
        let details = report.details().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].id, "name");
        assert_eq!(details[0].title, "Name is present");
        assert_eq!(details[1].id, "age");
        assert!(details.iter().all(|d| !d.passed && !d.suppressed));
        assert_eq!(details[1].rule.as_ref().unwrap()["command"], json!("range"));
    }

    #[test]
    fn no_rules_is_valid() {
        let engine = Engine::new();
        let doc = json!({"anything": 1});
        for rules in [None, Some(json!(null)), Some(json!({}))] {
            let report = engine.validate(rules.as_ref(), &doc, false).unwrap();
            assert!(report.valid());
            assert_eq!(report.errors(), 0);
        }
        let explained = engine.validate(None, &doc, true).unwrap();
        assert_eq!(explained.details(), Some(&[][..]));
    }

    #[test]
    fn compile_errors_surface() {
        let err = Engine::new()
            .validate(Some(&json!({"selector": "$.a", "command": "nope"})), &json!({}), false)
            .unwrap_err();
        assert_eq!(err.path(), "$");
    }

    #[test]
    fn or_counts_failing_branch_but_verdict_passes() {
        let rules = json!({"operator": "OR", "children": [
            {"selector": "$.a", "command": "required"},
            {"selector": "$.b", "command": "required"}
        ]});
        let report = Engine::new().validate(Some(&rules), &json!({"a": 1}), false).unwrap();
        assert_eq!(report.errors(), 1);
        assert!(!report.valid());
        assert!(report.verdict());
    }

    #[test]
    fn fail_fast_suppresses_after_missing_field() {
        let rules = json!({"operator": "AND", "children": [
            {"selector": "$.age", "command": "required"},
            {"selector": "$.age", "command": "range", "arguments": {"min": 0}},
            {"selector": "$.age", "command": "type", "arguments": {"type": "number"}},
            {"selector": "$.name", "command": "not_empty"}
        ]});
        let doc = json!({});

        let all = Engine::new().validate(Some(&rules), &doc, true).unwrap();
        assert_eq!(all.errors(), 4);

        let engine = Engine::builder().presence_policy(PresencePolicy::FailFast).build();
        let fast = engine.validate(Some(&rules), &doc, true).unwrap();
        assert_eq!(fast.errors(), 2);
        let flags: Vec<bool> = fast.details().unwrap().iter().map(|d| d.suppressed).collect();
        assert_eq!(flags, vec![false, true, true, false]);
        assert_eq!(fast.details().unwrap().len(), 4);
    }

    #[test]
    fn fail_fast_matches_selectors_by_location() {
        let rules = json!({"operator": "AND", "children": [
            {"selector": "$.age", "command": "required"},
            {"selector": "age", "command": "range", "arguments": {"min": 0}},
            {"selector": "$['age']", "command": "type", "arguments": {"type": "number"}}
        ]});
        let engine = Engine::builder().presence_policy(PresencePolicy::FailFast).build();
        let report = engine.validate(Some(&rules), &json!({}), true).unwrap();
        assert_eq!(report.errors(), 1);
        let flags: Vec<bool> = report.details().unwrap().iter().map(|d| d.suppressed).collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn fail_fast_ignores_checks_before_the_presence_failure() {
        let rules = json!({"operator": "AND", "children": [
            {"selector": "$.age", "command": "range", "arguments": {"min": 0}},
            {"selector": "$.age", "command": "required"}
        ]});
        let engine = Engine::builder().presence_policy(PresencePolicy::FailFast).build();
        let report = engine.validate(Some(&rules), &json!({}), false).unwrap();
        assert_eq!(report.errors(), 2);
    }

    #[test]
    fn validate_until_reports_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let err = Engine::new()
            .validate_until(Some(&profile()), &json!({"name": "A"}), false, &token)
            .unwrap_err();
        assert!(matches!(err, RulecheckError::Cancelled { evaluated: 0, total: 2 }));
    }

    #[test]
    fn validate_until_live_token_matches_validate() {
        let engine = Engine::new();
        let doc = json!({"age": 200});
        let token = CancelToken::new();
        let a = engine.validate(Some(&profile()), &doc, true).unwrap();
        let b = engine.validate_until(Some(&profile()), &doc, true, &token).unwrap();
        assert_eq!(a.errors(), b.errors());
        assert_eq!(a.details(), b.details());
    }

    #[test]
    fn validate_compiled_reuses_rules() {
        let engine = Engine::new();
        let compiled = engine.compile(&profile()).unwrap();
        assert!(engine.validate_compiled(&compiled, &json!({"name": "x", "age": 1}), false).valid());
        assert_eq!(engine.validate_compiled(&compiled, &json!({}), false).errors(), 2);
    }
}
