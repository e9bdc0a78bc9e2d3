use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of validating a document, returned by
/// [`Engine::validate()`](crate::Engine::validate).
///
/// Serializes to the response contract
/// `{"valid": bool, "errors": int, "details": [...]}`, with `details`
/// present only in explain mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct ValidationReport {
    valid: bool,
    errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<Detail>>,
    #[serde(skip)]
    verdict: bool,
    #[serde(skip)]
    duration: Duration,
}

/// Per-check explanation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    #[serde(rename = "ID")]
    pub id: String,
    pub title: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Value>,
    pub passed: bool,
    /// Set when the failure was not counted because a presence check on the
    /// same selector already failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suppressed: bool,
}

impl ValidationReport {
    pub(crate) fn new(
        errors: usize,
        details: Option<Vec<Detail>>,
        verdict: bool,
        duration: Duration,
    ) -> Self {
        Self {
            valid: errors == 0,
            errors,
            details,
            verdict,
            duration,
        }
    }

    /// Report for a document checked against no rules at all.
    pub(crate) fn trivially_valid() -> Self {
        Self::new(0, None, true, Duration::ZERO)
    }

    /// Attach an empty detail list if explain mode was requested but there
    /// was nothing to explain.
    pub(crate) fn with_empty_details(mut self) -> Self {
        if self.details.is_none() {
            self.details = Some(Vec::new());
        }
        self
    }

    /// `true` when no counted check failed.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Number of failing atomic checks.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Per-check details, in rule declaration order. `None` unless explain
    /// mode was requested.
    #[must_use]
    pub fn details(&self) -> Option<&[Detail]> {
        self.details.as_deref()
    }

    /// Verdict of the rule tree's logical composition (AND/OR/NOT).
    ///
    /// This can differ from [`valid()`](Self::valid): an `OR` with one failing
    /// branch is a passing verdict but still reports that branch as an error.
    #[must_use]
    pub fn verdict(&self) -> bool {
        self.verdict
    }

    /// Wall-clock time spent compiling and evaluating.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "valid: {}, errors: {}", self.valid, self.errors)?;
        if let Some(details) = &self.details {
            let failed: Vec<&str> = details
                .iter()
                .filter(|d| !d.passed)
                .map(|d| d.id.as_str())
                .collect();
            write!(f, ", failed: [{}]", failed.join(", "))?;
        }
        write!(f, ", duration: {:?}", self.duration)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn detail(id: &str, passed: bool) -> Detail {
        Detail {
            id: id.to_owned(),
            title: format!("{id} title"),
            command: "required".to_owned(),
            rule: None,
            passed,
            suppressed: false,
        }
    }

    #[test]
    fn valid_follows_error_count() {
        let report = ValidationReport::new(0, None, true, Duration::from_nanos(10));
        assert!(report.valid());
        let report = ValidationReport::new(2, None, false, Duration::from_nanos(10));
        assert!(!report.valid());
        assert_eq!(report.errors(), 2);
    }

    #[test]
    fn serializes_without_details() {
        let report = ValidationReport::new(1, None, false, Duration::ZERO);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"valid": false, "errors": 1})
        );
    }

    #[test]
    fn serializes_detail_contract() {
        let mut with_rule = detail("age", false);
        with_rule.rule = Some(json!({"selector": "$.age", "command": "range"}));
        let report = ValidationReport::new(
            1,
            Some(vec![detail("name", true), with_rule]),
            false,
            Duration::ZERO,
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "valid": false,
                "errors": 1,
                "details": [
                    {"ID": "name", "title": "name title", "command": "required", "passed": true},
                    {
                        "ID": "age",
                        "title": "age title",
                        "command": "required",
                        "rule": {"selector": "$.age", "command": "range"},
                        "passed": false
                    }
                ]
            })
        );
    }

    #[test]
    fn suppressed_flag_only_serialized_when_set() {
        let mut d = detail("x", false);
        d.suppressed = true;
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["suppressed"], json!(true));
        let back: Detail = serde_json::from_value(v).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn trivially_valid_report() {
        let report = ValidationReport::trivially_valid();
        assert!(report.valid());
        assert!(report.verdict());
        assert_eq!(report.errors(), 0);
        assert!(report.details().is_none());
        assert_eq!(report.with_empty_details().details(), Some(&[][..]));
    }

    #[test]
    fn display_lists_failures() {
        let report = ValidationReport::new(
            1,
            Some(vec![detail("a", true), detail("b", false)]),
            false,
            Duration::from_nanos(5),
        );
        let s = report.to_string();
        assert!(s.contains("valid: false, errors: 1"));
        assert!(s.contains("failed: [b]"));
    }
}
