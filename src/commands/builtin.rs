use std::str::FromStr;

use regex::Regex;
use serde_json::Value;

use crate::types::{json_eq, CompareOp};

use super::Check;

/// The command vocabulary every engine starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Required,
    Absent,
    Equals,
    NotEquals,
    Compare,
    Range,
    Pattern,
    OneOf,
    Type,
    Length,
    NotEmpty,
    Contains,
}

impl Builtin {
    /// Every built-in together with the names it is registered under.
    pub(crate) const ALL: &'static [(&'static str, Builtin)] = &[
        ("required", Builtin::Required),
        ("absent", Builtin::Absent),
        ("equals", Builtin::Equals),
        ("eq", Builtin::Equals),
        ("not_equals", Builtin::NotEquals),
        ("neq", Builtin::NotEquals),
        ("compare", Builtin::Compare),
        ("range", Builtin::Range),
        ("pattern", Builtin::Pattern),
        ("regex", Builtin::Pattern),
        ("enum", Builtin::OneOf),
        ("one_of", Builtin::OneOf),
        ("type", Builtin::Type),
        ("length", Builtin::Length),
        ("not_empty", Builtin::NotEmpty),
        ("contains", Builtin::Contains),
    ];

    /// Validate `arguments` and build the executable check.
    pub(crate) fn prepare(self, arguments: &Value) -> Result<Check, String> {
        match self {
            Builtin::Required => Ok(Check::Required),
            Builtin::Absent => Ok(Check::Absent),
            Builtin::Equals => Ok(Check::Equals(operand(arguments)?)),
            Builtin::NotEquals => Ok(Check::NotEquals(operand(arguments)?)),
            Builtin::Compare => {
                let op = arguments
                    .get("op")
                    .and_then(Value::as_str)
                    .ok_or("requires a string 'op'")?;
                let op = CompareOp::from_str(op)?;
                let value = arguments.get("value").cloned().ok_or("requires 'value'")?;
                Ok(Check::Compare { op, value })
            }
            Builtin::Range => {
                let min = number_arg(arguments, "min")?;
                let max = number_arg(arguments, "max")?;
                if min.is_none() && max.is_none() {
                    return Err("requires 'min' or 'max'".to_owned());
                }
                if let (Some(lo), Some(hi)) = (&min, &max) {
                    if CompareOp::Gt.apply(lo, hi) == Some(true) {
                        return Err(format!("'min' ({lo}) is greater than 'max' ({hi})"));
                    }
                }
                let exclusive = match arguments.get("exclusive") {
                    None => false,
                    Some(v) => v.as_bool().ok_or("'exclusive' must be a boolean")?,
                };
                Ok(Check::Range {
                    min,
                    max,
                    exclusive,
                })
            }
            Builtin::Pattern => {
                let source = arguments
                    .get("regex")
                    .or_else(|| arguments.get("pattern"))
                    .or(Some(arguments))
                    .and_then(Value::as_str)
                    .ok_or("requires a string 'regex'")?;
                let re = Regex::new(source).map_err(|e| e.to_string())?;
                Ok(Check::Pattern(re))
            }
            Builtin::OneOf => {
                let values = arguments
                    .get("values")
                    .or(Some(arguments))
                    .and_then(Value::as_array)
                    .ok_or("requires an array 'values'")?;
                Ok(Check::OneOf(values.clone()))
            }
            Builtin::Type => {
                let name = arguments
                    .get("type")
                    .or(Some(arguments))
                    .and_then(Value::as_str)
                    .ok_or("requires a string 'type'")?;
                Ok(Check::Type(JsonType::from_str(name)?))
            }
            Builtin::Length => {
                let min = length_arg(arguments, "min")?;
                let max = length_arg(arguments, "max")?;
                if min.is_none() && max.is_none() {
                    return Err("requires 'min' or 'max'".to_owned());
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("'min' ({lo}) is greater than 'max' ({hi})"));
                    }
                }
                Ok(Check::Length { min, max })
            }
            Builtin::NotEmpty => Ok(Check::NotEmpty),
            Builtin::Contains => Ok(Check::Contains(operand(arguments)?)),
        }
    }
}

/// The comparison operand: `{"value": v}`, or a bare non-object `v`.
fn operand(arguments: &Value) -> Result<Value, String> {
    match arguments {
        Value::Object(map) => map
            .get("value")
            .cloned()
            .ok_or_else(|| "requires 'value'".to_owned()),
        Value::Null => Err("requires 'value'".to_owned()),
        other => Ok(other.clone()),
    }
}

fn number_arg(arguments: &Value, key: &str) -> Result<Option<Value>, String> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Number(_)) => Ok(Some(v.clone())),
        Some(_) => Err(format!("'{key}' must be a number")),
    }
}

fn length_arg(arguments: &Value, key: &str) -> Result<Option<usize>, String> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("'{key}' must be a non-negative integer")),
    }
}

/// JSON value kinds recognised by the `type` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value
                        .as_f64()
                        .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            JsonType::Boolean => value.is_boolean(),
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::Null => value.is_null(),
        }
    }
}

impl FromStr for JsonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(JsonType::String),
            "number" => Ok(JsonType::Number),
            "integer" => Ok(JsonType::Integer),
            "boolean" | "bool" => Ok(JsonType::Boolean),
            "object" => Ok(JsonType::Object),
            "array" => Ok(JsonType::Array),
            "null" => Ok(JsonType::Null),
            other => Err(format!("unknown type '{other}'")),
        }
    }
}

/// Per-value predicate shared by the non-presence checks.
pub(crate) fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| json_eq(item, needle)),
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Object(members) => needle.as_str().is_some_and(|k| members.contains_key(k)),
        _ => false,
    }
}

pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(members) => members.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

pub(crate) fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(members) => Some(members.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn range_requires_a_bound() {
        assert!(Builtin::Range.prepare(&json!({})).is_err());
        assert!(Builtin::Range.prepare(&Value::Null).is_err());
        assert!(Builtin::Range.prepare(&json!({"min": 0})).is_ok());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = Builtin::Range
            .prepare(&json!({"min": 10, "max": 1}))
            .unwrap_err();
        assert!(err.contains("greater than"), "{err}");
    }

    #[test]
    fn range_rejects_non_numeric_bound() {
        assert!(Builtin::Range.prepare(&json!({"min": "zero"})).is_err());
        assert!(Builtin::Range
            .prepare(&json!({"min": 0, "exclusive": "yes"}))
            .is_err());
    }

    #[test]
    fn pattern_compiles_regex_up_front() {
        assert!(Builtin::Pattern.prepare(&json!({"regex": "^[a-z]+$"})).is_ok());
        assert!(Builtin::Pattern.prepare(&json!({"pattern": "^x"})).is_ok());
        assert!(Builtin::Pattern.prepare(&json!("^bare$")).is_ok());
        assert!(Builtin::Pattern.prepare(&json!({"regex": "(unclosed"})).is_err());
        assert!(Builtin::Pattern.prepare(&json!({})).is_err());
    }

    #[test]
    fn equals_accepts_bare_or_wrapped_operand() {
        assert!(matches!(
            Builtin::Equals.prepare(&json!({"value": 3})),
            Ok(Check::Equals(v)) if v == json!(3)
        ));
        assert!(matches!(
            Builtin::Equals.prepare(&json!("x")),
            Ok(Check::Equals(v)) if v == json!("x")
        ));
        assert!(Builtin::Equals.prepare(&Value::Null).is_err());
        assert!(Builtin::Equals.prepare(&json!({"other": 1})).is_err());
    }

    #[test]
    fn compare_parses_operator() {
        assert!(matches!(
            Builtin::Compare.prepare(&json!({"op": ">=", "value": 18})),
            Ok(Check::Compare { op: CompareOp::Gte, .. })
        ));
        assert!(Builtin::Compare
            .prepare(&json!({"op": "~", "value": 1}))
            .is_err());
        assert!(Builtin::Compare.prepare(&json!({"op": ">"})).is_err());
    }

    #[test]
    fn type_names() {
        assert_eq!("integer".parse::<JsonType>(), Ok(JsonType::Integer));
        assert_eq!("bool".parse::<JsonType>(), Ok(JsonType::Boolean));
        assert!("date".parse::<JsonType>().is_err());
        assert!(Builtin::Type.prepare(&json!({"type": "date"})).is_err());
    }

    #[test]
    fn integer_type_accepts_whole_floats() {
        assert!(JsonType::Integer.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3.0)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
        assert!(!JsonType::Integer.matches(&json!("3")));
    }

    #[test]
    fn length_rejects_negative() {
        assert!(Builtin::Length.prepare(&json!({"min": -1})).is_err());
        assert!(Builtin::Length.prepare(&json!({"max": 4})).is_ok());
    }

    #[test]
    fn contains_by_kind() {
        assert!(contains(&json!([1, 2, 3]), &json!(2.0)));
        assert!(contains(&json!("hello world"), &json!("lo w")));
        assert!(contains(&json!({"k": 1}), &json!("k")));
        assert!(!contains(&json!(12), &json!(1)));
    }

    #[test]
    fn emptiness() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!({})));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
    }

    #[test]
    fn length_counts_chars() {
        assert_eq!(length(&json!("héllo")), Some(5));
        assert_eq!(length(&json!([1, 2])), Some(2));
        assert_eq!(length(&json!(5)), None);
    }
}
