use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Comparison operators accepted by the `compare` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Compare `lhs` to `rhs` using this operator.
    ///
    /// Equality operators work on every JSON type (numbers compare by value,
    /// so `10` equals `10.0`). Ordering operators return `None` unless both
    /// sides are numbers or both are strings.
    #[must_use]
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Option<bool> {
        match self {
            CompareOp::Eq => Some(json_eq(lhs, rhs)),
            CompareOp::Neq => Some(!json_eq(lhs, rhs)),
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                let ord = json_cmp(lhs, rhs)?;
                Some(match self {
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Gte => ord != Ordering::Less,
                    CompareOp::Lt => ord == Ordering::Less,
                    _ => ord != Ordering::Greater,
                })
            }
        }
    }
}

/// Deep JSON equality where numbers compare by numeric value.
#[must_use]
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => json_cmp(a, b) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Ordering between two numbers or two strings; `None` for anything else.
#[allow(clippy::cast_precision_loss)]
fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return Some(x.cmp(&y));
            }
            // Only one side fits in i64; the other exceeds i64::MAX.
            if x.is_i64() && y.is_u64() {
                return Some(Ordering::Less);
            }
            if x.is_u64() && y.is_i64() {
                return Some(Ordering::Greater);
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "eq" => Ok(CompareOp::Eq),
            "!=" | "ne" | "neq" => Ok(CompareOp::Neq),
            ">" | "gt" => Ok(CompareOp::Gt),
            ">=" | "gte" => Ok(CompareOp::Gte),
            "<" | "lt" => Ok(CompareOp::Lt),
            "<=" | "lte" => Ok(CompareOp::Lte),
            other => Err(format!("unknown comparison operator '{other}'")),
        }
    }
}
