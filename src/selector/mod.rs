mod error;
mod grammar;

use std::fmt;

use serde_json::Value;

pub use error::SelectorError;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member by name.
    Key(String),
    /// Array element by position.
    Index(usize),
    /// Every array element or every object value.
    Wildcard,
}

/// A parsed path expression locating zero or more values inside a JSON document.
///
/// Accepts `$`-rooted paths (`$.user.tags[0]`, `$['first name']`, `$.items[*].id`)
/// and bare dot paths (`user.name`). The empty string and `$` select the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    segments: Vec<Segment>,
}

impl Selector {
    /// Parse a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] if the input is not a valid path expression.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        use winnow::Parser;
        let segments = grammar::parse_selector
            .parse(input.trim())
            .map_err(|e| {
                let detail = e.inner().to_string();
                if detail.is_empty() {
                    SelectorError::new(format!("unexpected input at offset {}", e.offset()))
                } else {
                    SelectorError::new(format!("{detail} at offset {}", e.offset()))
                }
            })?;
        Ok(Self {
            raw: input.to_owned(),
            segments,
        })
    }

    /// The root selector, matching the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self {
            raw: "$".to_owned(),
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The selector text as written in the rule document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve this selector against `document`, returning every matched value
    /// in document order. An empty result is a selector miss.
    ///
    /// Wildcard branches that stop short are skipped: with
    /// `{"items": [{"qty": 1}, {}]}`, `$.items[*].qty` resolves to `[1]`. Use
    /// [`locate()`](Self::locate) to learn whether every branch matched.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        self.locate(document).values
    }

    /// Resolve this selector, also recording whether every branch of a
    /// wildcard fan-out reached a value.
    #[must_use]
    pub fn locate<'a>(&self, document: &'a Value) -> Resolution<'a> {
        let mut current = vec![document];
        let mut complete = true;
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                let child = match segment {
                    Segment::Key(key) => value.as_object().and_then(|m| m.get(key)),
                    Segment::Index(idx) => value.as_array().and_then(|a| a.get(*idx)),
                    Segment::Wildcard => {
                        match value {
                            Value::Array(items) => next.extend(items),
                            Value::Object(members) => next.extend(members.values()),
                            _ => complete = false,
                        }
                        continue;
                    }
                };
                match child {
                    Some(child) => next.push(child),
                    None => complete = false,
                }
            }
            if next.is_empty() {
                return Resolution {
                    values: next,
                    complete: false,
                };
            }
            current = next;
        }
        Resolution {
            values: current,
            complete,
        }
    }
}

/// Outcome of [`Selector::locate()`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    /// Matched values in document order.
    pub values: Vec<&'a Value>,
    /// `false` when at least one path through the document missed.
    pub complete: bool,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "name": "alice",
            "profile": { "age": 25, "tags": ["a", "b"] },
            "orders": [ { "id": 1 }, { "id": 2 }, { "total": 3 } ],
            "nothing": null,
            "first name": "Al"
        })
    }

    fn resolve(selector: &str, doc: &Value) -> Vec<Value> {
        Selector::parse(selector)
            .unwrap()
            .resolve(doc)
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn resolve_root() {
        let d = doc();
        assert_eq!(resolve("", &d), vec![d.clone()]);
        assert_eq!(resolve("$", &d), vec![d.clone()]);
    }

    #[test]
    fn resolve_nested_key() {
        let d = doc();
        assert_eq!(resolve("$.profile.age", &d), vec![json!(25)]);
        assert_eq!(resolve("profile.age", &d), vec![json!(25)]);
    }

    #[test]
    fn resolve_index() {
        let d = doc();
        assert_eq!(resolve("$.profile.tags[1]", &d), vec![json!("b")]);
        assert!(resolve("$.profile.tags[5]", &d).is_empty());
    }

    #[test]
    fn resolve_wildcard_skips_missing_members() {
        let d = doc();
        assert_eq!(resolve("$.orders[*].id", &d), vec![json!(1), json!(2)]);
    }

    #[test]
    fn resolve_null_is_a_match() {
        let d = doc();
        assert_eq!(resolve("$.nothing", &d), vec![Value::Null]);
    }

    #[test]
    fn resolve_quoted_key() {
        let d = doc();
        assert_eq!(resolve("$['first name']", &d), vec![json!("Al")]);
    }

    #[test]
    fn resolve_miss() {
        let d = doc();
        assert!(resolve("$.missing", &d).is_empty());
        assert!(resolve("$.name.first", &d).is_empty());
        assert!(resolve("$.profile[0]", &d).is_empty());
    }

    #[test]
    fn locate_flags_partial_wildcards() {
        let d = json!({"items": [{"name": "a", "qty": 2}, {}]});
        let found = Selector::parse("$.items[*].name").unwrap().locate(&d);
        assert_eq!(found.values, vec![&json!("a")]);
        assert!(!found.complete);

        let found = Selector::parse("$.items[*]").unwrap().locate(&d);
        assert_eq!(found.values.len(), 2);
        assert!(found.complete);

        let found = Selector::parse("$.items[*].missing").unwrap().locate(&d);
        assert!(found.values.is_empty());
        assert!(!found.complete);
    }

    #[test]
    fn display_keeps_original_text() {
        let sel = Selector::parse("user.name").unwrap();
        assert_eq!(sel.to_string(), "user.name");
        assert!(Selector::root().is_root());
    }

    #[test]
    fn parse_error_mentions_offset() {
        let err = Selector::parse("$.a[").unwrap_err();
        assert!(err.reason().contains("offset"), "{err}");
    }
}
