use std::collections::BTreeMap;

use super::Value;

/// Evaluation context mapping dot-separated field paths to [`Value`]s.
///
/// Supports nested paths like `"user.profile.age"`. The set of paths and
/// their value kinds form the context's [`ContextShape`](super::ContextShape).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    data: BTreeMap<String, ContextValue>,
}

#[derive(Debug, Clone, PartialEq)]
enum ContextValue {
    Leaf(Value),
    Nested(BTreeMap<String, ContextValue>),
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dot-separated path.
    /// Returns `None` if the path does not exist or points to a nested map.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        Self::get_recursive(&self.data, &segments)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All leaves as `(full path, value)` pairs, sorted by full path.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        Self::flatten_recursive(&self.data, "", &mut out);
        // Segment order is not full-path order ("a.x" vs "a-b").
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn flatten_recursive<'a>(
        map: &'a BTreeMap<String, ContextValue>,
        prefix: &str,
        out: &mut Vec<(String, &'a Value)>,
    ) {
        for (key, entry) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match entry {
                ContextValue::Leaf(v) => out.push((path, v)),
                ContextValue::Nested(nested) => Self::flatten_recursive(nested, &path, out),
            }
        }
    }

    fn insert_recursive(map: &mut BTreeMap<String, ContextValue>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), ContextValue::Leaf(value));
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| ContextValue::Nested(BTreeMap::new()));
                match entry {
                    ContextValue::Nested(nested) => {
                        Self::insert_recursive(nested, rest, value);
                    }
                    ContextValue::Leaf(_) => {
                        let mut nested = BTreeMap::new();
                        Self::insert_recursive(&mut nested, rest, value);
                        *entry = ContextValue::Nested(nested);
                    }
                }
            }
        }
    }

    fn get_recursive<'a>(
        map: &'a BTreeMap<String, ContextValue>,
        segments: &[&str],
    ) -> Option<&'a Value> {
        match segments {
            [] => None,
            [last] => match map.get(*last)? {
                ContextValue::Leaf(v) => Some(v),
                ContextValue::Nested(_) => None,
            },
            [first, rest @ ..] => match map.get(*first)? {
                ContextValue::Nested(nested) => Self::get_recursive(nested, rest),
                ContextValue::Leaf(_) => None,
            },
        }
    }
}

#[cfg(feature = "json")]
impl Context {
    /// Build a context from a JSON object.
    ///
    /// Nested objects become dotted paths, array elements are addressed by
    /// index (`items.0`), and `null` members are left out.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotAnObject`](crate::LoadError::NotAnObject) if
    /// `json` is not an object.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, crate::LoadError> {
        let serde_json::Value::Object(members) = json else {
            return Err(crate::LoadError::NotAnObject {
                found: crate::error::json_kind(json),
            });
        };
        let mut ctx = Context::new();
        for (key, member) in members {
            ctx.insert_json(key, member);
        }
        Ok(ctx)
    }

    /// Parse a JSON document and build a context from its root object.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`](crate::LoadError) on malformed JSON or a non-object root.
    pub fn from_json_str(input: &str) -> Result<Self, crate::LoadError> {
        let json: serde_json::Value = serde_json::from_str(input)?;
        Self::from_json(&json)
    }

    fn insert_json(&mut self, path: &str, json: &serde_json::Value) {
        match json {
            serde_json::Value::Null => {}
            serde_json::Value::Bool(b) => self.insert(path, Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                let value = match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => Value::Int(i),
                    (None, Some(f)) => Value::Float(f),
                    (None, None) => return,
                };
                self.insert(path, value);
            }
            serde_json::Value::String(s) => self.insert(path, Value::String(s.clone())),
            serde_json::Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.insert_json(&format!("{path}.{i}"), item);
                }
            }
            serde_json::Value::Object(members) => {
                for (key, member) in members {
                    self.insert_json(&format!("{path}.{key}"), member);
                }
            }
        }
    }
}
