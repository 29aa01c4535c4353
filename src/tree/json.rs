use serde_json::Value as Json;

use super::memory::{MemoryTree, Node};
use crate::error::json_kind;
use crate::LoadError;

impl MemoryTree {
    /// Load a tree from a JSON document whose root is an object.
    ///
    /// Objects become child keys in document order, array elements become
    /// children `0`, `1`, … in order, scalars become string values and `null`
    /// leaves a node without a value.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] on malformed JSON or a non-object root.
    pub fn from_json_str(input: &str) -> Result<Self, LoadError> {
        Ok(Self::with_root(parse_root(input)?))
    }

    /// Replace the tree's content with a freshly parsed document and raise
    /// the change signal. On error the current content is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`from_json_str`](Self::from_json_str).
    pub fn reload_json_str(&self, input: &str) -> Result<(), LoadError> {
        self.replace_root(parse_root(input)?);
        Ok(())
    }
}

fn parse_root(input: &str) -> Result<Node, LoadError> {
    let json: Json = serde_json::from_str(input)?;
    if !json.is_object() {
        return Err(LoadError::NotAnObject {
            found: json_kind(&json),
        });
    }
    Ok(to_node(&json))
}

fn to_node(json: &Json) -> Node {
    match json {
        Json::Null => Node::default(),
        Json::Bool(b) => scalar(b.to_string()),
        Json::Number(n) => scalar(n.to_string()),
        Json::String(s) => scalar(s.clone()),
        Json::Array(items) => Node {
            value: None,
            children: items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), to_node(item)))
                .collect(),
        },
        Json::Object(members) => Node {
            value: None,
            children: members
                .iter()
                .map(|(key, member)| (key.clone(), to_node(member)))
                .collect(),
        },
    }
}

fn scalar(value: String) -> Node {
    Node {
        value: Some(value),
        children: Vec::new(),
    }
}
