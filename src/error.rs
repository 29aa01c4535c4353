use thiserror::Error;

use crate::CompileError;

/// Errors surfaced while resolving rule-bearing configuration.
///
/// Every variant reaches the caller of
/// [`RuleOverlay::section()`](crate::RuleOverlay::section) and friends
/// unchanged; nothing is replaced by a default value behind the caller's back.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("predicate text is empty")]
    InvalidPredicate,

    #[error("no context available to evaluate '{predicate}'")]
    MissingContext { predicate: String },

    #[error("failed to compile '{predicate}': {source}")]
    Compilation {
        predicate: String,
        #[source]
        source: CompileError,
    },

    #[error("failed to evaluate '{predicate}': {message}")]
    Evaluation { predicate: String, message: String },

    #[error("malformed rule set at '{path}': {reason}")]
    MalformedRuleSet { path: String, reason: String },
}

/// Errors from loading a tree or a context out of JSON.
#[cfg(feature = "json")]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

#[cfg(feature = "json")]
pub(crate) fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
