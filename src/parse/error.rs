use thiserror::Error;

/// A predicate that is not valid syntax.
#[derive(Debug, Error)]
#[error("parse error in '{input}': {message}")]
pub struct ParseError {
    input: String,
    message: String,
}

impl ParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}
