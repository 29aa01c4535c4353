mod error;
mod grammar;

pub use error::ParseError;

use crate::Expr;

/// Parse a predicate string into an [`Expr`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a valid predicate.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    use winnow::Parser;
    grammar::predicate
        .parse(input)
        .map_err(|e| ParseError::new(input, e.to_string()))
}
