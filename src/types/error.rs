use thiserror::Error;

use crate::parse::ParseError;

use super::{CompareOp, ValueKind};

/// Reasons a predicate cannot be compiled against a context shape.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("undefined field '{field}' in context shape {shape}")]
    UndefinedField { field: String, shape: String },

    #[error("cannot compare {left} {op} {right}")]
    TypeMismatch {
        left: ValueKind,
        op: CompareOp,
        right: ValueKind,
    },

    #[error("'{operand}' is {kind}, not a boolean condition")]
    NotBoolean { operand: String, kind: ValueKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_field_message() {
        let err = CompileError::UndefinedField {
            field: "user.age".into(),
            shape: "{Prop1: int}".into(),
        };
        assert_eq!(
            err.to_string(),
            "undefined field 'user.age' in context shape {Prop1: int}"
        );
    }

    #[test]
    fn type_mismatch_message() {
        let err = CompileError::TypeMismatch {
            left: ValueKind::String,
            op: CompareOp::Gt,
            right: ValueKind::Int,
        };
        assert_eq!(err.to_string(), "cannot compare string > int");
    }

    #[test]
    fn not_boolean_message() {
        let err = CompileError::NotBoolean {
            operand: "Prop1".into(),
            kind: ValueKind::Int,
        };
        assert_eq!(err.to_string(), "'Prop1' is int, not a boolean condition");
    }
}
