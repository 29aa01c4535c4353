use std::fmt;

use crate::types::{CompiledExpr, Slot};
use crate::{CompileError, CompareOp, ContextShape, Expr, Operand, ValueKind};

/// A predicate checked against one [`ContextShape`] and lowered to slot
/// indices. Immutable and shared through the
/// [`PredicateCache`](crate::PredicateCache).
#[derive(Debug)]
pub struct CompiledPredicate {
    source: String,
    shape: ContextShape,
    pub(crate) expr: CompiledExpr,
}

impl CompiledPredicate {
    /// Parse `source` and compile it against `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] on a syntax error, a field missing from the
    /// shape, incompatible comparison operands, or a non-boolean condition.
    pub fn compile(source: &str, shape: &ContextShape) -> Result<Self, CompileError> {
        let parsed = crate::parse::parse(source)?;
        Self::from_expr(source, &parsed, shape)
    }

    /// Compile an already-built expression. `source` is kept for diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`compile`](Self::compile), minus syntax errors.
    pub fn from_expr(source: &str, expr: &Expr, shape: &ContextShape) -> Result<Self, CompileError> {
        let expr = lower(expr, shape)?;
        Ok(Self {
            source: source.to_owned(),
            shape: shape.clone(),
            expr,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn shape(&self) -> &ContextShape {
        &self.shape
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.source, self.shape)
    }
}

fn lower(expr: &Expr, shape: &ContextShape) -> Result<CompiledExpr, CompileError> {
    match expr {
        Expr::Compare { left, op, right } => lower_compare(left, *op, right, shape),
        Expr::Operand(operand) => {
            let (slot, kind) = resolve(operand, shape)?;
            if kind != ValueKind::Bool {
                return Err(CompileError::NotBoolean {
                    operand: operand.to_string(),
                    kind,
                });
            }
            Ok(match slot {
                Slot::Field(idx) => CompiledExpr::Field(idx),
                Slot::Literal(value) => CompiledExpr::Const(value.as_bool().unwrap_or(false)),
            })
        }
        Expr::And(a, b) => Ok(CompiledExpr::And(
            Box::new(lower(a, shape)?),
            Box::new(lower(b, shape)?),
        )),
        Expr::Or(a, b) => Ok(CompiledExpr::Or(
            Box::new(lower(a, shape)?),
            Box::new(lower(b, shape)?),
        )),
        Expr::Not(inner) => Ok(CompiledExpr::Not(Box::new(lower(inner, shape)?))),
    }
}

fn lower_compare(
    left: &Operand,
    op: CompareOp,
    right: &Operand,
    shape: &ContextShape,
) -> Result<CompiledExpr, CompileError> {
    let (left, left_kind) = resolve(left, shape)?;
    let (right, right_kind) = resolve(right, shape)?;
    if !left_kind.comparable_with(right_kind, op) {
        return Err(CompileError::TypeMismatch {
            left: left_kind,
            op,
            right: right_kind,
        });
    }
    Ok(CompiledExpr::Compare { left, op, right })
}

fn resolve(operand: &Operand, shape: &ContextShape) -> Result<(Slot, ValueKind), CompileError> {
    match operand {
        Operand::Literal(value) => Ok((Slot::Literal(value.clone()), value.kind())),
        Operand::Field(path) => {
            let undefined = || CompileError::UndefinedField {
                field: path.clone(),
                shape: shape.to_string(),
            };
            let idx = shape.index_of(path).ok_or_else(undefined)?;
            let kind = shape.kind_at(idx).ok_or_else(undefined)?;
            Ok((Slot::Field(idx), kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Value};

    fn shape() -> ContextShape {
        ContextShape::of(
            &Context::new()
                .set("Prop1", 12_i64)
                .set("ratio", 0.5_f64)
                .set("region", "eu")
                .set("vip", true),
        )
    }

    #[test]
    fn compiles_numeric_comparison() {
        let p = CompiledPredicate::compile("Prop1 > 100", &shape()).unwrap();
        assert_eq!(
            p.expr,
            CompiledExpr::Compare {
                left: Slot::Field(0),
                op: CompareOp::Gt,
                right: Slot::Literal(Value::Int(100)),
            }
        );
        assert_eq!(p.source(), "Prop1 > 100");
        assert_eq!(p.shape(), &shape());
    }

    #[test]
    fn int_and_float_mix() {
        assert!(CompiledPredicate::compile("ratio < Prop1", &shape()).is_ok());
        assert!(CompiledPredicate::compile("Prop1 == 12.0", &shape()).is_ok());
    }

    #[test]
    fn bare_bool_field_and_constants() {
        let p = CompiledPredicate::compile("vip && true", &shape()).unwrap();
        assert_eq!(
            p.expr,
            CompiledExpr::And(
                Box::new(CompiledExpr::Field(3)),
                Box::new(CompiledExpr::Const(true))
            )
        );
    }

    #[test]
    fn undefined_field() {
        let err = CompiledPredicate::compile("missing > 1", &shape()).unwrap_err();
        assert!(matches!(err, CompileError::UndefinedField { ref field, .. } if field == "missing"));
    }

    #[test]
    fn type_mismatch() {
        let err = CompiledPredicate::compile("region > 1", &shape()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch {
                left: ValueKind::String,
                op: CompareOp::Gt,
                right: ValueKind::Int
            }
        ));
        assert!(matches!(
            CompiledPredicate::compile("vip > false", &shape()),
            Err(CompileError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn non_boolean_condition() {
        for text in ["Prop1", "42", "\"yes\"", "vip && region"] {
            assert!(
                matches!(
                    CompiledPredicate::compile(text, &shape()),
                    Err(CompileError::NotBoolean { .. })
                ),
                "expected NotBoolean for {text}"
            );
        }
    }

    #[test]
    fn syntax_error() {
        assert!(matches!(
            CompiledPredicate::compile("Prop1 >", &shape()),
            Err(CompileError::Parse(_))
        ));
    }

    #[test]
    fn error_in_nested_branch_surfaces() {
        assert!(matches!(
            CompiledPredicate::compile("vip || !(nope == 1)", &shape()),
            Err(CompileError::UndefinedField { .. })
        ));
    }
}
