use thiserror::Error;

use crate::types::{CompiledExpr, Slot};
use crate::{CompiledPredicate, Context, ContextShape, Value};

/// Runtime failure of a compiled predicate.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum ExecError {
    #[error("context has {found} fields but the predicate was compiled for {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    /// `run` trusts its caller to lay values out in shape order; this is
    /// what a wrong-kind slice produces instead of a panic.
    #[error("field slot {0} is not a boolean")]
    NotBoolean(usize),

    #[error("cannot compare {left} {op} {right}")]
    Incomparable {
        left: String,
        op: crate::CompareOp,
        right: String,
    },
}

impl CompiledPredicate {
    /// Run this predicate against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Evaluation`](crate::RuleError::Evaluation) if
    /// `ctx` does not have the shape this predicate was compiled for, or a
    /// comparison has no answer at runtime (a NaN operand).
    pub fn matches(&self, ctx: &Context) -> Result<bool, crate::RuleError> {
        let flat = ctx.flatten();
        let shape = ContextShape::from_flat(&flat);
        if &shape != self.shape() {
            return Err(crate::RuleError::Evaluation {
                predicate: self.source().to_owned(),
                message: format!(
                    "context shape {shape} does not match compiled shape {}",
                    self.shape()
                ),
            });
        }
        let values: Vec<&Value> = flat.into_iter().map(|(_, v)| v).collect();
        self.run(&values).map_err(|e| crate::RuleError::Evaluation {
            predicate: self.source().to_owned(),
            message: e.to_string(),
        })
    }

    /// Run against values already laid out in shape order.
    pub(crate) fn run(&self, values: &[&Value]) -> Result<bool, ExecError> {
        if values.len() != self.shape().len() {
            return Err(ExecError::ShapeMismatch {
                expected: self.shape().len(),
                found: values.len(),
            });
        }
        eval_expr(&self.expr, values)
    }
}

fn eval_expr(expr: &CompiledExpr, values: &[&Value]) -> Result<bool, ExecError> {
    match expr {
        CompiledExpr::Compare { left, op, right } => {
            let l = slot_value(left, values)?;
            let r = slot_value(right, values)?;
            l.compare(*op, r).ok_or_else(|| ExecError::Incomparable {
                left: l.to_string(),
                op: *op,
                right: r.to_string(),
            })
        }
        CompiledExpr::Field(idx) => values
            .get(*idx)
            .and_then(|v| v.as_bool())
            .ok_or(ExecError::NotBoolean(*idx)),
        CompiledExpr::Const(b) => Ok(*b),
        CompiledExpr::And(a, b) => Ok(eval_expr(a, values)? && eval_expr(b, values)?),
        CompiledExpr::Or(a, b) => Ok(eval_expr(a, values)? || eval_expr(b, values)?),
        CompiledExpr::Not(inner) => Ok(!eval_expr(inner, values)?),
    }
}

fn slot_value<'a>(slot: &'a Slot, values: &[&'a Value]) -> Result<&'a Value, ExecError> {
    match slot {
        Slot::Literal(value) => Ok(value),
        Slot::Field(idx) => values.get(*idx).copied().ok_or(ExecError::ShapeMismatch {
            expected: idx + 1,
            found: values.len(),
        }),
    }
}
