use std::fmt;
use std::ops::Not;

use super::Value;

/// Comparison operators supported in predicates.
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
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Neq)
    }
}

/// One side of a comparison: a context field path or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Literal(Value),
}

/// Parsed predicate. Field paths are still strings here; they are resolved
/// against a [`ContextShape`](super::ContextShape) during compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// A bare operand used as a condition. Must be boolean to compile.
    Operand(Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// Operand with field paths replaced by slot indices into a shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Field(usize),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledExpr {
    Compare { left: Slot, op: CompareOp, right: Slot },
    Field(usize),
    Const(bool),
    And(Box<CompiledExpr>, Box<CompiledExpr>),
    Or(Box<CompiledExpr>, Box<CompiledExpr>),
    Not(Box<CompiledExpr>),
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

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(path) => write!(f, "{path}"),
            Operand::Literal(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::Operand(operand) => write!(f, "{operand}"),
            Expr::And(a, b) => write!(f, "({a} AND {b})"),
            Expr::Or(a, b) => write!(f, "({a} OR {b})"),
            Expr::Not(inner) => write!(f, "(NOT {inner})"),
        }
    }
}

impl Expr {
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

/// Builder for field comparisons, created by [`field()`].
///
/// ```
/// use ruleconf::field;
///
/// let expr = field("Prop1").gt(100_i64).and(field("enabled").is_true());
/// assert_eq!(expr.to_string(), "((Prop1 > 100) AND enabled)");
/// ```
#[derive(Debug, Clone)]
pub struct FieldExpr {
    path: String,
}

impl FieldExpr {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Expr {
        Expr::Compare {
            left: Operand::Field(self.path),
            op,
            right: Operand::Literal(value.into()),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Neq, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gte, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lte, value)
    }

    /// Use a boolean field directly as the condition.
    #[must_use]
    pub fn is_true(self) -> Expr {
        Expr::Operand(Operand::Field(self.path))
    }
}

#[must_use]
pub fn field(path: &str) -> FieldExpr {
    FieldExpr {
        path: path.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_gt_literal() {
        let expr = field("Prop1").gt(100_i64);
        assert_eq!(
            expr,
            Expr::Compare {
                left: Operand::Field("Prop1".to_owned()),
                op: CompareOp::Gt,
                right: Operand::Literal(Value::Int(100)),
            }
        );
    }

    #[test]
    fn bare_field() {
        assert_eq!(
            field("enabled").is_true(),
            Expr::Operand(Operand::Field("enabled".to_owned()))
        );
    }

    #[test]
    fn chaining_is_left_associative() {
        let expr = field("a").is_true().and(field("b").is_true()).or(!field("c").is_true());
        assert_eq!(expr.to_string(), "((a AND b) OR (NOT c))");
    }

    #[test]
    fn equality_ops() {
        assert!(CompareOp::Eq.is_equality());
        assert!(CompareOp::Neq.is_equality());
        assert!(!CompareOp::Lte.is_equality());
    }
}
