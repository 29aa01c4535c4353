mod context;
mod error;
mod expr;
mod rule;
mod shape;
mod value;

pub use context::Context;
pub use error::CompileError;
pub(crate) use expr::{CompiledExpr, Slot};
pub use expr::{field, CompareOp, Expr, FieldExpr, Operand};
pub use rule::{Rule, RuleSet};
pub use shape::ContextShape;
pub use value::{Value, ValueKind};
