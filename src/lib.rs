//! Conditional configuration values.
//!
//! A [`RuleOverlay`] sits on top of a [`ConfigTree`] and turns sections that
//! declare rules into a single value, picked by evaluating each rule's
//! predicate against the current [`Context`]. Predicates are compiled once
//! per context shape and kept in a shared [`PredicateCache`].

mod cache;
mod compile;
mod error;
mod evaluate;
mod evaluator;
mod overlay;
pub mod parse;
mod resolve;
pub mod source;
pub mod tree;
mod types;

pub use cache::{CacheKey, PredicateCache};
pub use compile::CompiledPredicate;
#[cfg(feature = "json")]
pub use error::LoadError;
pub use error::RuleError;
pub use evaluator::{ExpressionEvaluator, PredicateEvaluator};
pub use overlay::{
    ConfigTreeExt, OverlayBuilder, OverlayOptions, RuleOverlay, Section, DEFAULT_RULES_KEY,
};
pub use resolve::resolve;
pub use source::{ContextSource, SharedContext};
pub use tree::{ChangeSignal, ConfigTree, MemoryTree, ReloadToken};
pub use types::{
    field, CompareOp, CompileError, Context, ContextShape, Expr, FieldExpr, Operand, Rule,
    RuleSet, Value, ValueKind,
};
