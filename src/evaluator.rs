use std::sync::Arc;

use crate::{CompiledPredicate, Context, ContextShape, PredicateCache, RuleError, Value};

/// Evaluates a predicate string against a context.
///
/// This is the seam between rule resolution and the expression engine.
/// Implementations must block until a result is available.
pub trait PredicateEvaluator: Send + Sync {
    /// # Errors
    ///
    /// - [`RuleError::InvalidPredicate`] for blank predicate text
    /// - [`RuleError::MissingContext`] when `context` is `None`
    /// - [`RuleError::Compilation`] when the predicate does not compile
    /// - [`RuleError::Evaluation`] when it fails at runtime
    fn evaluate(&self, predicate: &str, context: Option<&Context>) -> Result<bool, RuleError>;
}

impl<E: PredicateEvaluator + ?Sized> PredicateEvaluator for Arc<E> {
    fn evaluate(&self, predicate: &str, context: Option<&Context>) -> Result<bool, RuleError> {
        (**self).evaluate(predicate, context)
    }
}

/// The built-in evaluator: compiles predicates with the crate's expression
/// language and memoizes them in a shared [`PredicateCache`].
///
/// Clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    cache: Arc<PredicateCache>,
}

impl ExpressionEvaluator {
    /// An evaluator with its own empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An evaluator backed by an existing cache.
    #[must_use]
    pub fn with_cache(cache: Arc<PredicateCache>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PredicateCache> {
        &self.cache
    }

    /// Fetch (compiling on first use) the artifact for `predicate` against
    /// the shape of `context`.
    ///
    /// # Errors
    ///
    /// Same as [`PredicateEvaluator::evaluate`], minus runtime failures.
    pub fn compiled(
        &self,
        predicate: &str,
        context: Option<&Context>,
    ) -> Result<Arc<CompiledPredicate>, RuleError> {
        let ctx = Self::check(predicate, context)?;
        self.lookup(predicate, ContextShape::of(ctx))
    }

    fn check<'c>(predicate: &str, context: Option<&'c Context>) -> Result<&'c Context, RuleError> {
        if predicate.trim().is_empty() {
            return Err(RuleError::InvalidPredicate);
        }
        context.ok_or_else(|| RuleError::MissingContext {
            predicate: predicate.to_owned(),
        })
    }

    fn lookup(
        &self,
        predicate: &str,
        shape: ContextShape,
    ) -> Result<Arc<CompiledPredicate>, RuleError> {
        self.cache
            .get_or_compile(predicate, shape)
            .map_err(|source| RuleError::Compilation {
                predicate: predicate.to_owned(),
                source,
            })
    }
}

impl PredicateEvaluator for ExpressionEvaluator {
    fn evaluate(&self, predicate: &str, context: Option<&Context>) -> Result<bool, RuleError> {
        let ctx = Self::check(predicate, context)?;
        let flat = ctx.flatten();
        let compiled = self.lookup(predicate, ContextShape::from_flat(&flat))?;
        let values: Vec<&Value> = flat.into_iter().map(|(_, v)| v).collect();
        compiled
            .run(&values)
            .map_err(|e| RuleError::Evaluation {
                predicate: predicate.to_owned(),
                message: e.to_string(),
            })
    }
}
