use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{CompileError, CompiledPredicate, ContextShape};

/// Identity of a compiled predicate: its text plus the shape it was
/// compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    predicate: String,
    shape: ContextShape,
}

impl CacheKey {
    #[must_use]
    pub fn new(predicate: impl Into<String>, shape: ContextShape) -> Self {
        Self {
            predicate: predicate.into(),
            shape,
        }
    }

    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    #[must_use]
    pub fn shape(&self) -> &ContextShape {
        &self.shape
    }
}

/// Concurrent, unbounded store of compiled predicates.
///
/// Entries are added lazily and never evicted: the distinct predicates in a
/// configuration tree are few and fixed. Failed compilations are not
/// recorded, so a corrected predicate compiles on its next use.
///
/// Construct one per application (or per test) and share it via `Arc`.
#[derive(Debug, Default)]
pub struct PredicateCache {
    entries: DashMap<CacheKey, Arc<CompiledPredicate>>,
    compilations: AtomicUsize,
}

impl PredicateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached artifact for `(predicate, shape)`, compiling and
    /// inserting it on a miss.
    ///
    /// If two callers miss on the same key at once both compile, and the
    /// first insert is returned to both.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] when the predicate does not compile
    /// against `shape`. Nothing is cached in that case.
    pub fn get_or_compile(
        &self,
        predicate: &str,
        shape: ContextShape,
    ) -> Result<Arc<CompiledPredicate>, CompileError> {
        let key = CacheKey::new(predicate, shape);
        if let Some(hit) = self.get(&key) {
            trace!(predicate, "predicate cache hit");
            return Ok(hit);
        }

        let compiled = Arc::new(CompiledPredicate::compile(predicate, key.shape())?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        debug!(predicate, shape = %key.shape(), "compiled predicate");

        let entry = self.entries.entry(key).or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    /// The cached artifact for a key, if any.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CompiledPredicate>> {
        self.entries.get(key).map(|hit| Arc::clone(hit.value()))
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many predicates this cache has compiled so far, including any
    /// duplicate compiles lost to a race.
    #[must_use]
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;

    fn shape_of(ctx: &Context) -> ContextShape {
        ContextShape::of(ctx)
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = PredicateCache::new();
        let shape = shape_of(&Context::new().set("Prop1", 12_i64));

        let first = cache.get_or_compile("Prop1 > 100", shape.clone()).unwrap();
        let second = cache.get_or_compile("Prop1 > 100", shape.clone()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&CacheKey::new("Prop1 > 100", shape)));
    }

    #[test]
    fn shapes_do_not_collide() {
        let cache = PredicateCache::new();
        let ints = shape_of(&Context::new().set("Prop1", 12_i64));
        let floats = shape_of(&Context::new().set("Prop1", 12.5_f64));

        let a = cache.get_or_compile("Prop1 > 100", ints.clone()).unwrap();
        let b = cache.get_or_compile("Prop1 > 100", floats.clone()).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&CacheKey::new("Prop1 > 100", ints)).unwrap().shape(), a.shape());
    }

    #[test]
    fn new_text_leaves_old_entry_alone() {
        let cache = PredicateCache::new();
        let shape = shape_of(&Context::new().set("Prop1", 12_i64));

        let old = cache.get_or_compile("Prop1 > 100", shape.clone()).unwrap();
        cache.get_or_compile("Prop1 > 10", shape.clone()).unwrap();

        assert_eq!(cache.len(), 2);
        let again = cache.get(&CacheKey::new("Prop1 > 100", shape)).unwrap();
        assert!(Arc::ptr_eq(&old, &again));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = PredicateCache::new();
        let shape = shape_of(&Context::new().set("Prop1", 12_i64));

        assert!(cache.get_or_compile("Prop2 > 1", shape.clone()).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.compilations(), 0);
        assert!(cache.get_or_compile("Prop2 > 1", shape).is_err());
    }
}
