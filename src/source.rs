use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::Context;

/// Supplies the context for a rule-set resolution.
///
/// Called once per resolution, so a source that returns fresh data makes
/// later reads reflect the new context without touching the tree.
/// `None` means no context is available; resolving a conditional rule then
/// fails with [`RuleError::MissingContext`](crate::RuleError::MissingContext).
pub trait ContextSource: Send + Sync {
    fn context(&self) -> Option<Context>;
}

/// A fixed snapshot.
impl ContextSource for Context {
    fn context(&self) -> Option<Context> {
        Some(self.clone())
    }
}

impl<S: ContextSource + ?Sized> ContextSource for Arc<S> {
    fn context(&self) -> Option<Context> {
        (**self).context()
    }
}

/// A source backed by a closure, created by [`from_fn`].
pub struct FnSource<F> {
    f: F,
}

impl<F> ContextSource for FnSource<F>
where
    F: Fn() -> Option<Context> + Send + Sync,
{
    fn context(&self) -> Option<Context> {
        (self.f)()
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").finish_non_exhaustive()
    }
}

/// Build a source that calls `f` on every resolution.
///
/// ```
/// use ruleconf::{source, Context, ContextSource};
///
/// let src = source::from_fn(|| Some(Context::new().set("hour", 9_i64)));
/// assert!(src.context().is_some());
/// ```
pub fn from_fn<F>(f: F) -> FnSource<F>
where
    F: Fn() -> Option<Context> + Send + Sync,
{
    FnSource { f }
}

/// A context slot the application can swap at any time. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    slot: Arc<RwLock<Option<Context>>>,
}

impl SharedContext {
    #[must_use]
    pub fn new(ctx: Context) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(ctx))),
        }
    }

    /// Install a new context, returning the previous one.
    pub fn replace(&self, ctx: Context) -> Option<Context> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ctx)
    }

    /// Remove the context; later resolutions see none.
    pub fn clear(&self) -> Option<Context> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ContextSource for SharedContext {
    fn context(&self) -> Option<Context> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::Value;

    #[test]
    fn snapshot_source() {
        let ctx = Context::new().set("Prop1", 12_i64);
        assert_eq!(ctx.context(), Some(ctx.clone()));
    }

    #[test]
    fn closure_is_called_every_time() {
        let counter = Arc::new(AtomicI64::new(0));
        let c = Arc::clone(&counter);
        let src = from_fn(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            Some(Context::new().set("n", n))
        });
        assert_eq!(src.context().unwrap().get("n"), Some(&Value::Int(0)));
        assert_eq!(src.context().unwrap().get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn shared_slot() {
        let shared = SharedContext::default();
        assert_eq!(shared.context(), None);

        let handle = shared.clone();
        handle.replace(Context::new().set("tier", "gold"));
        assert_eq!(
            shared.context().unwrap().get("tier"),
            Some(&Value::String("gold".into()))
        );

        assert!(handle.clear().is_some());
        assert_eq!(shared.context(), None);
    }
}
