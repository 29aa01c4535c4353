use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The change source behind a family of [`ReloadToken`]s.
///
/// A tree owns one signal and raises it whenever its content changes.
#[derive(Debug, Default)]
pub struct ChangeSignal {
    generation: AtomicU64,
}

impl ChangeSignal {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark every token issued so far as changed.
    pub fn raise(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// A token that observes changes from now on.
    #[must_use]
    pub fn token(self: &Arc<Self>) -> ReloadToken {
        ReloadToken {
            issued_at: self.generation(),
            signal: Arc::clone(self),
        }
    }
}

/// Snapshot of a [`ChangeSignal`] at the time it was issued.
#[derive(Debug, Clone)]
pub struct ReloadToken {
    signal: Arc<ChangeSignal>,
    issued_at: u64,
}

impl ReloadToken {
    /// Whether the source changed since this token was issued.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.signal.generation() != self.issued_at
    }

    /// Whether both tokens watch the same signal.
    #[must_use]
    pub fn same_source(&self, other: &ReloadToken) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_observes_later_changes_only() {
        let signal = ChangeSignal::new();
        signal.raise();
        let token = signal.token();
        assert!(!token.has_changed());

        signal.raise();
        assert!(token.has_changed());
        assert!(!signal.token().has_changed());
    }

    #[test]
    fn same_source() {
        let a = ChangeSignal::new();
        let b = ChangeSignal::new();
        assert!(a.token().same_source(&a.token()));
        assert!(!a.token().same_source(&b.token()));
    }
}
