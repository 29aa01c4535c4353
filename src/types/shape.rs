use std::fmt;

use super::context::Context;
use super::value::{Value, ValueKind};

/// The layout of a [`Context`]: every leaf path with its value kind, sorted
/// by path.
///
/// Predicates are compiled against a shape, and the shape is half of the
/// predicate cache key, so the same text compiled for two different layouts
/// yields two independent artifacts. Field indices produced by
/// [`index_of`](Self::index_of) line up with [`Context::flatten`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextShape {
    fields: Vec<(String, ValueKind)>,
}

impl ContextShape {
    #[must_use]
    pub fn of(ctx: &Context) -> Self {
        Self::from_flat(&ctx.flatten())
    }

    pub(crate) fn from_flat(flat: &[(String, &Value)]) -> Self {
        Self {
            fields: flat
                .iter()
                .map(|(path, value)| (path.clone(), value.kind()))
                .collect(),
        }
    }

    /// Look up the slot index for a field path.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.fields
            .binary_search_by(|(p, _)| p.as_str().cmp(path))
            .ok()
    }

    #[must_use]
    pub fn kind_at(&self, index: usize) -> Option<ValueKind> {
        self.fields.get(index).map(|(_, kind)| *kind)
    }

    /// The number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all `(path, kind)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.fields.iter().map(|(p, k)| (p.as_str(), *k))
    }
}

impl fmt::Display for ContextShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (path, kind)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{path}: {kind}")?;
        }
        f.write_str("}")
    }
}
