//! The hierarchical store the overlay reads from.
//!
//! Nodes are addressed by `:`-delimited, case-sensitive paths; the empty
//! path is the root.

#[cfg(feature = "json")]
mod json;
mod memory;
mod token;

use std::sync::Arc;

pub use memory::MemoryTree;
pub use token::{ChangeSignal, ReloadToken};

/// Read access to a configuration tree.
pub trait ConfigTree: Send + Sync {
    /// The scalar value stored at `path`, if any.
    fn value(&self, path: &str) -> Option<String>;

    /// Keys of the direct children of `path`, in declaration order.
    /// Unknown paths have no children.
    fn child_keys(&self, path: &str) -> Vec<String>;

    /// A token that flips once the tree's content changes.
    fn reload_token(&self) -> ReloadToken;
}

impl<T: ConfigTree + ?Sized> ConfigTree for Arc<T> {
    fn value(&self, path: &str) -> Option<String> {
        (**self).value(path)
    }

    fn child_keys(&self, path: &str) -> Vec<String> {
        (**self).child_keys(path)
    }

    fn reload_token(&self) -> ReloadToken {
        (**self).reload_token()
    }
}

/// Helpers for `:`-delimited configuration paths.
pub mod path {
    pub const DELIMITER: char = ':';

    /// Append `key` to `parent`.
    #[must_use]
    pub fn combine(parent: &str, key: &str) -> String {
        if parent.is_empty() {
            key.to_owned()
        } else {
            format!("{parent}{DELIMITER}{key}")
        }
    }

    /// The last segment of `path`.
    #[must_use]
    pub fn key_of(path: &str) -> &str {
        path.rsplit(DELIMITER).next().unwrap_or(path)
    }

    pub(crate) fn segments(path: &str) -> Vec<&str> {
        if path.is_empty() {
            Vec::new()
        } else {
            path.split(DELIMITER).collect()
        }
    }

}
