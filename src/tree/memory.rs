use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::path;
use super::{ChangeSignal, ConfigTree, ReloadToken};

#[derive(Debug, Default, Clone, PartialEq)]
pub(super) struct Node {
    pub(super) value: Option<String>,
    pub(super) children: Vec<(String, Node)>,
}

impl Node {
    fn find(&self, segments: &[&str]) -> Option<&Node> {
        let mut node = self;
        for seg in segments {
            node = node
                .children
                .iter()
                .find(|(key, _)| key == seg)
                .map(|(_, child)| child)?;
        }
        Some(node)
    }

    fn find_mut(&mut self, segments: &[&str]) -> Option<&mut Node> {
        let mut node = self;
        for seg in segments {
            node = node
                .children
                .iter_mut()
                .find(|(key, _)| key == seg)
                .map(|(_, child)| child)?;
        }
        Some(node)
    }

    fn entry(&mut self, segments: &[&str]) -> &mut Node {
        let mut node = self;
        for seg in segments {
            let idx = match node.children.iter().position(|(key, _)| key == seg) {
                Some(idx) => idx,
                None => {
                    node.children.push(((*seg).to_owned(), Node::default()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx].1;
        }
        node
    }

    fn from_pairs<I, K, V>(pairs: I) -> Node
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut root = Node::default();
        for (key, value) in pairs {
            root.entry(&path::segments(key.as_ref())).value = Some(value.into());
        }
        root
    }
}

/// An in-memory [`ConfigTree`] that keeps children in insertion order.
///
/// Every mutation raises the tree's change signal, so outstanding
/// [`ReloadToken`]s report a change and overlays pick up the new content on
/// their next read.
#[derive(Debug)]
pub struct MemoryTree {
    root: RwLock<Node>,
    signal: Arc<ChangeSignal>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::with_root(Node::default())
    }
}

impl MemoryTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(path, value)` pairs.
    ///
    /// ```
    /// use ruleconf::{ConfigTree, MemoryTree};
    ///
    /// let tree = MemoryTree::from_pairs([
    ///     ("Feature:_rules:0:when", "Prop1 > 100"),
    ///     ("Feature:_rules:0:value", "A"),
    /// ]);
    /// assert_eq!(tree.child_keys("Feature"), vec!["_rules"]);
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::with_root(Node::from_pairs(pairs))
    }

    pub(super) fn with_root(root: Node) -> Self {
        Self {
            root: RwLock::new(root),
            signal: ChangeSignal::new(),
        }
    }

    /// Set the value at `path`, creating intermediate nodes.
    pub fn set(&self, path: &str, value: impl Into<String>) {
        self.write().entry(&path::segments(path)).value = Some(value.into());
        debug!(path, "configuration value set");
        self.signal.raise();
    }

    /// Remove the node at `path` and everything below it.
    /// Returns whether anything was removed.
    pub fn remove(&self, path: &str) -> bool {
        let segments = path::segments(path);
        let Some((last, parent)) = segments.split_last() else {
            return false;
        };
        let removed = {
            let mut root = self.write();
            match root.find_mut(parent) {
                Some(parent) => {
                    let before = parent.children.len();
                    parent.children.retain(|(key, _)| key != last);
                    before != parent.children.len()
                }
                None => false,
            }
        };
        if removed {
            debug!(path, "configuration node removed");
            self.signal.raise();
        }
        removed
    }

    /// Swap the whole content for `pairs`, as a reload from a source would.
    pub fn replace<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.replace_root(Node::from_pairs(pairs));
    }

    pub(super) fn replace_root(&self, root: Node) {
        *self.write() = root;
        debug!("configuration reloaded");
        self.signal.raise();
    }

    fn read(&self) -> RwLockReadGuard<'_, Node> {
        self.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Node> {
        self.root.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigTree for MemoryTree {
    fn value(&self, path: &str) -> Option<String> {
        self.read()
            .find(&path::segments(path))
            .and_then(|node| node.value.clone())
    }

    fn child_keys(&self, path: &str) -> Vec<String> {
        self.read()
            .find(&path::segments(path))
            .map(|node| node.children.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn reload_token(&self) -> ReloadToken {
        self.signal.token()
    }
}
