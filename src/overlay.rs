use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::tree::path;
use crate::{
    ConfigTree, ContextSource, ExpressionEvaluator, PredicateCache, PredicateEvaluator, ReloadToken,
    Rule, RuleError, RuleSet,
};

/// Child key that marks a node as rule-bearing unless configured otherwise.
pub const DEFAULT_RULES_KEY: &str = "_rules";

/// Key names the overlay looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Deserialize), serde(default))]
pub struct OverlayOptions {
    /// Child key marking a node as rule-bearing. Pick something that never
    /// appears as an ordinary configuration key.
    pub rules_key: String,
    /// Key of a rule entry's predicate.
    pub when_key: String,
    /// Key of a rule entry's value.
    pub value_key: String,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            rules_key: DEFAULT_RULES_KEY.to_owned(),
            when_key: "when".to_owned(),
            value_key: "value".to_owned(),
        }
    }
}

/// Builder for a [`RuleOverlay`], obtained from [`RuleOverlay::builder()`].
///
/// Without a context source, resolving any conditional rule fails with
/// [`RuleError::MissingContext`]. Without an evaluator, an
/// [`ExpressionEvaluator`] with a fresh cache is used.
pub struct OverlayBuilder {
    tree: Arc<dyn ConfigTree>,
    context: Option<Arc<dyn ContextSource>>,
    evaluator: Option<Arc<dyn PredicateEvaluator>>,
    options: OverlayOptions,
}

impl OverlayBuilder {
    #[must_use]
    pub fn context(mut self, source: impl ContextSource + 'static) -> Self {
        self.context = Some(Arc::new(source));
        self
    }

    /// Evaluate predicates with `evaluator`. Replaces any earlier
    /// [`cache`](Self::cache) setting; the last of the two calls wins.
    #[must_use]
    pub fn evaluator(mut self, evaluator: impl PredicateEvaluator + 'static) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Use the built-in evaluator backed by `cache`, e.g. to share compiled
    /// predicates between overlays. Replaces any earlier
    /// [`evaluator`](Self::evaluator) setting; the last of the two calls wins.
    #[must_use]
    pub fn cache(self, cache: Arc<PredicateCache>) -> Self {
        self.evaluator(ExpressionEvaluator::with_cache(cache))
    }

    #[must_use]
    pub fn options(mut self, options: OverlayOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn rules_key(mut self, key: impl Into<String>) -> Self {
        self.options.rules_key = key.into();
        self
    }

    #[must_use]
    pub fn build(self) -> RuleOverlay {
        let context: Arc<dyn ContextSource> = match self.context {
            Some(context) => context,
            None => Arc::new(crate::source::from_fn(|| None)),
        };
        let evaluator: Arc<dyn PredicateEvaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Arc::new(ExpressionEvaluator::new()),
        };
        RuleOverlay {
            inner: Arc::new(Inner {
                tree: self.tree,
                context,
                evaluator,
                options: self.options,
            }),
        }
    }
}

/// Read-through view of a [`ConfigTree`] that resolves rule-bearing
/// sections to a single value.
///
/// A node is rule-bearing when one of its children is the rules marker
/// (`_rules` by default). The marker's children are rule entries, each with
/// a `when` predicate and a `value`. Reading such a node through
/// [`section()`](Self::section) or [`children()`](Self::children) yields a
/// [`Section`] whose value is the resolved one.
///
/// Nothing is cached apart from compiled predicates, so every read sees the
/// tree's and the context source's current state. Clones share everything.
///
/// ```
/// use ruleconf::{Context, MemoryTree, RuleOverlay};
///
/// let tree = MemoryTree::from_pairs([
///     ("Feature:_rules:0:when", "Prop1 > 100"),
///     ("Feature:_rules:0:value", "A"),
///     ("Feature:_rules:1:value", "B"),
/// ]);
/// let overlay = RuleOverlay::new(tree, Context::new().set("Prop1", 12_i64));
/// assert_eq!(overlay.section("Feature")?.value(), Some("B"));
/// # Ok::<(), ruleconf::RuleError>(())
/// ```
#[derive(Clone)]
pub struct RuleOverlay {
    inner: Arc<Inner>,
}

struct Inner {
    tree: Arc<dyn ConfigTree>,
    context: Arc<dyn ContextSource>,
    evaluator: Arc<dyn PredicateEvaluator>,
    options: OverlayOptions,
}

impl fmt::Debug for RuleOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOverlay")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl RuleOverlay {
    #[must_use]
    pub fn builder(tree: impl ConfigTree + 'static) -> OverlayBuilder {
        OverlayBuilder {
            tree: Arc::new(tree),
            context: None,
            evaluator: None,
            options: OverlayOptions::default(),
        }
    }

    /// Overlay `tree` with the default evaluator and options.
    #[must_use]
    pub fn new(tree: impl ConfigTree + 'static, context: impl ContextSource + 'static) -> Self {
        Self::builder(tree).context(context).build()
    }

    #[must_use]
    pub fn options(&self) -> &OverlayOptions {
        &self.inner.options
    }

    /// Direct scalar read. Does not look for rules: a rule-bearing key read
    /// this way returns whatever raw value the tree holds for it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.tree.value(key)
    }

    /// The section at `key`, with rules resolved.
    ///
    /// # Errors
    ///
    /// Any [`RuleError`] raised while resolving the section's rules.
    pub fn section(&self, key: &str) -> Result<Section, RuleError> {
        self.materialize(key.to_owned())
    }

    /// The top-level sections, with rules resolved.
    ///
    /// # Errors
    ///
    /// The first [`RuleError`] raised by any child.
    pub fn children(&self) -> Result<Vec<Section>, RuleError> {
        self.children_of("")
    }

    /// The underlying tree's token.
    #[must_use]
    pub fn reload_token(&self) -> ReloadToken {
        self.inner.tree.reload_token()
    }

    /// Every value in the tree as `path → value`, with rule-bearing nodes
    /// resolved and rule declarations left out.
    ///
    /// # Errors
    ///
    /// The first [`RuleError`] raised anywhere in the tree.
    pub fn flatten(&self) -> Result<BTreeMap<String, String>, RuleError> {
        let mut out = BTreeMap::new();
        self.flatten_into("", &mut out)?;
        Ok(out)
    }

    fn materialize(&self, path: String) -> Result<Section, RuleError> {
        let value = if self.is_rule_bearing(&path) {
            self.resolve_at(&path)?
        } else {
            self.inner.tree.value(&path)
        };
        Ok(Section {
            overlay: self.clone(),
            key: path::key_of(&path).to_owned(),
            path,
            value,
        })
    }

    fn children_of(&self, parent: &str) -> Result<Vec<Section>, RuleError> {
        self.inner
            .tree
            .child_keys(parent)
            .iter()
            .map(|key| self.materialize(path::combine(parent, key)))
            .collect()
    }

    fn is_rule_bearing(&self, path: &str) -> bool {
        self.inner
            .tree
            .child_keys(path)
            .iter()
            .any(|key| *key == self.inner.options.rules_key)
    }

    fn resolve_at(&self, path: &str) -> Result<Option<String>, RuleError> {
        let marker = path::combine(path, &self.inner.options.rules_key);
        let rules = self.read_rule_set(marker)?;
        let context = self.inner.context.context();
        let value = rules.resolve(context.as_ref(), self.inner.evaluator.as_ref())?;
        debug!(
            path,
            rules = rules.len(),
            resolved = value.is_some(),
            "resolved rule-bearing section"
        );
        Ok(value)
    }

    fn read_rule_set(&self, marker: String) -> Result<RuleSet, RuleError> {
        let tree = &self.inner.tree;
        let options = &self.inner.options;
        if tree.value(&marker).is_some() {
            return Err(RuleError::MalformedRuleSet {
                path: marker,
                reason: "rules marker holds a scalar instead of rule entries".to_owned(),
            });
        }
        let mut rules = Vec::new();
        for key in entry_keys(tree.child_keys(&marker)) {
            let entry = path::combine(&marker, &key);
            let when = tree.value(&path::combine(&entry, &options.when_key));
            let value = tree.value(&path::combine(&entry, &options.value_key));
            match (when, value) {
                (when, Some(value)) => rules.push(Rule { when, value }),
                (None, None) => {
                    return Err(RuleError::MalformedRuleSet {
                        path: marker,
                        reason: format!(
                            "entry '{key}' has neither '{}' nor '{}'",
                            options.when_key, options.value_key
                        ),
                    });
                }
                (Some(_), None) => {
                    return Err(RuleError::MalformedRuleSet {
                        path: marker,
                        reason: format!("entry '{key}' has no '{}'", options.value_key),
                    });
                }
            }
        }
        Ok(RuleSet::at(marker, rules))
    }

    fn flatten_into(&self, parent: &str, out: &mut BTreeMap<String, String>) -> Result<(), RuleError> {
        for key in self.inner.tree.child_keys(parent) {
            if key == self.inner.options.rules_key {
                continue;
            }
            let section = self.materialize(path::combine(parent, &key))?;
            self.flatten_into(&section.path, out)?;
            if let Some(value) = section.value {
                out.insert(section.path, value);
            }
        }
        Ok(())
    }
}

/// Rule entries in declaration order: by index when every key is an
/// integer, tree order otherwise.
fn entry_keys(mut keys: Vec<String>) -> Vec<String> {
    if keys.iter().all(|key| key.parse::<u64>().is_ok()) {
        keys.sort_by_key(|key| key.parse::<u64>().unwrap_or(u64::MAX));
    }
    keys
}

/// A node read through a [`RuleOverlay`].
///
/// Carries the node's materialized value and reads its descendants through
/// the same overlay.
#[derive(Debug, Clone)]
pub struct Section {
    overlay: RuleOverlay,
    key: String,
    path: String,
    value: Option<String>,
}

impl Section {
    /// Last segment of the path.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resolved value for rule-bearing nodes, the tree's value otherwise.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn into_value(self) -> Option<String> {
        self.value
    }

    /// Whether the node has a value or any children.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.value.is_some() || !self.overlay.inner.tree.child_keys(&self.path).is_empty()
    }

    /// Direct scalar read below this section; see [`RuleOverlay::get`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.overlay.get(&path::combine(&self.path, key))
    }

    /// # Errors
    ///
    /// See [`RuleOverlay::section`].
    pub fn section(&self, key: &str) -> Result<Section, RuleError> {
        self.overlay.materialize(path::combine(&self.path, key))
    }

    /// # Errors
    ///
    /// See [`RuleOverlay::children`].
    pub fn children(&self) -> Result<Vec<Section>, RuleError> {
        self.overlay.children_of(&self.path)
    }

    #[must_use]
    pub fn reload_token(&self) -> ReloadToken {
        self.overlay.reload_token()
    }

    /// Values below this section, keyed by full path. The section's own
    /// value is not included.
    ///
    /// # Errors
    ///
    /// See [`RuleOverlay::flatten`].
    pub fn flatten(&self) -> Result<BTreeMap<String, String>, RuleError> {
        let mut out = BTreeMap::new();
        self.overlay.flatten_into(&self.path, &mut out)?;
        Ok(out)
    }
}

/// Wrap any [`ConfigTree`] in a [`RuleOverlay`] in one call.
pub trait ConfigTreeExt: ConfigTree + Sized + 'static {
    fn with_rules(self, context: impl ContextSource + 'static) -> RuleOverlay {
        RuleOverlay::new(self, context)
    }
}

impl<T: ConfigTree + 'static> ConfigTreeExt for T {}
