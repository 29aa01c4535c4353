/// A candidate value guarded by an optional predicate.
///
/// A rule whose `when` is absent or blank is the default rule of its set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub when: Option<String>,
    pub value: String,
}

impl Rule {
    /// A conditional rule.
    #[must_use]
    pub fn when(predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            when: Some(predicate.into()),
            value: value.into(),
        }
    }

    /// A default rule.
    #[must_use]
    pub fn otherwise(value: impl Into<String>) -> Self {
        Self {
            when: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.predicate().is_none()
    }

    /// The predicate text, if it is non-blank.
    #[must_use]
    pub fn predicate(&self) -> Option<&str> {
        self.when.as_deref().filter(|w| !w.trim().is_empty())
    }
}

/// The ordered rules attached to one configuration node.
///
/// Declaration order is evaluation order. `path` is where the set was read
/// from and only feeds error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    path: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            path: String::new(),
            rules,
        }
    }

    #[must_use]
    pub fn at(path: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            path: path.into(),
            rules,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
