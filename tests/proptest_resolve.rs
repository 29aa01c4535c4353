use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use ruleconf::{
    resolve, Context, ExpressionEvaluator, PredicateEvaluator, Rule, RuleError, RuleSet,
};

/// Answers predicates of the form `r<i>` from a fixed table and counts calls.
struct Table {
    answers: Vec<bool>,
    calls: AtomicUsize,
}

impl Table {
    fn new(answers: Vec<bool>) -> Self {
        Self {
            answers,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PredicateEvaluator for Table {
    fn evaluate(&self, predicate: &str, _context: Option<&Context>) -> Result<bool, RuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let idx: usize = predicate[1..].parse().map_err(|_| RuleError::InvalidPredicate)?;
        Ok(self.answers[idx])
    }
}

fn rule_set(answers: &[bool], default: Option<&str>) -> RuleSet {
    let mut rules: Vec<Rule> = (0..answers.len())
        .map(|i| Rule::when(format!("r{i}"), format!("v{i}")))
        .collect();
    if let Some(value) = default {
        rules.push(Rule::otherwise(value));
    }
    rules.into_iter().collect()
}

/// A small predicate tree over `age` and `banned` that knows its own answer.
#[derive(Debug, Clone)]
enum Pred {
    Age(&'static str, i64),
    Banned,
    Not(Box<Pred>),
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
}

impl Pred {
    fn text(&self) -> String {
        match self {
            Pred::Age(op, n) => format!("age {op} {n}"),
            Pred::Banned => "banned".to_owned(),
            Pred::Not(p) => format!("!({})", p.text()),
            Pred::And(a, b) => format!("({}) and ({})", a.text(), b.text()),
            Pred::Or(a, b) => format!("({}) || ({})", a.text(), b.text()),
        }
    }

    fn holds(&self, age: i64, banned: bool) -> bool {
        match self {
            Pred::Age(op, n) => match *op {
                "==" => age == *n,
                "!=" => age != *n,
                ">" => age > *n,
                ">=" => age >= *n,
                "<" => age < *n,
                _ => age <= *n,
            },
            Pred::Banned => banned,
            Pred::Not(p) => !p.holds(age, banned),
            Pred::And(a, b) => a.holds(age, banned) && b.holds(age, banned),
            Pred::Or(a, b) => a.holds(age, banned) || b.holds(age, banned),
        }
    }
}

fn arb_pred() -> impl Strategy<Value = Pred> {
    let leaf = prop_oneof![
        (
            prop::sample::select(&["==", "!=", ">", ">=", "<", "<="][..]),
            -5_i64..130
        )
            .prop_map(|(op, n)| Pred::Age(op, n)),
        Just(Pred::Banned),
    ];
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|p| Pred::Not(Box::new(p))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Pred::And(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Pred::Or(Box::new(a), Box::new(b))),
        ]
    })
}

proptest! {
    /// The first rule whose predicate holds decides the value, and nothing
    /// after it is evaluated.
    #[test]
    fn first_match_wins(answers in prop::collection::vec(any::<bool>(), 0..12)) {
        let table = Table::new(answers.clone());
        let rules = rule_set(&answers, Some("fallback"));
        let ctx = Context::new();

        let resolved = resolve(&rules, Some(&ctx), &table).unwrap();

        match answers.iter().position(|&a| a) {
            Some(i) => {
                prop_assert_eq!(resolved, Some(format!("v{i}")));
                prop_assert_eq!(table.calls.load(Ordering::SeqCst), i + 1);
            }
            None => {
                prop_assert_eq!(resolved.as_deref(), Some("fallback"));
                prop_assert_eq!(table.calls.load(Ordering::SeqCst), answers.len());
            }
        }
    }

    /// Without a default, no match resolves to nothing.
    #[test]
    fn no_default_means_absent(n in 0_usize..8) {
        let answers = vec![false; n];
        let table = Table::new(answers.clone());
        let ctx = Context::new();
        prop_assert_eq!(resolve(&rule_set(&answers, None), Some(&ctx), &table).unwrap(), None);
    }

    /// Where the default sits in the list does not change the outcome.
    #[test]
    fn default_position_is_irrelevant(
        answers in prop::collection::vec(any::<bool>(), 1..8),
        at in any::<prop::sample::Index>(),
    ) {
        let mut rules: Vec<Rule> = rule_set(&answers, None).rules().to_vec();
        let pos = at.index(rules.len() + 1);
        rules.insert(pos, Rule::otherwise("fallback"));
        let moved: RuleSet = rules.into_iter().collect();

        let ctx = Context::new();
        let expected = resolve(&rule_set(&answers, Some("fallback")), Some(&ctx), &Table::new(answers.clone())).unwrap();
        prop_assert_eq!(resolve(&moved, Some(&ctx), &Table::new(answers)).unwrap(), expected);
    }

    /// The built-in evaluator agrees with a direct reading of the predicate.
    #[test]
    fn evaluator_matches_reference(
        pred in arb_pred(),
        age in 0_i64..=120,
        banned in any::<bool>(),
    ) {
        let evaluator = ExpressionEvaluator::new();
        let ctx = Context::new().set("age", age).set("banned", banned);
        let text = pred.text();
        prop_assert_eq!(evaluator.evaluate(&text, Some(&ctx)).unwrap(), pred.holds(age, banned), "{}", text);
        // second run is served from the cache
        prop_assert_eq!(evaluator.evaluate(&text, Some(&ctx)).unwrap(), pred.holds(age, banned));
        prop_assert_eq!(evaluator.cache().compilations(), 1);
    }
}
