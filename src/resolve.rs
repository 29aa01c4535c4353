use tracing::debug;

use crate::{Context, PredicateEvaluator, Rule, RuleError, RuleSet};

/// Pick the effective value of a rule set.
///
/// Conditional rules are tried in declaration order and the first whose
/// predicate holds wins; later rules are not evaluated. With no match the
/// default rule's value is returned, or `None` without a default.
///
/// # Errors
///
/// - [`RuleError::MalformedRuleSet`] if more than one rule lacks a predicate
/// - any error from `evaluator`, unchanged; a failing rule is never skipped
pub fn resolve<E>(
    rules: &RuleSet,
    context: Option<&Context>,
    evaluator: &E,
) -> Result<Option<String>, RuleError>
where
    E: PredicateEvaluator + ?Sized,
{
    let (default, conditionals) = partition(rules)?;

    for rule in conditionals {
        let Some(predicate) = rule.predicate() else {
            continue;
        };
        if evaluator.evaluate(predicate, context)? {
            debug!(path = rules.path(), predicate, "rule matched");
            return Ok(Some(rule.value.clone()));
        }
    }

    debug!(
        path = rules.path(),
        has_default = default.is_some(),
        "no rule matched"
    );
    Ok(default.map(|rule| rule.value.clone()))
}

fn partition(rules: &RuleSet) -> Result<(Option<&Rule>, Vec<&Rule>), RuleError> {
    let mut default = None;
    let mut conditionals = Vec::with_capacity(rules.len());
    for rule in rules.rules() {
        if !rule.is_default() {
            conditionals.push(rule);
        } else if default.replace(rule).is_some() {
            return Err(RuleError::MalformedRuleSet {
                path: rules.path().to_owned(),
                reason: "more than one default rule".to_owned(),
            });
        }
    }
    Ok((default, conditionals))
}

impl RuleSet {
    /// See [`resolve`].
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn resolve<E>(
        &self,
        context: Option<&Context>,
        evaluator: &E,
    ) -> Result<Option<String>, RuleError>
    where
        E: PredicateEvaluator + ?Sized,
    {
        resolve(self, context, evaluator)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::ExpressionEvaluator;

    /// Answers from a fixed table and records every predicate it is asked about.
    struct Scripted {
        answers: HashMap<&'static str, bool>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(answers: &[(&'static str, bool)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PredicateEvaluator for Scripted {
        fn evaluate(&self, predicate: &str, _: Option<&Context>) -> Result<bool, RuleError> {
            self.seen.lock().unwrap().push(predicate.to_owned());
            self.answers
                .get(predicate)
                .copied()
                .ok_or_else(|| RuleError::Evaluation {
                    predicate: predicate.to_owned(),
                    message: "unscripted".to_owned(),
                })
        }
    }

    fn scenario_rules() -> RuleSet {
        RuleSet::new(vec![Rule::when("Prop1 > 100", "A"), Rule::when("", "B")])
    }

    #[test]
    fn falls_back_to_default() {
        let ctx = Context::new().set("Prop1", 12_i64);
        let value = scenario_rules()
            .resolve(Some(&ctx), &ExpressionEvaluator::new())
            .unwrap();
        assert_eq!(value.as_deref(), Some("B"));
    }

    #[test]
    fn conditional_wins() {
        let ctx = Context::new().set("Prop1", 150_i64);
        let value = scenario_rules()
            .resolve(Some(&ctx), &ExpressionEvaluator::new())
            .unwrap();
        assert_eq!(value.as_deref(), Some("A"));
    }

    #[test]
    fn no_match_without_default_is_none() {
        let ctx = Context::new().set("X", false);
        let rules = RuleSet::new(vec![Rule::when("X", "Y")]);
        assert_eq!(
            rules.resolve(Some(&ctx), &ExpressionEvaluator::new()).unwrap(),
            None
        );
    }

    #[test]
    fn empty_set_is_none() {
        let evaluator = Scripted::new(&[]);
        assert_eq!(RuleSet::default().resolve(None, &evaluator).unwrap(), None);
        assert!(evaluator.seen().is_empty());
    }

    #[test]
    fn first_match_short_circuits() {
        let evaluator = Scripted::new(&[("a", false), ("b", true), ("c", true)]);
        let rules = RuleSet::new(vec![
            Rule::when("a", "1"),
            Rule::when("b", "2"),
            Rule::when("c", "3"),
            Rule::otherwise("0"),
        ]);
        assert_eq!(rules.resolve(None, &evaluator).unwrap().as_deref(), Some("2"));
        assert_eq!(evaluator.seen(), vec!["a", "b"]);
    }

    #[test]
    fn default_position_does_not_matter() {
        let evaluator = Scripted::new(&[("a", false)]);
        let rules = RuleSet::new(vec![Rule::otherwise("fallback"), Rule::when("a", "1")]);
        assert_eq!(
            rules.resolve(None, &evaluator).unwrap().as_deref(),
            Some("fallback")
        );
        assert_eq!(evaluator.seen(), vec!["a"]);
    }

    #[test]
    fn errors_are_not_skipped() {
        let evaluator = Scripted::new(&[("ok", true)]);
        let rules = RuleSet::new(vec![Rule::when("broken", "1"), Rule::when("ok", "2")]);
        assert!(matches!(
            rules.resolve(None, &evaluator),
            Err(RuleError::Evaluation { .. })
        ));
        assert_eq!(evaluator.seen(), vec!["broken"]);
    }

    #[test]
    fn two_defaults_are_malformed() {
        let evaluator = Scripted::new(&[]);
        let rules = RuleSet::at(
            "Feature:_rules",
            vec![Rule::otherwise("a"), Rule::when(" ", "b")],
        );
        match rules.resolve(None, &evaluator) {
            Err(RuleError::MalformedRuleSet { path, .. }) => assert_eq!(path, "Feature:_rules"),
            other => panic!("expected MalformedRuleSet, got {other:?}"),
        }
        assert!(evaluator.seen().is_empty());
    }

    #[test]
    fn only_default_needs_no_context() {
        let rules = RuleSet::new(vec![Rule::otherwise("B")]);
        assert_eq!(
            rules.resolve(None, &ExpressionEvaluator::new()).unwrap().as_deref(),
            Some("B")
        );
    }

    #[test]
    fn missing_context_surfaces_for_conditionals() {
        assert!(matches!(
            scenario_rules().resolve(None, &ExpressionEvaluator::new()),
            Err(RuleError::MissingContext { .. })
        ));
    }
}
