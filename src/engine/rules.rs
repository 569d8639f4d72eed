//! The mark rule families
//!
//! Architecture: Pure Rule Functions - Each family inspects one node against
//! one configured rule and returns the violations it found
//! - Families never abort each other; every function is total over the node model
//! - Decorator matching is a shape predicate over plain data
//! - Violation codes combine the family digit with the slot's two-digit suffix

use crate::config::{RuleConfig, RuleSlot, ValueMatch};
use crate::domain::violations::Violation;
use crate::syntax::{Argument, Decorator, DefNode};
use regex::Regex;
use uuid::Uuid;

use super::collision::{CollisionTracker, MarkOwner};

/// Two-digit code suffix derived from a slot name: the decimal digits
/// embedded in the name, left-padded with `0` to width 2
/// (`pytest_mark1` -> `01`, `pytest_mark49` -> `49`).
pub(crate) fn mark_code(rule_name: &str) -> String {
    let digits: String = rule_name.chars().filter(char::is_ascii_digit).collect();
    format!("{digits:0>2}")
}

/// `re.match` semantics: the pattern must match anchored at the start of
/// the text, but need not consume all of it.
pub(crate) fn matches_at_start(regex: &Regex, text: &str) -> bool {
    regex.find(text).is_some_and(|m| m.start() == 0)
}

/// Decorators on `node` shaped exactly `pytest.mark.<mark>(...)`
///
/// Anything else - different namespace, bare identifier, attribute access
/// without a call - is excluded here, never an error.
fn matching_decorators<'a>(node: &'a DefNode, mark: &str) -> Vec<&'a Decorator> {
    node.decorators
        .iter()
        .filter(|decorator| {
            decorator.args.is_some()
                && matches!(decorator.path.as_slice(), [ns, attr, name]
                    if ns == "pytest" && attr == "mark" && name == mark)
        })
        .collect()
}

/// Positional string-literal arguments of a decorator call, in source
/// order; non-string arguments are dropped (M7xx owns type validation)
fn string_args(decorator: &Decorator) -> Vec<&str> {
    decorator.args.as_deref().unwrap_or_default().iter().filter_map(Argument::as_str).collect()
}

/// Render a value list the way violation messages quote it: bracketed,
/// single-quoted, comma-separated
fn format_values(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    format!("[{}]", quoted.join(", "))
}

/// M3xx: mark values configured with `enforce_unique_value` must be unique
/// across the whole run, across files, including within one call
pub(crate) fn rule_m3xx(
    node: &DefNode,
    slot: RuleSlot,
    conf: &RuleConfig,
    mark: &str,
    filename: &str,
    tracker: &mut CollisionTracker,
) -> Vec<Violation> {
    if !conf.enforce_unique_value {
        return Vec::new();
    }

    let rule_name = slot.name();
    let mut clauses = String::new();
    for decorator in matching_decorators(node, mark) {
        for value in string_args(decorator) {
            let owner = MarkOwner {
                test_name: node.name.clone(),
                line: node.line,
                file: filename.to_string(),
            };
            if let Some(original) = tracker.record_or_report(&rule_name, value, owner) {
                clauses.push_str(&format!(
                    "The '{}' mark value already specified for the '{}' test at line '{}' \
                     found in the '{}' file! ",
                    value, original.test_name, original.line, original.file
                ));
            }
        }
    }

    if clauses.is_empty() {
        return Vec::new();
    }
    let message = format!(
        "M3{} @pytest.mark.{} value is not unique! {}",
        mark_code(&rule_name),
        mark,
        clauses.trim_end()
    );
    vec![Violation::new(node.line, message)]
}

/// M5xx: a configured mark must be present on every qualifying test
pub(crate) fn rule_m5xx(
    node: &DefNode,
    slot: RuleSlot,
    _conf: &RuleConfig,
    mark: &str,
) -> Vec<Violation> {
    if !matching_decorators(node, mark).is_empty() {
        return Vec::new();
    }
    let message =
        format!("M5{} test definition not marked with {}", mark_code(&slot.name()), mark);
    vec![Violation::new(node.line, message)]
}

/// M6xx: mark values must satisfy the configured shape validator
///
/// Aggregates every non-matching value across all matching decorators into
/// one violation per node. A configured validator with no values at all is
/// itself a failure.
pub(crate) fn rule_m6xx(
    node: &DefNode,
    slot: RuleSlot,
    conf: &RuleConfig,
    mark: &str,
) -> Vec<Violation> {
    if !conf.has_validator() {
        return Vec::new();
    }
    let decorators = matching_decorators(node, mark);
    if decorators.is_empty() {
        return Vec::new();
    }

    let values: Vec<&str> = decorators.iter().flat_map(|d| string_args(d)).collect();
    let mut non_matching: Vec<String> = Vec::new();
    let mut detail = String::new();

    if values.is_empty() {
        non_matching.push(String::new());
        detail = "Validation supplied, but values absent.".to_string();
    } else if let Some(regex) = &conf.value_regex {
        // Regex wins over value_match when both are configured
        for value in values {
            if !matches_at_start(regex, value) {
                non_matching.push(value.to_string());
                detail = format!("Configured regex: '{}'", regex.as_str());
            }
        }
    } else if conf.value_match == Some(ValueMatch::Uuid) {
        for value in values {
            if let Err(e) = Uuid::parse_str(value) {
                non_matching.push(value.to_string());
                detail = e.to_string();
            }
        }
    }

    if non_matching.is_empty() {
        return Vec::new();
    }
    let message = format!(
        "M6{} the mark values '{}' do not match the configuration specified by {}, {}",
        mark_code(&slot.name()),
        format_values(&non_matching),
        slot.name(),
        detail
    );
    vec![Violation::new(node.line, message)]
}

/// M7xx: every argument to a matching mark must be a string literal;
/// reported once per node
pub(crate) fn rule_m7xx(
    node: &DefNode,
    slot: RuleSlot,
    _conf: &RuleConfig,
    mark: &str,
) -> Vec<Violation> {
    let any_non_string = matching_decorators(node, mark).iter().any(|decorator| {
        decorator
            .args
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|arg| matches!(arg, Argument::Other))
    });

    if !any_non_string {
        return Vec::new();
    }
    let message = format!("M7{} mark values must be strings", mark_code(&slot.name()));
    vec![Violation::new(node.line, message)]
}

/// M8xx: a mark may decorate a test only once unless `allow_duplicate`
pub(crate) fn rule_m8xx(
    node: &DefNode,
    slot: RuleSlot,
    conf: &RuleConfig,
    mark: &str,
) -> Vec<Violation> {
    if conf.allow_duplicate || matching_decorators(node, mark).len() < 2 {
        return Vec::new();
    }
    let message = format!(
        "M8{} @pytest.mark.{} may only be called once for a given test",
        mark_code(&slot.name()),
        mark
    );
    vec![Violation::new(node.line, message)]
}

/// M9xx: a mark call takes one positional argument unless
/// `allow_multiple_args`; one violation per offending call
pub(crate) fn rule_m9xx(
    node: &DefNode,
    slot: RuleSlot,
    conf: &RuleConfig,
    mark: &str,
) -> Vec<Violation> {
    if conf.allow_multiple_args {
        return Vec::new();
    }
    matching_decorators(node, mark)
        .into_iter()
        .filter(|decorator| decorator.args.as_deref().unwrap_or_default().len() > 1)
        .map(|_| {
            let message = format!(
                "M9{} you may only specify one argument to @pytest.mark.{}",
                mark_code(&slot.name()),
                mark
            );
            Violation::new(node.line, message)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn named_rule(mark: &str) -> RuleConfig {
        RuleConfig { name: Some(mark.to_string()), ..Default::default() }
    }

    fn marked_test(mark: &str, values: &[&str]) -> DefNode {
        DefNode::function("test_happy_path", 1).with_decorator(Decorator::pytest_mark(
            mark,
            values.iter().map(|value| Argument::str(*value)).collect(),
        ))
    }

    #[rstest]
    #[case("pytest_mark1", "01")]
    #[case("pytest_mark9", "09")]
    #[case("pytest_mark10", "10")]
    #[case("pytest_mark49", "49")]
    fn test_mark_code_derivation(#[case] rule_name: &str, #[case] expected: &str) {
        assert_eq!(mark_code(rule_name), expected);
    }

    #[test]
    fn test_matching_ignores_foreign_decorator_shapes() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::call(["mock", "patch"], vec![Argument::str("os.path")]))
            .with_decorator(Decorator::reference(["pytest", "mark", "jira"]))
            .with_decorator(Decorator::reference(["fixture"]))
            .with_decorator(Decorator::pytest_mark("jira", vec![Argument::str("ASC-1")]));

        assert_eq!(matching_decorators(&node, "jira").len(), 1);
    }

    #[test]
    fn test_matching_requires_pytest_namespace() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::call(["other", "mark", "jira"], vec![Argument::str("X-1")]));

        assert!(matching_decorators(&node, "jira").is_empty());
    }

    #[test]
    fn test_m5xx_fires_without_matching_decorator() {
        let node = DefNode::function("test_happy_path", 1);
        let conf = named_rule("test_id");

        let violations = rule_m5xx(&node, RuleSlot(1), &conf, "test_id");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "M501 test definition not marked with test_id");
        assert_eq!(violations[0].line, 1);
    }

    #[test]
    fn test_m5xx_satisfied_by_mark_with_no_args() {
        let node = marked_test("test_id", &[]);
        let conf = named_rule("test_id");

        assert!(rule_m5xx(&node, RuleSlot(1), &conf, "test_id").is_empty());
    }

    #[test]
    fn test_m6xx_reports_only_failing_values() {
        let node = marked_test("jira", &["ASC-123", "not_good", "ASC-125"]);
        let conf = RuleConfig {
            name: Some("jira".to_string()),
            value_regex: Some(Regex::new(r"[a-zA-Z]*-\d*").unwrap()),
            allow_multiple_args: true,
            ..Default::default()
        };

        let violations = rule_m6xx(&node, RuleSlot(1), &conf, "jira");
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "M601 the mark values '['not_good']' do not match the configuration specified \
             by pytest_mark1, Configured regex: '[a-zA-Z]*-\\d*'"
        );
    }

    #[test]
    fn test_m6xx_regex_is_anchored_at_start() {
        let node = marked_test("jira", &["prefix-ASC-123"]);
        let conf = RuleConfig {
            name: Some("jira".to_string()),
            value_regex: Some(Regex::new(r"ASC-\d+").unwrap()),
            ..Default::default()
        };

        // The pattern occurs inside the value but not at its start
        let violations = rule_m6xx(&node, RuleSlot(1), &conf, "jira");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_m6xx_uuid_failure_embeds_parser_detail() {
        let node = marked_test("test_id", &["not-a-uuid"]);
        let conf = RuleConfig {
            name: Some("test_id".to_string()),
            value_match: Some(ValueMatch::Uuid),
            ..Default::default()
        };

        let violations = rule_m6xx(&node, RuleSlot(1), &conf, "test_id");
        assert_eq!(violations.len(), 1);
        let expected_detail = Uuid::parse_str("not-a-uuid").unwrap_err().to_string();
        assert!(violations[0].message.starts_with(
            "M601 the mark values '['not-a-uuid']' do not match the configuration \
             specified by pytest_mark1, "
        ));
        assert!(violations[0].message.ends_with(&expected_detail));
    }

    #[test]
    fn test_m6xx_valid_uuid_passes() {
        let node = marked_test("test_id", &["b360c12d-0d47-4cfc-9f9e-5d86c315b1e4"]);
        let conf = RuleConfig {
            name: Some("test_id".to_string()),
            value_match: Some(ValueMatch::Uuid),
            ..Default::default()
        };

        assert!(rule_m6xx(&node, RuleSlot(1), &conf, "test_id").is_empty());
    }

    #[test]
    fn test_m6xx_regex_wins_over_value_match() {
        // A valid UUID that fails the regex must still be reported
        let node = marked_test("test_id", &["b360c12d-0d47-4cfc-9f9e-5d86c315b1e4"]);
        let conf = RuleConfig {
            name: Some("test_id".to_string()),
            value_regex: Some(Regex::new("^this_is_a_regex").unwrap()),
            value_match: Some(ValueMatch::Uuid),
            ..Default::default()
        };

        let violations = rule_m6xx(&node, RuleSlot(1), &conf, "test_id");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Configured regex: '^this_is_a_regex'"));
    }

    #[test]
    fn test_m6xx_validator_with_absent_values() {
        let node = marked_test("jira", &[]);
        let conf = RuleConfig {
            name: Some("jira".to_string()),
            value_regex: Some(Regex::new(r"[a-zA-Z]*-\d*").unwrap()),
            ..Default::default()
        };

        let violations = rule_m6xx(&node, RuleSlot(1), &conf, "jira");
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "M601 the mark values '['']' do not match the configuration specified by \
             pytest_mark1, Validation supplied, but values absent."
        );
    }

    #[test]
    fn test_m6xx_silent_without_matching_decorator() {
        // Presence is M5xx's job; an unmarked test produces no M6xx
        let node = DefNode::function("test_happy_path", 1);
        let conf = RuleConfig {
            name: Some("jira".to_string()),
            value_regex: Some(Regex::new("x").unwrap()),
            ..Default::default()
        };

        assert!(rule_m6xx(&node, RuleSlot(1), &conf, "jira").is_empty());
    }

    #[test]
    fn test_m7xx_fires_once_per_node() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::pytest_mark(
                "jira",
                vec![Argument::str("ASC-1"), Argument::Other],
            ))
            .with_decorator(Decorator::pytest_mark("jira", vec![Argument::Other]));
        let conf = named_rule("jira");

        let violations = rule_m7xx(&node, RuleSlot(1), &conf, "jira");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "M701 mark values must be strings");
    }

    #[test]
    fn test_m7xx_silent_for_all_string_args() {
        let node = marked_test("jira", &["ASC-1", "ASC-2"]);
        let conf = named_rule("jira");

        assert!(rule_m7xx(&node, RuleSlot(1), &conf, "jira").is_empty());
    }

    #[test]
    fn test_m8xx_fires_on_duplicate_marks() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::pytest_mark("test_id", vec![Argument::str("a")]))
            .with_decorator(Decorator::pytest_mark("test_id", vec![Argument::str("a")]));
        let conf = named_rule("test_id");

        let violations = rule_m8xx(&node, RuleSlot(1), &conf, "test_id");
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "M801 @pytest.mark.test_id may only be called once for a given test"
        );
    }

    #[test]
    fn test_m8xx_suppressed_by_allow_duplicate() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::pytest_mark("test_id", vec![Argument::str("a")]))
            .with_decorator(Decorator::pytest_mark("test_id", vec![Argument::str("a")]));
        let conf = RuleConfig { allow_duplicate: true, ..named_rule("test_id") };

        assert!(rule_m8xx(&node, RuleSlot(1), &conf, "test_id").is_empty());
    }

    #[test]
    fn test_m9xx_fires_per_offending_call() {
        let node = DefNode::function("test_happy_path", 1)
            .with_decorator(Decorator::pytest_mark(
                "test_id",
                vec![Argument::str("too"), Argument::str("many")],
            ))
            .with_decorator(Decorator::pytest_mark(
                "test_id",
                vec![Argument::str("way"), Argument::str("too"), Argument::str("many")],
            ))
            .with_decorator(Decorator::pytest_mark("test_id", vec![Argument::str("fine")]));
        let conf = named_rule("test_id");

        let violations = rule_m9xx(&node, RuleSlot(1), &conf, "test_id");
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].message,
            "M901 you may only specify one argument to @pytest.mark.test_id"
        );
    }

    #[test]
    fn test_m9xx_counts_non_string_args_too() {
        let node = DefNode::function("test_happy_path", 1).with_decorator(
            Decorator::pytest_mark("test_id", vec![Argument::str("a"), Argument::Other]),
        );
        let conf = named_rule("test_id");

        assert_eq!(rule_m9xx(&node, RuleSlot(1), &conf, "test_id").len(), 1);
    }

    #[test]
    fn test_m9xx_suppressed_by_allow_multiple_args() {
        let node = marked_test("test_id", &["too", "many", "args"]);
        let conf = RuleConfig { allow_multiple_args: true, ..named_rule("test_id") };

        assert!(rule_m9xx(&node, RuleSlot(1), &conf, "test_id").is_empty());
    }

    #[test]
    fn test_m3xx_silent_without_enforcement() {
        let mut tracker = CollisionTracker::new();
        let node = marked_test("test", &["Unique!"]);
        let conf = named_rule("test");

        let first = rule_m3xx(&node, RuleSlot(1), &conf, "test", "a.py", &mut tracker);
        let second = rule_m3xx(&node, RuleSlot(1), &conf, "test", "b.py", &mut tracker);
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn test_m3xx_first_occurrence_records_silently() {
        let mut tracker = CollisionTracker::new();
        let node = marked_test("test", &["Unique!"]);
        let conf = RuleConfig { enforce_unique_value: true, ..named_rule("test") };

        assert!(rule_m3xx(&node, RuleSlot(1), &conf, "test", "a.py", &mut tracker).is_empty());
    }

    #[test]
    fn test_m3xx_collision_reports_original_owner() {
        let mut tracker = CollisionTracker::new();
        let conf = RuleConfig { enforce_unique_value: true, ..named_rule("test") };

        let first = DefNode::function("test_unique", 1)
            .with_decorator(Decorator::pytest_mark("test", vec![Argument::str("Unique!")]));
        let second = DefNode::function("test_not_unique", 5)
            .with_decorator(Decorator::pytest_mark("test", vec![Argument::str("Unique!")]));

        rule_m3xx(&first, RuleSlot(1), &conf, "test", "example.py", &mut tracker);
        let violations =
            rule_m3xx(&second, RuleSlot(1), &conf, "test", "example.py", &mut tracker);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 5);
        assert_eq!(
            violations[0].message,
            "M301 @pytest.mark.test value is not unique! The 'Unique!' mark value already \
             specified for the 'test_unique' test at line '1' found in the 'example.py' file!"
        );
    }

    #[test]
    fn test_m3xx_duplicate_within_one_call() {
        let mut tracker = CollisionTracker::new();
        let conf = RuleConfig {
            enforce_unique_value: true,
            allow_duplicate: true,
            allow_multiple_args: true,
            ..named_rule("test")
        };
        let node = DefNode::function("test_not_so_unique", 1).with_decorator(
            Decorator::pytest_mark("test", vec![Argument::str("Unique!"), Argument::str("Unique!")]),
        );

        let violations = rule_m3xx(&node, RuleSlot(1), &conf, "test", "example.py", &mut tracker);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "M301 @pytest.mark.test value is not unique! The 'Unique!' mark value already \
             specified for the 'test_not_so_unique' test at line '1' found in the \
             'example.py' file!"
        );
    }

    #[test]
    fn test_m3xx_appends_one_clause_per_colliding_value() {
        let mut tracker = CollisionTracker::new();
        let conf = RuleConfig {
            enforce_unique_value: true,
            allow_multiple_args: true,
            ..named_rule("test")
        };

        let first = DefNode::function("test_first", 1).with_decorator(Decorator::pytest_mark(
            "test",
            vec![Argument::str("one"), Argument::str("two")],
        ));
        let second = DefNode::function("test_second", 4).with_decorator(Decorator::pytest_mark(
            "test",
            vec![Argument::str("one"), Argument::str("two")],
        ));

        rule_m3xx(&first, RuleSlot(1), &conf, "test", "a.py", &mut tracker);
        let violations = rule_m3xx(&second, RuleSlot(1), &conf, "test", "b.py", &mut tracker);

        assert_eq!(violations.len(), 1);
        let message = &violations[0].message;
        let one_clause = message.find("The 'one' mark value").expect("clause for 'one'");
        let two_clause = message.find("The 'two' mark value").expect("clause for 'two'");
        assert!(one_clause < two_clause);
    }
}
