//! Rule evaluation engine for mark enforcement
//!
//! Architecture: Domain Services - The engine orchestrates rule evaluation
//! - Walks every definition the host's tree exposes, exactly once
//! - Filters to test candidates, then gates each (node, rule) pair through
//!   the rule's exclusion flags independently
//! - Collects violations from each rule family; no family can abort another

pub mod collision;
mod rules;

use crate::config::MarkConfig;
use crate::domain::violations::{MarkError, MarkResult, Violation, PLUGIN_NAME};
use crate::syntax::{DefNode, SourceTree, TestKind};
use regex::Regex;

pub use collision::{CollisionTracker, MarkOwner};

/// Combined test-naming convention: functions and methods start with
/// `test_`, classes start with `Test`; one pattern covers both, matched
/// anchored at the start of the name.
const TEST_DEF_PATTERN: &str = r"^(test_)|(Test)";

/// Evaluates configured mark rules against parsed source trees
///
/// The engine itself is immutable per run; the one piece of run-wide
/// mutable state, the [`CollisionTracker`], is passed in per file so the
/// caller owns its lifecycle.
#[derive(Debug)]
pub struct MarkEngine {
    config: MarkConfig,
    test_def_regex: Regex,
}

impl MarkEngine {
    /// Create an engine for the given configuration
    pub fn new(config: MarkConfig) -> MarkResult<Self> {
        let test_def_regex = Regex::new(TEST_DEF_PATTERN).map_err(|e| {
            MarkError::pattern(format!("Failed to compile test definition pattern: {e}"))
        })?;
        Ok(Self { config, test_def_regex })
    }

    /// The configuration this engine evaluates
    pub fn config(&self) -> &MarkConfig {
        &self.config
    }

    /// Whether a definition qualifies for rule evaluation at all: its name
    /// must match the test-naming convention
    pub fn is_test_candidate(&self, node: &DefNode) -> bool {
        rules::matches_at_start(&self.test_def_regex, &node.name)
    }

    /// Whether a rule's exclusion flags let it see this node
    fn should_process(node: &DefNode, conf: &crate::config::RuleConfig) -> bool {
        match node.classify() {
            TestKind::Class => !conf.exclude_classes,
            TestKind::Function => !conf.exclude_functions,
            TestKind::Method => !conf.exclude_methods,
        }
    }

    /// Evaluate every configured rule against every test definition in one
    /// file, recording mark values into `tracker` as they are seen
    ///
    /// With no rules configured at all this reports a single run-level
    /// M401 violation at (0, 0) and nothing else.
    pub fn check_file(
        &self,
        tree: &SourceTree,
        filename: &str,
        tracker: &mut CollisionTracker,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.config.is_empty() {
            violations.push(Violation::run_level(format!(
                "M401 no configuration found for {PLUGIN_NAME}, \
                 please provide configured marks in a linter config"
            )));
        }

        for node in tree.walk() {
            if !self.is_test_candidate(node) {
                continue;
            }

            for (slot, conf) in self.config.active_rules() {
                // A rule without a name can never match a decorator
                let Some(mark) = conf.name.as_deref() else {
                    tracing::debug!("Skipping unnamed rule '{}'", slot.name());
                    continue;
                };

                if !Self::should_process(node, conf) {
                    continue;
                }

                violations.extend(rules::rule_m3xx(node, slot, conf, mark, filename, tracker));
                violations.extend(rules::rule_m5xx(node, slot, conf, mark));
                violations.extend(rules::rule_m6xx(node, slot, conf, mark));
                violations.extend(rules::rule_m7xx(node, slot, conf, mark));
                violations.extend(rules::rule_m8xx(node, slot, conf, mark));
                violations.extend(rules::rule_m9xx(node, slot, conf, mark));
            }
        }

        violations
    }
}
