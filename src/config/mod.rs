//! Configuration loading and management for Mark Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates raw host options
//! - Raw `key=value` option strings are converted to typed rule configurations
//! - Parsing happens exactly once; rules never probe raw strings afterwards
//! - Configuration acts as a repository of numbered rule slots for the engine

use regex::Regex;
use std::collections::BTreeMap;

/// Lowest configurable rule slot index
pub const MIN_SLOT: usize = 1;
/// Highest configurable rule slot index
pub const MAX_SLOT: usize = 49;

/// Option keys a rule slot recognizes; anything else is dropped silently
const RECOGNIZED_KEYS: [&str; 9] = [
    "name",
    "value_match",
    "value_regex",
    "allow_duplicate",
    "allow_multiple_args",
    "enforce_unique_value",
    "exclude_classes",
    "exclude_methods",
    "exclude_functions",
];

/// Identity of one of the 49 numbered configuration slots
///
/// Slots exist independent of configuration; a slot only carries a
/// [`RuleConfig`] once the host supplies recognized options for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleSlot(pub usize);

impl RuleSlot {
    /// The synthetic option name for this slot, e.g. `pytest_mark1`
    pub fn name(self) -> String {
        format!("pytest_mark{}", self.0)
    }

    /// Parse a slot from its option name; `None` for anything that is not
    /// a slot name in the supported range
    pub fn from_name(name: &str) -> Option<Self> {
        let index: usize = name.strip_prefix("pytest_mark")?.parse().ok()?;
        (MIN_SLOT..=MAX_SLOT).contains(&index).then_some(Self(index))
    }
}

/// Shape validators a rule can apply to mark values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMatch {
    /// Value must parse as a UUID
    Uuid,
}

/// Typed configuration for a single rule slot
///
/// Built once from raw option strings and immutable for the duration of a
/// run. Every slot owns its config independently; there is no shared
/// default value between slots.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    /// The mark identifier this rule checks for; without it the rule can
    /// never match a decorator and degrades to a no-op
    pub name: Option<String>,
    /// Value validator pattern, applied anchored at the start of the value.
    /// Takes precedence over `value_match` when both are configured.
    pub value_regex: Option<Regex>,
    /// Named value validator, only consulted when `value_regex` is absent
    pub value_match: Option<ValueMatch>,
    /// Permit the same mark to decorate one test more than once
    pub allow_duplicate: bool,
    /// Permit more than one positional argument per mark call
    pub allow_multiple_args: bool,
    /// Enforce run-wide uniqueness of mark values across all files
    pub enforce_unique_value: bool,
    /// Skip class definitions for this rule
    pub exclude_classes: bool,
    /// Skip method definitions for this rule
    pub exclude_methods: bool,
    /// Skip free function definitions for this rule
    pub exclude_functions: bool,
}

impl RuleConfig {
    /// Whether any value-shape validator is configured
    pub fn has_validator(&self) -> bool {
        self.value_regex.is_some() || self.value_match.is_some()
    }

    /// Apply one `key=value` entry. Returns true iff the key is recognized,
    /// regardless of whether its value survived typed parsing.
    fn apply_entry(&mut self, key: &str, value: &str) -> bool {
        if !RECOGNIZED_KEYS.contains(&key) {
            tracing::debug!("Dropping unrecognized option key '{}'", key);
            return false;
        }

        match key {
            "name" => self.name = Some(value.to_string()),
            "value_regex" => match Regex::new(value) {
                Ok(regex) => self.value_regex = Some(regex),
                Err(e) => {
                    tracing::warn!("Discarding unusable value_regex '{}': {}", value, e);
                }
            },
            "value_match" => {
                if value.eq_ignore_ascii_case("uuid") {
                    self.value_match = Some(ValueMatch::Uuid);
                } else {
                    tracing::warn!("Discarding unrecognized value_match '{}'", value);
                }
            }
            "allow_duplicate" => self.allow_duplicate = parse_flag(value),
            "allow_multiple_args" => self.allow_multiple_args = parse_flag(value),
            "enforce_unique_value" => self.enforce_unique_value = parse_flag(value),
            "exclude_classes" => self.exclude_classes = parse_flag(value),
            "exclude_methods" => self.exclude_methods = parse_flag(value),
            "exclude_functions" => self.exclude_functions = parse_flag(value),
            _ => unreachable!("key checked against RECOGNIZED_KEYS"),
        }
        true
    }
}

/// A boolean flag is true iff its raw value equals the literal `true`,
/// case-insensitively; anything else (including absence) is false.
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// The full set of configured rules, keyed by slot
///
/// Building a new `MarkConfig` fully replaces any prior configuration;
/// nothing is retained between builds.
#[derive(Debug, Clone, Default)]
pub struct MarkConfig {
    rules: BTreeMap<RuleSlot, RuleConfig>,
}

impl MarkConfig {
    /// Build a configuration from raw host options: per slot name, zero or
    /// more raw strings of comma- or newline-separated `key=value` pairs.
    ///
    /// Option names that are not slot names are ignored. Slots whose raw
    /// options contain zero recognized keys are pruned entirely.
    pub fn from_raw_options(options: &BTreeMap<String, Vec<String>>) -> Self {
        let mut rules = BTreeMap::new();

        for (option_name, raw_lines) in options {
            let Some(slot) = RuleSlot::from_name(option_name) else {
                tracing::debug!("Ignoring non-slot option '{}'", option_name);
                continue;
            };

            let mut config = RuleConfig::default();
            let mut recognized = 0usize;

            for raw_line in raw_lines {
                for entry in raw_line.split([',', '\n']) {
                    let entry = entry.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    let Some((key, value)) = entry.split_once('=') else {
                        tracing::debug!("Dropping malformed option entry '{}'", entry);
                        continue;
                    };
                    if config.apply_entry(key.trim(), value.trim()) {
                        recognized += 1;
                    }
                }
            }

            // A slot with nothing recognized is treated as absent
            if recognized > 0 {
                rules.insert(slot, config);
            }
        }

        Self { rules }
    }

    /// Active rules in ascending slot order
    pub fn active_rules(&self) -> impl Iterator<Item = (RuleSlot, &RuleConfig)> {
        self.rules.iter().map(|(slot, config)| (*slot, config))
    }

    /// Configuration for a specific slot, if active
    pub fn rule(&self, slot: RuleSlot) -> Option<&RuleConfig> {
        self.rules.get(&slot)
    }

    /// Number of active rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are active at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Configuration builder for programmatic construction
///
/// Accumulates raw option lines per slot, then parses them through the
/// same path the host-supplied options take.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    raw: BTreeMap<String, Vec<String>>,
}

impl ConfigBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw option line for the given slot index
    pub fn slot(mut self, index: usize, raw_line: impl Into<String>) -> Self {
        self.raw.entry(RuleSlot(index).name()).or_default().push(raw_line.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> MarkConfig {
        MarkConfig::from_raw_options(&self.raw)
    }
}
