//! Run-wide tracking of mark values for uniqueness enforcement
//!
//! Architecture: Explicit Session State - The collision table is owned by the
//! run, never a hidden process-wide global
//! - First recorder of a (rule, value) pair wins and is never displaced
//! - Later recorders are told who owns the value so they can report it
//! - Resettable between independent runs for deterministic evaluation

use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// The test definition that first claimed a mark value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOwner {
    /// Name of the owning test definition
    pub test_name: String,
    /// Line of the owning test definition
    pub line: usize,
    /// File the owning test definition lives in
    pub file: String,
}

/// Tracks which mark values have been seen per rule across a whole run
///
/// Each (rule name, value) key is either unseen or recorded. The first
/// encounter records silently; every later encounter reports against the
/// original recorder, which never changes.
#[derive(Debug, Clone, Default)]
pub struct CollisionTracker {
    seen: HashMap<String, HashMap<String, MarkOwner>>,
}

impl CollisionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `rule_name`, or report the existing owner
    ///
    /// Returns `None` when this is the first encounter (the value is now
    /// recorded under `owner`), or `Some(original)` when the value was
    /// already claimed.
    pub fn record_or_report(
        &mut self,
        rule_name: &str,
        value: &str,
        owner: MarkOwner,
    ) -> Option<&MarkOwner> {
        match self.seen.entry(rule_name.to_string()).or_default().entry(value.to_string()) {
            Entry::Occupied(existing) => Some(existing.into_mut()),
            Entry::Vacant(vacant) => {
                vacant.insert(owner);
                None
            }
        }
    }

    /// Forget everything; required between independent runs
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Number of distinct values recorded for a rule
    #[cfg(test)]
    fn recorded_values(&self, rule_name: &str) -> usize {
        self.seen.get(rule_name).map_or(0, HashMap::len)
    }
}
