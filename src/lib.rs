//! Mark Guardian - Mark enforcement for test definitions
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure rule evaluation separated from the host linter's concerns
//! - The host parses source files into [`syntax::SourceTree`]s and supplies
//!   raw configuration strings; this crate returns violations
//! - One [`MarkValidator`] owns all state for an evaluation run, including
//!   the cross-file collision table

pub mod config;
pub mod domain;
pub mod engine;
pub mod syntax;

// Re-export main types for convenient access
pub use domain::violations::{
    FileViolation, MarkError, MarkResult, ValidationReport, ValidationSummary, Violation,
    PLUGIN_NAME,
};

pub use config::{ConfigBuilder, MarkConfig, RuleConfig, RuleSlot, ValueMatch};

pub use engine::{CollisionTracker, MarkEngine, MarkOwner};

pub use syntax::{Argument, Decorator, DefKind, DefNode, SourceTree, TestKind};

/// Main validator providing high-level mark checking operations
///
/// Owns the engine and the run-wide collision state. Files checked through
/// one validator share a single uniqueness table; call [`reset`] (or build
/// a fresh validator) between independent runs.
///
/// [`reset`]: MarkValidator::reset
#[derive(Debug)]
pub struct MarkValidator {
    engine: MarkEngine,
    tracker: CollisionTracker,
}

impl MarkValidator {
    /// Create a validator for the given configuration
    pub fn new(config: MarkConfig) -> MarkResult<Self> {
        Ok(Self { engine: MarkEngine::new(config)?, tracker: CollisionTracker::new() })
    }

    /// Create a validator from raw host options
    pub fn from_raw_options(
        options: &std::collections::BTreeMap<String, Vec<String>>,
    ) -> MarkResult<Self> {
        Self::new(MarkConfig::from_raw_options(options))
    }

    /// The configuration this validator evaluates
    pub fn config(&self) -> &MarkConfig {
        self.engine.config()
    }

    /// Check a single parsed file, accumulating uniqueness state for the run
    pub fn check_file(&mut self, tree: &SourceTree, filename: &str) -> Vec<Violation> {
        self.engine.check_file(tree, filename, &mut self.tracker)
    }

    /// Check several parsed files in order and aggregate into a report
    ///
    /// Files are evaluated sequentially: the first file to declare a mark
    /// value owns it for the rest of the run.
    pub fn check_files<'a, I>(&mut self, files: I) -> ValidationReport
    where
        I: IntoIterator<Item = (&'a SourceTree, &'a str)>,
    {
        let mut report = ValidationReport::new();
        let mut files_checked = 0usize;

        for (tree, filename) in files {
            files_checked += 1;
            for violation in self.check_file(tree, filename) {
                report.add_violation(filename, violation);
            }
        }

        report.set_files_checked(files_checked);
        report.sort_violations();
        report
    }

    /// Forget all cross-file uniqueness state, making the next check an
    /// independent run
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// Convenience function to check a single file with the given configuration
pub fn check_file(
    config: MarkConfig,
    tree: &SourceTree,
    filename: &str,
) -> MarkResult<Vec<Violation>> {
    let mut validator = MarkValidator::new(config)?;
    Ok(validator.check_file(tree, filename))
}

/// Convenience function to check several files with the given configuration
pub fn check_files<'a, I>(config: MarkConfig, files: I) -> MarkResult<ValidationReport>
where
    I: IntoIterator<Item = (&'a SourceTree, &'a str)>,
{
    let mut validator = MarkValidator::new(config)?;
    Ok(validator.check_files(files))
}
