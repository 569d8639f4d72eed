//! Core domain models for mark violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - Violations carry their final rendered message and know their own code
//! - ValidationReport acts as an aggregate root managing collections of violations
//! - The domain stays pure: no syntax-tree or configuration types leak in here

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity reported alongside every violation, the way a linting host
/// attributes findings back to the plugin that produced them.
pub const PLUGIN_NAME: &str = "mark-guardian";

/// A mark violation detected during rule evaluation
///
/// The host consumes these as `(line, column, message, source)` tuples.
/// Column is always 0: mark rules never track sub-line positions. The
/// message carries the full violation code prefix (e.g. `M501 ...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Line number (1-indexed) of the offending test definition, 0 for
    /// run-level violations
    pub line: usize,
    /// Column number, always 0 for mark rules
    pub column: usize,
    /// Human-readable description, prefixed with the violation code
    pub message: String,
    /// Identity of the reporter that produced this violation
    pub source: String,
}

impl Violation {
    /// Create a violation at the given line, column 0
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, column: 0, message: message.into(), source: PLUGIN_NAME.to_string() }
    }

    /// Create a run-level violation at position (0, 0)
    pub fn run_level(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// The violation code embedded in the message (e.g. "M501"), if present
    pub fn code(&self) -> Option<&str> {
        self.message
            .split_whitespace()
            .next()
            .filter(|tok| tok.len() == 4 && tok.starts_with('M'))
            .filter(|tok| tok[1..].bytes().all(|b| b.is_ascii_digit()))
    }

    /// Format violation for display as the host would render it
    pub fn format_display(&self) -> String {
        format!("{}:{}: {}", self.line, self.column, self.message)
    }
}

/// A violation attributed to the file it was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileViolation {
    /// Path of the file the violation was found in
    pub file: String,
    /// The violation itself
    #[serde(flatten)]
    pub violation: Violation,
}

impl FileViolation {
    /// Format as `file:line:column: message`
    pub fn format_display(&self) -> String {
        format!("{}:{}", self.file, self.violation.format_display())
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Total number of files checked
    pub total_files: usize,
    /// Total number of violations found
    pub total_violations: usize,
    /// Timestamp when validation was performed
    pub checked_at: DateTime<Utc>,
}

/// Complete validation report containing all violations found in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations found, attributed to their files
    pub violations: Vec<FileViolation>,
    /// Summary statistics
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            summary: ValidationSummary { checked_at: Utc::now(), ..Default::default() },
        }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, file: impl Into<String>, violation: Violation) {
        self.summary.total_violations += 1;
        self.violations.push(FileViolation { file: file.into(), violation });
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Set the number of files checked
    pub fn set_files_checked(&mut self, count: usize) {
        self.summary.total_files = count;
    }

    /// Get violations found in a specific file
    pub fn violations_in_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.file == file).map(|v| &v.violation)
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for FileViolation { file, violation } in other.violations {
            self.add_violation(file, violation);
        }
        self.summary.total_files += other.summary.total_files;
    }

    /// Sort violations by file, line, and message for consistent output
    pub fn sort_violations(&mut self) {
        self.violations.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.violation.line.cmp(&b.violation.line))
                .then_with(|| a.violation.message.cmp(&b.violation.message))
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur while configuring or building the engine
#[derive(Debug, thiserror::Error)]
pub enum MarkError {
    /// Configuration could not be interpreted
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },
}

impl MarkError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }
}

/// Result type for Mark Guardian operations
pub type MarkResult<T> = Result<T, MarkError>;
