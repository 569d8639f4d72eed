//! Domain layer for Mark Guardian
//!
//! CDD Principle: Domain Model - Pure business logic for mark enforcement
//! - Contains the violation entities and report aggregate
//! - Independent of the host linter, syntax trees, and configuration sources
//! - Expresses the ubiquitous language of mark checking and violation reporting

pub mod violations;

// Re-export main domain types for convenience
pub use violations::*;
