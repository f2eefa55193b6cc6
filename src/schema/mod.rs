//! Schema Module
//!
//! Declarative per-operation parameter schemas and the interpreter that
//! validates raw input against them.

mod errors;
mod params;
mod rules;
mod validate;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use errors::{FieldErrors, ValidationErrors, ROOT_PATH};
pub use params::NormalizedParams;
pub use rules::{Field, FieldType, Refinement, Rule, Schema};
pub use validate::validate;
