//! Validation module.
//!
//! Multi-error invariant checking used by the domain model constructors.

pub mod invariants;

pub use invariants::*;
