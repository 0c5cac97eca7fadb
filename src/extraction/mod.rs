//! Extraction module.
//!
//! Structural metadata from paths and selective archive extraction.

pub mod archive;
pub mod patterns;

pub use archive::*;
pub use patterns::*;
