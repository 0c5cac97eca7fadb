//! Pipeline orchestration module.
//!
//! Runs archive extraction, log conversion and storage as bounded concurrent
//! stages with first-failure-wins semantics.

pub mod context;
pub mod fanout;
pub mod ingestion;

pub use context::*;
pub use fanout::*;
pub use ingestion::*;
