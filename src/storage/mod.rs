//! Storage module.
//!
//! The `LogStore` interface the pipeline writes through, the stored document
//! shape, query helpers, and an in-process store.

pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

pub use memory::*;
pub use models::*;
pub use queries::*;
pub use store::*;
