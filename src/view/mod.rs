//! Human-readable rendering of stored records.

pub mod table;

pub use table::*;
