//! Conversion of extracted log files into typed records.
//!
//! Coalescing folds multi-line records into logical lines; record parsing
//! splits those lines into columns and builds `JavaLogEntry` values.

pub mod coalesce;
pub mod record;

pub use coalesce::*;
pub use record::*;
