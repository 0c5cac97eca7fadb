//! Domain model.
//!
//! Strict ownership chain: `JavaLogEntry -> ExtractedLogFile -> ArchiveFile`.

pub mod entry;
pub mod files;

pub use entry::*;
pub use files::*;
