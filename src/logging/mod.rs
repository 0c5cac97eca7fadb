//! Structured logging with run context.
//!
//! Provides the logger initialisation and a context type that puts run_id,
//! archive and file into every log message for easy correlation across
//! concurrently running tasks.

pub mod structured;

pub use structured::*;

/// Initialize the process-wide logger.
///
/// Safe to call more than once; only the first call installs the backend.
pub fn init_logger(level: log::LevelFilter) {
    let _ = env_logger::builder()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init();
}
