//! Log Aggregator Core - extraction and conversion pipeline for archived logs
//!
//! This crate turns collected per-node log archives into structured,
//! queryable Java log records. The implementation prioritizes:
//!
//! 1. **Integrity** - Entities are validated at construction and report every
//!    violation at once
//! 2. **Logging** - Every stage and decision point logged with run context
//! 3. **Concurrency** - Archives and files are processed as bounded fan-out
//!    batches on one cooperative scheduler
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - Run orchestrator and bounded fan-out
//! - `extraction` - Path patterns and archive extraction
//! - `conversion` - Multi-line coalescing and record parsing
//! - `model` - Archive, extracted file and log record entities
//! - `validation` - Invariant violation accumulation
//! - `storage` - Store interface, document model and in-memory store
//! - `view` - Table rendering of query results
//! - `config` - Settings from defaults, file and environment
//! - `logging` - Structured logging with run context

pub mod config;
pub mod conversion;
pub mod extraction;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod storage;
pub mod validation;
pub mod view;

pub use config::Settings;
pub use pipeline::ingestion::{Pipeline, PipelineError, RunReport, RunStage};
pub use storage::memory::MemoryStore;
pub use storage::store::LogStore;
