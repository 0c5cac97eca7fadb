//! Structured logging utilities.
//!
//! Provides context-aware logging with run_id, archive and file included
//! in every log message.

use std::fmt;

/// Logging context for one pipeline run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub archive: Option<String>,
    pub file: Option<String>,
}

impl LogContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            archive: None,
            file: None,
        }
    }

    pub fn with_archive(&self, archive: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            archive: Some(archive.to_string()),
            file: None,
        }
    }

    pub fn with_file(&self, file: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            archive: self.archive.clone(),
            file: Some(file.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[run={}]", self.run_id)?;
        if let Some(archive) = &self.archive {
            write!(f, " [archive={}]", archive)?;
        }
        if let Some(file) = &self.file {
            write!(f, " [file={}]", file)?;
        }
        Ok(())
    }
}
