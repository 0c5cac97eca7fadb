//! Parsed log records.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::files::ExtractedLogFile;
use crate::validation::invariants::{Violation, Violations};

/// Reference from a record back to the file it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_id: Uuid,
    pub path: PathBuf,
    pub archive_id: Uuid,
}

impl From<&ExtractedLogFile> for SourceFile {
    fn from(file: &ExtractedLogFile) -> Self {
        Self {
            file_id: file.id(),
            path: file.path().to_path_buf(),
            archive_id: file.source_archive().id(),
        }
    }
}

/// One logical log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub source_file: SourceFile,
    pub node: String,
    pub timestamp: NaiveDateTime,
    pub message: String,
}

/// A Java service log record: a `LogEntry` plus the columns Java services emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaLogEntry {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub severity: Option<String>,
    pub jvm: Option<String>,
    pub module: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<String>,
}

impl JavaLogEntry {
    pub fn id(&self) -> Uuid {
        self.entry.id
    }

    pub fn node(&self) -> &str {
        &self.entry.node
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.entry.timestamp
    }

    pub fn message(&self) -> &str {
        &self.entry.message
    }
}

/// Unvalidated fields of a `JavaLogEntry`.
///
/// `validate` is the only way to turn a draft into a record, and it reports
/// every missing field at once.
#[derive(Debug, Clone, Default)]
pub struct JavaLogEntryDraft {
    pub source_file: Option<SourceFile>,
    pub node: String,
    pub timestamp: Option<NaiveDateTime>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub jvm: Option<String>,
    pub module: Option<String>,
    pub log_type: Option<String>,
}

impl JavaLogEntryDraft {
    pub fn for_file(file: &ExtractedLogFile) -> Self {
        Self {
            source_file: Some(SourceFile::from(file)),
            node: file.node().to_string(),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<JavaLogEntry, Vec<Violation>> {
        let mut violations = Violations::new();
        violations.check(self.source_file.is_some(), || Violation::MissingField {
            field: "source_file",
        });
        violations.require_non_empty("node", &self.node);
        violations.check(self.timestamp.is_some(), || Violation::MissingField {
            field: "timestamp",
        });
        violations.check(self.message.is_some(), || Violation::MissingField {
            field: "message",
        });

        match (self.source_file, self.timestamp, self.message) {
            (Some(source_file), Some(timestamp), Some(message)) if violations.is_empty() => {
                Ok(JavaLogEntry {
                    entry: LogEntry {
                        id: Uuid::new_v4(),
                        source_file,
                        node: self.node,
                        timestamp,
                        message,
                    },
                    severity: self.severity,
                    jvm: self.jvm,
                    module: self.module,
                    log_type: self.log_type,
                })
            }
            _ => Err(violations.into_vec()),
        }
    }
}
