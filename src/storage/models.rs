//! Stored document shape for Java log records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::entry::JavaLogEntry;

/// Collection holding Java log documents.
pub const JAVA_LOG_COLLECTION: &str = "javalogs";

/// A record as persisted: keyed by `_id`, with a content hash alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// `sha256(node|timestamp|message)`; the same logical record always hashes the same.
    pub content_hash: String,
    #[serde(flatten)]
    pub record: JavaLogEntry,
}

impl From<JavaLogEntry> for LogDocument {
    fn from(record: JavaLogEntry) -> Self {
        Self {
            id: record.id(),
            content_hash: content_hash(&record),
            record,
        }
    }
}

/// Compute the content hash of a record.
pub fn content_hash(record: &JavaLogEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.node().as_bytes());
    hasher.update(b"|");
    hasher.update(record.timestamp().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(record.message().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{LogEntry, SourceFile};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn record(message: &str) -> JavaLogEntry {
        JavaLogEntry {
            entry: LogEntry {
                id: Uuid::new_v4(),
                source_file: SourceFile {
                    file_id: Uuid::new_v4(),
                    path: PathBuf::from("/out/node1/svc/svc.log"),
                    archive_id: Uuid::new_v4(),
                },
                node: "node1".to_string(),
                timestamp: NaiveDate::from_ymd_opt(2022, 7, 11)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                message: message.to_string(),
            },
            severity: Some("INFO".to_string()),
            jvm: None,
            module: None,
            log_type: None,
        }
    }

    #[test]
    fn test_content_hash_ignores_identity() {
        let a = record("started");
        let b = record("started");
        assert_ne!(a.id(), b.id());
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn test_content_hash_differs_by_message() {
        assert_ne!(content_hash(&record("a")), content_hash(&record("b")));
    }

    #[test]
    fn test_document_shape() {
        let record = record("started");
        let id = record.id();
        let value = serde_json::to_value(LogDocument::from(record.clone())).unwrap();
        assert_eq!(value["_id"], id.to_string());
        assert_eq!(value["message"], "started");

        let back: LogDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back.record, record);
    }
}
