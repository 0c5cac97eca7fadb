//! Storage collaborator interface.
//!
//! The pipeline treats storage as a document sink keyed by an opaque id. Batch
//! atomicity is whatever the backend provides; nothing here retries.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::queries::{LogQuery, SortSpec};
use crate::model::entry::JavaLogEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection `{collection}` was not initialized")]
    NotInitialized { collection: String },
    #[error("store unreachable: {0}")]
    Connectivity(String),
    #[error("invalid batch: {0}")]
    InvalidBatch(String),
    #[error("record {0} not found")]
    NotFound(Uuid),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for the conditions that make every further write in a file pointless.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::NotInitialized { .. } | StoreError::Connectivity(_)
        )
    }
}

/// Result of a successful bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Uuid>,
}

impl InsertManyResult {
    pub fn len(&self) -> usize {
        self.inserted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_ids.is_empty()
    }
}

/// Document store holding parsed Java log records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Fails while the backing collection cannot accept records.
    fn check_ready(&self) -> Result<(), StoreError>;

    async fn insert_many(&self, records: Vec<JavaLogEntry>) -> Result<InsertManyResult, StoreError>;

    async fn get(&self, id: Uuid) -> Result<JavaLogEntry, StoreError>;

    async fn find(
        &self,
        query: &LogQuery,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<JavaLogEntry>, StoreError>;
}
