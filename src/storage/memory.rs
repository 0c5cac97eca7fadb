//! In-process document store.
//!
//! Records are kept as serialized JSON documents in a single `javalogs`
//! collection. Batches are all-or-nothing: a rejected batch writes nothing.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::models::{LogDocument, JAVA_LOG_COLLECTION};
use super::queries::{LogQuery, SortSpec};
use super::store::{InsertManyResult, LogStore, StoreError};
use crate::model::entry::JavaLogEntry;

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Value>,
    ids: HashSet<Uuid>,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(Collection),
    Closed,
}

/// Document store backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: RwLock<State>,
}

impl MemoryStore {
    /// Connect to `database` using `connection` and initialize the collection.
    pub fn init(database: &str, connection: &str) -> Result<Self, StoreError> {
        log::info!("STORE_INIT database={}", database);
        validate_connection(database, connection).map_err(|reason| {
            log::error!("STORE_INIT_FAILED database={} reason={}", database, reason);
            StoreError::Connectivity(reason)
        })?;

        let store = Self {
            database: database.to_string(),
            state: RwLock::new(State::Ready(Collection::default())),
        };
        log::info!(
            "STORE_READY database={} collection={}",
            database,
            JAVA_LOG_COLLECTION
        );
        Ok(store)
    }

    /// A store whose collection has not been initialized yet.
    pub fn uninitialized(database: &str) -> Self {
        Self {
            database: database.to_string(),
            state: RwLock::new(State::Uninitialized),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Drop the connection; later calls fail with `Connectivity`.
    pub fn close(&self) {
        *self.state.write() = State::Closed;
        log::info!("STORE_CLOSED database={}", self.database);
    }

    pub fn len(&self) -> usize {
        match &*self.state.read() {
            State::Ready(collection) => collection.documents.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_collection<T>(
        &self,
        f: impl FnOnce(&Collection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match &*self.state.read() {
            State::Ready(collection) => f(collection),
            State::Uninitialized => Err(not_initialized()),
            State::Closed => Err(closed()),
        }
    }
}

fn not_initialized() -> StoreError {
    StoreError::NotInitialized {
        collection: JAVA_LOG_COLLECTION.to_string(),
    }
}

fn closed() -> StoreError {
    StoreError::Connectivity("connection closed".to_string())
}

fn validate_connection(database: &str, connection: &str) -> Result<(), String> {
    if database.trim().is_empty() {
        return Err("database name is empty".to_string());
    }
    match connection.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err("connection string must look like scheme://host".to_string()),
    }
}

fn decode(document: &Value) -> Result<JavaLogEntry, StoreError> {
    let document: LogDocument = serde_json::from_value(document.clone())?;
    Ok(document.record)
}

#[async_trait]
impl LogStore for MemoryStore {
    fn check_ready(&self) -> Result<(), StoreError> {
        self.with_collection(|_| Ok(()))
    }

    async fn insert_many(&self, records: Vec<JavaLogEntry>) -> Result<InsertManyResult, StoreError> {
        if records.is_empty() {
            return Err(StoreError::InvalidBatch("empty batch".to_string()));
        }

        let mut batch_ids = HashSet::with_capacity(records.len());
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            if !batch_ids.insert(record.id()) {
                return Err(StoreError::InvalidBatch(format!(
                    "duplicate id {} in batch",
                    record.id()
                )));
            }
            documents.push(serde_json::to_value(LogDocument::from(record))?);
        }

        let mut state = self.state.write();
        let collection = match &mut *state {
            State::Ready(collection) => collection,
            State::Uninitialized => return Err(not_initialized()),
            State::Closed => return Err(closed()),
        };
        if let Some(existing) = batch_ids.iter().find(|id| collection.ids.contains(id)) {
            return Err(StoreError::InvalidBatch(format!(
                "duplicate key {}",
                existing
            )));
        }

        let inserted_ids: Vec<Uuid> = documents
            .iter()
            .filter_map(|d| d.get("_id").and_then(|v| v.as_str()))
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect();
        collection.ids.extend(batch_ids);
        collection.documents.extend(documents);

        log::debug!(
            "STORE_INSERTED database={} count={} total={}",
            self.database,
            inserted_ids.len(),
            collection.documents.len()
        );
        Ok(InsertManyResult { inserted_ids })
    }

    async fn get(&self, id: Uuid) -> Result<JavaLogEntry, StoreError> {
        self.with_collection(|collection| {
            if !collection.ids.contains(&id) {
                return Err(StoreError::NotFound(id));
            }
            let key = id.to_string();
            let document = collection
                .documents
                .iter()
                .find(|d| d.get("_id").and_then(|v| v.as_str()) == Some(key.as_str()))
                .ok_or(StoreError::NotFound(id))?;
            decode(document)
        })
    }

    async fn find(
        &self,
        query: &LogQuery,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<JavaLogEntry>, StoreError> {
        let mut records = self.with_collection(|collection| {
            let mut matched = Vec::new();
            for document in &collection.documents {
                let record = decode(document)?;
                if query.matches(&record) {
                    matched.push(record);
                }
            }
            Ok(matched)
        })?;

        if let Some(sort) = sort {
            records.sort_by(|a, b| sort.compare(a, b));
        }
        log::debug!(
            "STORE_FIND database={} query={:?} sort={:?} found={}",
            self.database,
            query,
            sort,
            records.len()
        );
        Ok(records)
    }
}
