//! Parsing of coalesced log lines into typed Java log records.
//!
//! A file is normalized first: its contents are coalesced and written back in
//! place with one logical line per physical line. The normalized file is then
//! read as pipe-delimited records with the fixed column order
//! `severity | jvm | datetime | source | type | message`.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::coalesce::coalesce;
use crate::logging::structured::LogContext;
use crate::model::entry::{JavaLogEntry, JavaLogEntryDraft};
use crate::model::files::ExtractedLogFile;
use crate::storage::store::{LogStore, StoreError};
use crate::validation::invariants::{join_violations, Violation};

/// Column delimiter of normalized log lines.
pub const FIELD_DELIMITER: char = '|';
/// Number of columns in a normalized log line.
pub const FIELD_COUNT: usize = 6;
/// Format of the `datetime` column.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Errors that abort the whole file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store unavailable while building records: {0}")]
    StoreUnavailable(#[source] StoreError),
}

/// Errors that skip a single record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("bad timestamp `{value}`: {source}")]
    BadTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid record: {}", join_violations(.0))]
    MissingField(Vec<Violation>),
}

/// The six columns of one logical line, trimmed.
///
/// `None` means the column is absent from the line; a present but blank column
/// is `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub severity: Option<String>,
    pub jvm: Option<String>,
    pub datetime: Option<String>,
    pub source: Option<String>,
    pub log_type: Option<String>,
    pub message: Option<String>,
}

impl RawRecord {
    /// Split a logical line into columns. The message keeps any further pipes.
    pub fn split(line: &str) -> Self {
        let mut fields = line
            .splitn(FIELD_COUNT, FIELD_DELIMITER)
            .map(|field| field.trim().to_string());
        Self {
            severity: fields.next(),
            jvm: fields.next(),
            datetime: fields.next(),
            source: fields.next(),
            log_type: fields.next(),
            message: fields.next(),
        }
    }

    /// Recover lines written with fewer populated columns: when message and
    /// type are both blank, the source column holds the message.
    pub fn repair_schema(mut self) -> Self {
        if is_blank(&self.message) && is_blank(&self.log_type) && !is_blank(&self.source) {
            self.message = self.source.take();
        }
        self
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, str::is_empty)
}

/// Parse the `datetime` column.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, RecordError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|source| {
        RecordError::BadTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

/// Build one record from a logical line of `file`.
pub fn build_record(file: &ExtractedLogFile, line: &str) -> Result<JavaLogEntry, RecordError> {
    let raw = RawRecord::split(line).repair_schema();
    let timestamp = raw.datetime.as_deref().map(parse_timestamp).transpose()?;

    JavaLogEntryDraft {
        timestamp,
        message: raw.message,
        severity: raw.severity,
        jvm: raw.jvm,
        module: raw.source,
        log_type: raw.log_type,
        ..JavaLogEntryDraft::for_file(file)
    }
    .validate()
    .map_err(RecordError::MissingField)
}

/// Normalize `file` in place and parse it into records.
///
/// Bad records are logged and skipped. A store that stops accepting records
/// aborts the file.
pub async fn parse(
    file: &ExtractedLogFile,
    store: &dyn LogStore,
    ctx: &LogContext,
) -> Result<Vec<JavaLogEntry>, ParseError> {
    let path = file.path();
    let io_error = |source: io::Error| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };

    let raw = tokio::fs::read_to_string(path).await.map_err(io_error)?;
    let mut normalized = String::with_capacity(raw.len());
    for line in coalesce(&raw) {
        normalized.push_str(&line);
        normalized.push('\n');
    }
    tokio::fs::write(path, &normalized).await.map_err(io_error)?;
    log::debug!("{} NORMALIZED bytes_in={} bytes_out={}", ctx, raw.len(), normalized.len());

    let normalized = tokio::fs::read_to_string(path).await.map_err(io_error)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (index, line) in normalized.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        store.check_ready().map_err(|err| {
            log::error!("{} PARSE_ABORTED line={} error={}", ctx, index + 1, err);
            ParseError::StoreUnavailable(err)
        })?;

        match build_record(file, line) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                log::warn!("{} RECORD_SKIPPED line={} error={}", ctx, index + 1, err);
            }
        }
        tokio::task::yield_now().await;
    }

    log::info!(
        "{} PARSE_COMPLETE records={} skipped={}",
        ctx,
        records.len(),
        skipped
    );
    Ok(records)
}
