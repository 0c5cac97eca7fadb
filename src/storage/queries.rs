//! Query and sort specifications for stored log records.
//!
//! Sort specs use the `"-field"` / `"+field"` string form of document stores;
//! `datetime` is accepted as an alias for `timestamp`.

use std::cmp::Ordering;

use crate::model::entry::JavaLogEntry;

/// Fields covered by the collection's text index.
pub const TEXT_INDEX_FIELDS: &[&str] = &["node", "message", "severity", "module", "type"];

/// Record filter. An empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub node: Option<String>,
    pub severity: Option<String>,
    pub log_type: Option<String>,
    pub text: Option<String>,
}

impl LogQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: &str) -> Self {
        self.node = Some(node.to_string());
        self
    }

    pub fn severity(mut self, severity: &str) -> Self {
        self.severity = Some(severity.to_string());
        self
    }

    /// Case-insensitive substring search over `TEXT_INDEX_FIELDS`.
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_lowercase());
        self
    }

    pub fn matches(&self, record: &JavaLogEntry) -> bool {
        if let Some(node) = &self.node {
            if record.node() != node {
                return false;
            }
        }
        if self.severity.is_some() && record.severity != self.severity {
            return false;
        }
        if self.log_type.is_some() && record.log_type != self.log_type {
            return false;
        }
        match &self.text {
            Some(text) => text_fields(record).any(|field| field.to_lowercase().contains(text)),
            None => true,
        }
    }
}

fn text_fields(record: &JavaLogEntry) -> impl Iterator<Item = &str> {
    [
        Some(record.node()),
        Some(record.message()),
        record.severity.as_deref(),
        record.module.as_deref(),
        record.log_type.as_deref(),
    ]
    .into_iter()
    .flatten()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Timestamp,
    Node,
    Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn timestamp_descending() -> Self {
        Self {
            field: SortField::Timestamp,
            direction: SortDirection::Descending,
        }
    }

    /// Parse `"-timestamp"`, `"+node"`, `"severity"` and the like.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (direction, name) = match spec.strip_prefix('-') {
            Some(rest) => (SortDirection::Descending, rest),
            None => (
                SortDirection::Ascending,
                spec.strip_prefix('+').unwrap_or(spec),
            ),
        };
        let field = match name {
            "timestamp" | "datetime" => SortField::Timestamp,
            "node" => SortField::Node,
            "severity" => SortField::Severity,
            _ => return None,
        };
        Some(Self { field, direction })
    }

    pub fn compare(&self, a: &JavaLogEntry, b: &JavaLogEntry) -> Ordering {
        let ordering = match self.field {
            SortField::Timestamp => a.timestamp().cmp(&b.timestamp()),
            SortField::Node => a.node().cmp(b.node()),
            SortField::Severity => a.severity.cmp(&b.severity),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}
