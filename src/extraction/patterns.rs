//! Node and log category extraction from file paths.
//!
//! Two structural grammars are recognised:
//! - archive names: `.../<prefix>Logs_<node>[.<domain>]_<category>_<epoch-ms>.zip`
//! - extracted files: `.../<node>[.<domain>]/<category>/<file>.log[<n>]`
//!
//! A path that matches neither grammar yields an empty string and a warning;
//! callers decide whether that is fatal.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Node of an archive name; stops at the first `.` or `_`.
    static ref ARCHIVE_NODE_PATTERN: Regex =
        Regex::new(r"Logs_([^._/\\]+)[^_/\\]*_[^_/\\]+_\d{13}\.zip$").unwrap();

    /// Log category of an archive name.
    static ref ARCHIVE_CATEGORY_PATTERN: Regex =
        Regex::new(r"Logs_[^_/\\]+_([^_/\\]+)_\d{13}\.zip$").unwrap();

    /// Node directory of an extracted file (third segment from the end).
    static ref EXTRACTED_NODE_PATTERN: Regex =
        Regex::new(r"(?:^|[/\\])([^./\\]+)[^/\\]*[/\\][^/\\]+[/\\][^/\\]+\.log\d*$").unwrap();

    /// Category directory of an extracted file (second segment from the end).
    static ref EXTRACTED_CATEGORY_PATTERN: Regex =
        Regex::new(r"(?:^|[/\\])[^/\\]+[/\\]([^/\\]+)[/\\][^/\\]+\.log\d*$").unwrap();
}

/// Which path grammar to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Archive,
    Extracted,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Archive => "archive",
            PatternKind::Extracted => "extracted",
        }
    }
}

/// Extract the node name from `path`, or an empty string when it does not match.
pub fn extract_node(path: &Path, kind: PatternKind) -> String {
    let pattern: &Regex = match kind {
        PatternKind::Archive => &ARCHIVE_NODE_PATTERN,
        PatternKind::Extracted => &EXTRACTED_NODE_PATTERN,
    };
    capture(pattern, path, kind, "node")
}

/// Extract the log category from `path`, or an empty string when it does not match.
pub fn extract_log_category(path: &Path, kind: PatternKind) -> String {
    let pattern: &Regex = match kind {
        PatternKind::Archive => &ARCHIVE_CATEGORY_PATTERN,
        PatternKind::Extracted => &EXTRACTED_CATEGORY_PATTERN,
    };
    capture(pattern, path, kind, "log_category")
}

fn capture(pattern: &Regex, path: &Path, kind: PatternKind, field: &str) -> String {
    let text = path.to_string_lossy();
    match pattern.captures(&text).and_then(|c| c.get(1)) {
        Some(m) => {
            log::debug!(
                "PATTERN_MATCHED field={} kind={} value={} path={}",
                field,
                kind.as_str(),
                m.as_str(),
                text
            );
            m.as_str().to_string()
        }
        None => {
            log::warn!(
                "PATTERN_NO_MATCH field={} kind={} path={}",
                field,
                kind.as_str(),
                text
            );
            String::new()
        }
    }
}
