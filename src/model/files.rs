//! Archive and extracted log file entities.
//!
//! Both are validated once at construction; an instance that exists is valid.
//! An `ExtractedLogFile` embeds a copy of the `ArchiveFile` it came from, so
//! the two can never drift apart after construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::extraction::patterns::{extract_log_category, extract_node, PatternKind};
use crate::validation::invariants::{join_violations, Violation, Violations};

pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const LOG_EXTENSION_PREFIX: &str = ".log";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid {entity} {id}: {}", join_violations(.violations))]
    Invalid {
        entity: &'static str,
        id: Uuid,
        violations: Vec<Violation>,
    },
}

impl ModelError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            ModelError::Invalid { violations, .. } => violations,
        }
    }
}

/// One collected archive bundle for a node/category/collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFile {
    id: Uuid,
    path: PathBuf,
    name: String,
    extension: String,
    node: String,
    log_category: String,
}

impl ArchiveFile {
    /// Build from an archive path, deriving node and category from its name.
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let node = extract_node(path, PatternKind::Archive);
        let log_category = extract_log_category(path, PatternKind::Archive);
        Self::new(path, node, log_category)
    }

    pub fn new(
        path: &Path,
        node: impl Into<String>,
        log_category: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let archive = ArchiveFile {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            name: file_name(path),
            extension: file_extension(path),
            node: node.into(),
            log_category: log_category.into(),
        };
        match archive.validate() {
            Ok(()) => Ok(archive),
            Err(violations) => Err(ModelError::Invalid {
                entity: "ArchiveFile",
                id: archive.id,
                violations,
            }),
        }
    }

    fn validate(&self) -> Result<(), Vec<Violation>> {
        let mut violations = Violations::new();
        violations.check(self.extension == ARCHIVE_EXTENSION, || {
            Violation::Extension {
                expected: ARCHIVE_EXTENSION.to_string(),
                found: self.extension.clone(),
            }
        });
        violations.require_non_empty("node", &self.node);
        violations.require_non_empty("log_category", &self.log_category);
        violations.finish(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn log_category(&self) -> &str {
        &self.log_category
    }
}

/// One log file pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLogFile {
    id: Uuid,
    path: PathBuf,
    name: String,
    extension: String,
    node: String,
    log_category: String,
    source_archive: ArchiveFile,
}

impl ExtractedLogFile {
    /// Build from an extracted path laid out as `.../<node>/<category>/<file>`.
    pub fn from_path(path: &Path, source_archive: &ArchiveFile) -> Result<Self, ModelError> {
        let node = extract_node(path, PatternKind::Extracted);
        let log_category = extract_log_category(path, PatternKind::Extracted);
        Self::new(path, node, log_category, source_archive)
    }

    pub fn new(
        path: &Path,
        node: impl Into<String>,
        log_category: impl Into<String>,
        source_archive: &ArchiveFile,
    ) -> Result<Self, ModelError> {
        let file = ExtractedLogFile {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            name: file_name(path),
            extension: file_extension(path),
            node: node.into(),
            log_category: log_category.into(),
            source_archive: source_archive.clone(),
        };
        match file.validate() {
            Ok(()) => Ok(file),
            Err(violations) => Err(ModelError::Invalid {
                entity: "ExtractedLogFile",
                id: file.id,
                violations,
            }),
        }
    }

    /// Check own invariants and agreement with the source archive.
    fn validate(&self) -> Result<(), Vec<Violation>> {
        let archive = &self.source_archive;
        let mut violations = Violations::new();

        violations.check(self.extension.starts_with(LOG_EXTENSION_PREFIX), || {
            Violation::Extension {
                expected: format!("{}*", LOG_EXTENSION_PREFIX),
                found: self.extension.clone(),
            }
        });
        violations.require_non_empty("node", &self.node);
        violations.require_non_empty("log_category", &self.log_category);
        violations.check(self.node == archive.node, || Violation::Mismatch {
            field: "node",
            entity_id: self.id,
            entity_value: self.node.clone(),
            source_id: archive.id,
            source_value: archive.node.clone(),
        });
        violations.check(self.log_category == archive.log_category, || {
            Violation::Mismatch {
                field: "log_category",
                entity_id: self.id,
                entity_value: self.log_category.clone(),
                source_id: archive.id,
                source_value: archive.log_category.clone(),
            }
        });

        violations.finish(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn log_category(&self) -> &str {
        &self.log_category
    }

    pub fn source_archive(&self) -> &ArchiveFile {
        &self.source_archive
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
