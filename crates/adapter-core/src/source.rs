//! Where raw descriptor records come from.
//!
//! A [`RecordSource`] hands out [`RawRecord`]s; parsing them is the
//! catalog's job. Malformed documents therefore surface as per-record schema
//! errors during the load rather than as source failures, and so do card
//! files that cannot be read or are not UTF-8.

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CatalogConfig;
use crate::descriptor::{parse_descriptor, parse_descriptor_str, Descriptor};
use crate::error::{CatalogError, Result, SchemaError};

/// Body of a raw record: already-structured, still text, or a document the
/// source could not decode (with the reason).
#[derive(Debug, Clone)]
pub enum RecordBody {
    Value(Value),
    Text(String),
    Unreadable(String),
}

/// One unparsed descriptor record plus an identifier for error reports.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub body: RecordBody,
}

impl RawRecord {
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            body: RecordBody::Value(value),
        }
    }

    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: RecordBody::Text(text.into()),
        }
    }

    pub fn unreadable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: RecordBody::Unreadable(reason.into()),
        }
    }

    /// Parse the record into a descriptor.
    pub fn parse(&self) -> std::result::Result<Descriptor, SchemaError> {
        match &self.body {
            RecordBody::Value(value) => parse_descriptor(value),
            RecordBody::Text(text) => parse_descriptor_str(text),
            RecordBody::Unreadable(reason) => {
                Err(SchemaError::new(CatalogConfig::DOCUMENT_FIELD, reason.clone()))
            }
        }
    }
}

/// Supplier of raw records for a catalog load or refresh.
pub trait RecordSource: Send + Sync {
    /// Fetch every record the source currently holds.
    fn records(&self) -> Result<Vec<RawRecord>>;
}

impl RecordSource for Vec<RawRecord> {
    fn records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}

/// Reads `*.yaml` / `*.yml` cards from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` looks like a descriptor card.
    pub fn is_descriptor_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| CatalogConfig::DESCRIPTOR_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

impl RecordSource for DirectorySource {
    fn records(&self) -> Result<Vec<RawRecord>> {
        if !self.root.is_dir() {
            return Err(CatalogError::Io {
                message: "Descriptor directory does not exist".to_string(),
                path: Some(self.root.clone()),
                source: None,
            });
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf);
                CatalogError::Io {
                    message: e.to_string(),
                    path,
                    source: e.into_io_error(),
                }
            })?;

            if !entry.file_type().is_file() || !Self::is_descriptor_file(entry.path()) {
                continue;
            }

            let id = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            records.push(read_card(id, entry.path()));
        }

        debug!(
            "Read {} descriptor cards from {}",
            records.len(),
            self.root.display()
        );
        Ok(records)
    }
}

/// Read one card. Failures stay attached to the card's own record.
fn read_card(id: String, path: &Path) -> RawRecord {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read descriptor card {}: {}", path.display(), e);
            return RawRecord::unreadable(id, format!("unreadable file: {}", e));
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => RawRecord::from_text(id, text),
        Err(e) => RawRecord::unreadable(id, format!("not valid UTF-8: {}", e.utf8_error())),
    }
}
