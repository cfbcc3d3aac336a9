//! Error types for the adapter catalog.
//!
//! Schema errors are per-record and never abort a batch load. Resolution
//! errors go back to whoever asked the catalog a question. [`CatalogError`]
//! wraps both plus the failures that come from outside the catalog (the
//! filesystem and its watcher).

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A descriptor record violated the schema.
///
/// `field` is a path into the record (`files[1].sha256`, `config.using`)
/// and `rule` describes what was expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Invalid field {field}: {rule}")]
pub struct SchemaError {
    pub field: String,
    pub rule: String,
}

impl SchemaError {
    pub fn new(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
        }
    }

    /// A required field is absent (or null).
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "field is required")
    }

    /// A field holds the wrong kind of value.
    pub fn wrong_type(field: impl Into<String>, expected: &str) -> Self {
        Self::new(field, format!("expected {}", expected))
    }
}

/// A schema error tagged with the record it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{record_id}: {error}")]
pub struct RecordError {
    pub record_id: String,
    pub error: SchemaError,
}

impl RecordError {
    pub fn new(record_id: impl Into<String>, error: SchemaError) -> Self {
        Self {
            record_id: record_id.into(),
            error,
        }
    }
}

/// Failure to turn a query into a concrete file entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No adapter found for {query}")]
    NotFound { query: String },

    #[error("Query {query} matches {} adapters: {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Adapter {descriptor} has no version {version:?} (available: {})", .available.join(", "))]
    UnknownVersion {
        descriptor: String,
        version: String,
        available: Vec<String>,
    },
}

/// Main error type for the adapter catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File watcher error: {message}")]
    Watcher { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<notify::Error> for CatalogError {
    fn from(err: notify::Error) -> Self {
        CatalogError::Watcher {
            message: err.to_string(),
        }
    }
}

impl CatalogError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CatalogError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Map to a process exit code (sysexits.h conventions).
    ///
    /// - 65 (`EX_DATAERR`): malformed descriptor data
    /// - 66 (`EX_NOINPUT`): nothing matched the query
    /// - 74 (`EX_IOERR`): filesystem failure
    /// - 1: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            CatalogError::Schema(_) => 65,
            CatalogError::Resolution(_) => 66,
            CatalogError::Io { .. } | CatalogError::Watcher { .. } => 74,
            CatalogError::Other(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::missing("files");
        assert_eq!(err.to_string(), "Invalid field files: field is required");
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError::new("cards/sst.yaml", SchemaError::wrong_type("task", "a string"));
        assert_eq!(
            err.to_string(),
            "cards/sst.yaml: Invalid field task: expected a string"
        );
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = ResolutionError::Ambiguous {
            query: "task=lm subtask=poem".into(),
            candidates: vec!["gpt2_lm_poem_pfeiffer".into(), "bert_lm_poem_pfeiffer".into()],
        };
        assert_eq!(
            err.to_string(),
            "Query task=lm subtask=poem matches 2 adapters: gpt2_lm_poem_pfeiffer, bert_lm_poem_pfeiffer"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CatalogError::from(SchemaError::missing("task")).exit_code(), 65);
        assert_eq!(
            CatalogError::from(ResolutionError::NotFound { query: "x".into() }).exit_code(),
            66
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(CatalogError::io_with_path(io, "/tmp/x").exit_code(), 74);
        assert_eq!(CatalogError::Other("boom".into()).exit_code(), 1);
    }
}
