//! The catalog: the currently published [`CatalogIndex`] plus refresh.
//!
//! # Concurrency
//!
//! ```text
//! refresh(records)                     readers
//!     │                                   │
//!     ├─ parse + build new index          ├─ snapshot() ── Arc clone under read lock
//!     │   (no lock held)                  │
//!     └─ swap Arc under write lock        └─ query the snapshot, lock-free
//! ```
//!
//! A reader holds on to whichever generation it snapshotted, so it sees
//! either the complete old index or the complete new one.

mod index;
mod resolve;

pub use index::CatalogIndex;
pub use resolve::{select_version, AdapterQuery};

use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::descriptor::{Descriptor, FileEntry};
use crate::error::{RecordError, ResolutionError, Result};
use crate::source::{RawRecord, RecordSource};

/// Outcome of a load or refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Descriptors published
    pub loaded: usize,
    /// Records that failed validation
    pub errors: Vec<RecordError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Shared, atomically refreshable adapter catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    current: RwLock<Arc<CatalogIndex>>,
}

impl Catalog {
    /// A catalog with no descriptors.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(index: CatalogIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// Build a catalog from raw records.
    pub fn load(records: impl IntoIterator<Item = RawRecord>) -> (Self, Vec<RecordError>) {
        let (index, errors) = CatalogIndex::build(records);
        info!(
            "Loaded adapter catalog: {} descriptors, {} rejected",
            index.len(),
            errors.len()
        );
        (Self::new(index), errors)
    }

    /// Build a catalog from everything a source currently holds.
    pub fn load_from(source: &dyn RecordSource) -> Result<(Self, Vec<RecordError>)> {
        Ok(Self::load(source.records()?))
    }

    /// The currently published index.
    pub fn snapshot(&self) -> Arc<CatalogIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the published index wholesale.
    pub fn publish(&self, index: CatalogIndex) {
        let next = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    /// Rebuild from `records` and publish the result.
    ///
    /// The new index is built before the swap, so in-flight readers are
    /// never blocked by parsing.
    pub fn refresh(&self, records: impl IntoIterator<Item = RawRecord>) -> LoadReport {
        let (index, errors) = CatalogIndex::build(records);
        let report = LoadReport {
            loaded: index.len(),
            errors,
        };
        self.publish(index);
        info!(
            "Refreshed adapter catalog: {} descriptors, {} rejected",
            report.loaded,
            report.errors.len()
        );
        report
    }

    /// Rebuild from a source and publish the result.
    ///
    /// If the source itself fails, the current index stays published.
    pub fn refresh_from(&self, source: &dyn RecordSource) -> Result<LoadReport> {
        let records = source.records()?;
        Ok(self.refresh(records))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// See [`CatalogIndex::lookup`].
    pub fn lookup(
        &self,
        task: &str,
        subtask: Option<&str>,
        model_type: Option<&str>,
        model_name: Option<&str>,
        config: Option<&str>,
    ) -> Vec<Descriptor> {
        self.snapshot()
            .lookup(task, subtask, model_type, model_name, config)
            .into_iter()
            .cloned()
            .collect()
    }

    /// See [`CatalogIndex::resolve_descriptor`].
    pub fn resolve_descriptor(
        &self,
        query: &AdapterQuery<'_>,
    ) -> std::result::Result<Descriptor, ResolutionError> {
        self.snapshot().resolve_descriptor(query).cloned()
    }

    /// See [`CatalogIndex::resolve_query`].
    pub fn resolve_query(
        &self,
        query: &AdapterQuery<'_>,
    ) -> std::result::Result<FileEntry, ResolutionError> {
        self.snapshot().resolve_query(query).cloned()
    }

    /// Resolve `(task, subtask, model_name, version)` against the current index.
    pub fn resolve(
        &self,
        task: &str,
        subtask: Option<&str>,
        model_name: Option<&str>,
        version: Option<&str>,
    ) -> std::result::Result<FileEntry, ResolutionError> {
        self.snapshot()
            .resolve(task, subtask, model_name, version)
            .cloned()
    }
}

/// Build a catalog from raw records, returning per-record failures.
pub fn load_catalog(records: impl IntoIterator<Item = RawRecord>) -> (Catalog, Vec<RecordError>) {
    Catalog::load(records)
}
