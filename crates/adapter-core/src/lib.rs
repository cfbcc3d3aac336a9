//! Adapter Catalog - validation, lookup and integrity checking for adapter
//! descriptor cards.
//!
//! A descriptor card is a small YAML document describing one pre-trained
//! adapter: its task, the base model it fits, and the versioned archives it
//! can be downloaded from together with their digests. This crate:
//!
//! - parses and validates cards into [`Descriptor`]s
//! - indexes them by task/subtask and by base model
//! - resolves a query to exactly one [`FileEntry`], or explains why it can't
//! - verifies downloaded bytes against the declared digests
//!
//! Fetching cards and archives is left to the caller.
//!
//! # Architecture
//!
//! ```text
//! RecordSource ──► RawRecord ──► parse_descriptor ──► Descriptor
//!                                                        │
//!                                    Catalog (RwLock<Arc<CatalogIndex>>)
//!                                                        │
//!                                 resolve(task, subtask, model, version)
//!                                                        │
//!                              FileEntry ──► caller downloads ──► verify
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use adapter_catalog::{verify, Catalog, DirectorySource};
//!
//! let (catalog, errors) = Catalog::load_from(&DirectorySource::new("cards"))?;
//! for error in &errors {
//!     eprintln!("{}", error);
//! }
//!
//! let entry = catalog.resolve("sts", Some("mrpc"), Some("bert-base-uncased"), None)?;
//! let bytes = download(&entry.url)?;
//! if !verify(&bytes, &entry).is_trusted() {
//!     return Err("refusing tampered archive".into());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod integrity;
pub mod source;
pub mod watcher;

pub use catalog::{load_catalog, AdapterQuery, Catalog, CatalogIndex, LoadReport};
pub use descriptor::{
    parse_descriptor, parse_descriptor_str, AdapterType, ArchitectureConfig, Contact, Descriptor,
    FileEntry,
};
pub use error::{CatalogError, RecordError, ResolutionError, Result, SchemaError};
pub use integrity::{
    compute_digests, compute_file_digests, compute_file_digests_with_progress, verify,
    verify_digests, verify_file, DigestAlgorithm, FileDigests, HashProgress, VerificationResult,
};
pub use source::{DirectorySource, RawRecord, RecordBody, RecordSource};
pub use watcher::{CatalogWatcher, ChangeCallback};
