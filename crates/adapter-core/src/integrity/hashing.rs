//! Streaming digest computation for adapter archives.
//!
//! Provides SHA-1 and SHA-256 with:
//! - Single-pass dual digest computation
//! - Chunked reads for archives on disk
//! - Progress reporting for large files

use crate::config::HashingConfig;
use crate::error::{CatalogError, Result};
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tokio::sync::mpsc;

/// Both digests of one archive, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigests {
    pub sha1: String,
    pub sha256: String,
}

/// Progress update during hashing.
#[derive(Debug, Clone)]
pub struct HashProgress {
    /// Bytes processed so far
    pub bytes_processed: u64,
    /// Total file size
    pub total_bytes: u64,
    /// Progress fraction (0.0-1.0)
    pub progress: f32,
}

/// Feeds the same bytes to both hashers.
struct DualHasher {
    sha1: Sha1,
    sha256: Sha256,
}

impl DualHasher {
    fn new() -> Self {
        Self {
            sha1: Sha1::new(),
            sha256: Sha256::new(),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        self.sha1.update(chunk);
        self.sha256.update(chunk);
    }

    fn finalize(self) -> FileDigests {
        FileDigests {
            sha1: hex::encode(self.sha1.finalize()),
            sha256: hex::encode(self.sha256.finalize()),
        }
    }
}

/// Compute both digests over an in-memory buffer.
pub fn compute_digests(bytes: &[u8]) -> FileDigests {
    let mut hasher = DualHasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Compute both digests of a file in a single pass.
pub fn compute_file_digests(path: impl AsRef<Path>) -> Result<FileDigests> {
    hash_file(path.as_ref(), |_, _| {})
}

/// Compute both digests of a file with progress reporting.
///
/// Hashing runs on a blocking task. Progress updates are sent with
/// `try_send`, so a slow receiver drops updates instead of stalling the hash.
pub async fn compute_file_digests_with_progress(
    path: impl AsRef<Path>,
    progress_tx: Option<mpsc::Sender<HashProgress>>,
) -> Result<FileDigests> {
    let path = path.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || {
        hash_file(&path, |bytes_processed, total_bytes| {
            if let Some(ref tx) = progress_tx {
                let progress = if total_bytes == 0 {
                    1.0
                } else {
                    bytes_processed as f32 / total_bytes as f32
                };
                let _ = tx.try_send(HashProgress {
                    bytes_processed,
                    total_bytes,
                    progress,
                });
            }
        })
    })
    .await
    .map_err(|e| CatalogError::Other(format!("Digest computation task failed: {}", e)))?
}

fn hash_file(path: &Path, mut on_chunk: impl FnMut(u64, u64)) -> Result<FileDigests> {
    let mut file = std::fs::File::open(path).map_err(|e| CatalogError::io_with_path(e, path))?;
    let total_bytes = file
        .metadata()
        .map_err(|e| CatalogError::io_with_path(e, path))?
        .len();

    let mut hasher = DualHasher::new();
    let mut buffer = vec![0u8; HashingConfig::CHUNK_SIZE];
    let mut bytes_processed: u64 = 0;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| CatalogError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        bytes_processed += bytes_read as u64;
        on_chunk(bytes_processed, total_bytes);
    }

    Ok(hasher.finalize())
}
