//! Integrity verification of downloaded adapter archives.
//!
//! Every digest declared on a [`FileEntry`] must match. An entry with no
//! digest at all is [`VerificationResult::Unverifiable`], which callers must
//! treat as a trust failure just like a mismatch.

mod hashing;

pub use hashing::{
    compute_digests, compute_file_digests, compute_file_digests_with_progress, FileDigests,
    HashProgress,
};

use crate::descriptor::FileEntry;
use crate::error::Result;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

/// Digest algorithms a card may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    /// Hex digest of `bytes` under this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }

    fn pick<'a>(&self, digests: &'a FileDigests) -> &'a str {
        match self {
            DigestAlgorithm::Sha1 => &digests.sha1,
            DigestAlgorithm::Sha256 => &digests.sha256,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of checking bytes against a file entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationResult {
    /// Every declared digest matched.
    Valid,
    /// A declared digest did not match.
    Mismatch {
        algorithm: DigestAlgorithm,
        expected: String,
        actual: String,
    },
    /// Nothing to compare against.
    Unverifiable { reason: String },
}

impl VerificationResult {
    /// Only [`VerificationResult::Valid`] means the bytes may be used.
    pub fn is_trusted(&self) -> bool {
        matches!(self, VerificationResult::Valid)
    }
}

impl std::fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationResult::Valid => write!(f, "valid"),
            VerificationResult::Mismatch {
                algorithm,
                expected,
                actual,
            } => write!(
                f,
                "{} mismatch: expected {}, got {}",
                algorithm, expected, actual
            ),
            VerificationResult::Unverifiable { reason } => write!(f, "unverifiable: {}", reason),
        }
    }
}

/// Digests declared on an entry, strongest first.
fn declared(entry: &FileEntry) -> Vec<(DigestAlgorithm, &str)> {
    let mut out = Vec::with_capacity(2);
    if let Some(sha256) = &entry.sha256 {
        out.push((DigestAlgorithm::Sha256, sha256.as_str()));
    }
    if let Some(sha1) = &entry.sha1 {
        out.push((DigestAlgorithm::Sha1, sha1.as_str()));
    }
    out
}

fn compare(
    entry: &FileEntry,
    mut actual_for: impl FnMut(DigestAlgorithm) -> String,
) -> VerificationResult {
    let declared = declared(entry);
    if declared.is_empty() {
        return VerificationResult::Unverifiable {
            reason: format!("version {} declares no sha1 or sha256 digest", entry.version),
        };
    }

    for (algorithm, expected) in declared {
        let expected = expected.to_lowercase();
        let actual = actual_for(algorithm);
        if actual != expected {
            warn!(
                "{} mismatch for {}: expected {}, got {}",
                algorithm, entry.url, expected, actual
            );
            return VerificationResult::Mismatch {
                algorithm,
                expected,
                actual,
            };
        }
    }

    debug!("Verified {} (version {})", entry.url, entry.version);
    VerificationResult::Valid
}

/// Verify downloaded bytes against a file entry.
///
/// Pure: only the algorithms the entry declares are computed.
pub fn verify(bytes: &[u8], entry: &FileEntry) -> VerificationResult {
    compare(entry, |algorithm| algorithm.digest(bytes))
}

/// Verify precomputed digests against a file entry.
pub fn verify_digests(digests: &FileDigests, entry: &FileEntry) -> VerificationResult {
    compare(entry, |algorithm| algorithm.pick(digests).to_string())
}

/// Verify an archive on disk against a file entry, streaming it in chunks.
pub fn verify_file(path: impl AsRef<Path>, entry: &FileEntry) -> Result<VerificationResult> {
    if !entry.is_verifiable() {
        return Ok(compare(entry, |_| String::new()));
    }
    let digests = compute_file_digests(path)?;
    Ok(verify_digests(&digests, entry))
}
