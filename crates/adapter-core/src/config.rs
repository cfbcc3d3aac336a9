//! Centralized configuration for the adapter catalog.
//!
//! Constants for descriptor discovery, hashing and directory watching.

use std::time::Duration;

/// Descriptor discovery and naming.
pub struct CatalogConfig;

impl CatalogConfig {
    /// File extensions recognised as descriptor cards.
    pub const DESCRIPTOR_EXTENSIONS: &'static [&'static str] = &["yaml", "yml"];
    /// Joins the parts of a descriptor identifier.
    pub const IDENTIFIER_SEPARATOR: &'static str = "_";
    /// Field name reported when the record as a whole is malformed.
    pub const DOCUMENT_FIELD: &'static str = "<document>";
}

/// Digest computation.
pub struct HashingConfig;

impl HashingConfig {
    /// Chunk size for reading archives (8MB, optimal for SSDs).
    pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;
    pub const SHA1_HEX_LEN: usize = 40;
    pub const SHA256_HEX_LEN: usize = 64;
}

/// Descriptor directory watching.
pub struct WatcherConfig;

impl WatcherConfig {
    /// Quiet period after the last change before a refresh fires.
    pub const DEBOUNCE: Duration = Duration::from_millis(500);
    /// How often the event loop checks for a stop request.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(250);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_lengths() {
        assert_eq!(HashingConfig::SHA1_HEX_LEN, 20 * 2);
        assert_eq!(HashingConfig::SHA256_HEX_LEN, 32 * 2);
    }

    #[test]
    fn test_intervals_are_reasonable() {
        assert!(WatcherConfig::DEBOUNCE > Duration::ZERO);
        assert!(WatcherConfig::POLL_INTERVAL <= WatcherConfig::DEBOUNCE);
    }
}
