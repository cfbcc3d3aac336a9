//! File system watcher for descriptor directories.
//!
//! Watches a directory of cards and refreshes the catalog when a card is
//! added, modified, or removed.

use crate::catalog::Catalog;
use crate::config::WatcherConfig;
use crate::error::{CatalogError, Result};
use crate::source::{DirectorySource, RecordSource};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Callback type for when descriptor changes are detected.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Watches a descriptor directory and reacts to card changes.
///
/// The watcher stops when [`CatalogWatcher::stop`] is called or when it is
/// dropped.
pub struct CatalogWatcher {
    /// The debounced file watcher
    _debouncer: Debouncer<RecommendedWatcher>,
    /// Channel to stop the event loop
    stop_tx: mpsc::Sender<()>,
}

impl CatalogWatcher {
    /// Refresh `catalog` from `source` whenever a card under its root changes.
    pub fn watch(catalog: Arc<Catalog>, source: DirectorySource) -> Result<Self> {
        let root = source.root().to_path_buf();
        Self::with_callback(
            &root,
            WatcherConfig::DEBOUNCE,
            Box::new(move || match catalog.refresh_from(&source) {
                Ok(report) => {
                    for error in &report.errors {
                        warn!("Rejected descriptor {}", error);
                    }
                }
                Err(e) => warn!("Catalog refresh failed, keeping previous index: {}", e),
            }),
        )
    }

    /// Invoke `on_change` whenever a card under `root` changes.
    ///
    /// # Arguments
    ///
    /// * `root` - Descriptor directory to watch (recursively)
    /// * `debounce_duration` - How long to wait after changes before triggering callback
    /// * `on_change` - Callback to invoke when changes are detected
    pub fn with_callback(
        root: impl AsRef<Path>,
        debounce_duration: Duration,
        on_change: ChangeCallback,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (event_tx, event_rx) = mpsc::channel::<DebounceEventResult>();

        let mut debouncer = new_debouncer(debounce_duration, event_tx)?;
        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| CatalogError::Watcher {
                message: format!("Failed to watch {}: {}", root.display(), e),
            })?;

        info!("Started watching descriptor directory {}", root.display());

        std::thread::spawn(move || loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(mpsc::TryRecvError::Disconnected) => {
                    debug!("Descriptor watcher stopping");
                    break;
                }
                Err(mpsc::TryRecvError::Empty) => {}
            }

            match event_rx.recv_timeout(WatcherConfig::POLL_INTERVAL) {
                Ok(Ok(events)) => {
                    if events.iter().any(|event| is_relevant_change(&event.path)) {
                        debug!("Detected descriptor changes");
                        on_change();
                    }
                }
                Ok(Err(e)) => warn!("Descriptor watcher error: {:?}", e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    warn!("Descriptor watcher channel disconnected");
                    break;
                }
            }
        });

        Ok(Self {
            _debouncer: debouncer,
            stop_tx,
        })
    }

    /// Stop the watcher.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

/// Check if a path change is relevant (a card, or a directory that may hold cards).
fn is_relevant_change(path: &Path) -> bool {
    DirectorySource::is_descriptor_file(path) || path.is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tempfile::TempDir;

    const CARD: &str = "type: text_task\ntask: lm\nsubtask: poem\nmodel_type: gpt2\nmodel_name: gpt2\nconfig:\n  using: pfeiffer\ndefault_version: \"1\"\nfiles:\n  - version: \"1\"\n    url: https://example.org/poem.zip\n    sha256: e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n";

    /// Poll `done` until it holds or `timeout` passes.
    fn wait_for(timeout: Duration, done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(WatcherConfig::POLL_INTERVAL);
        }
        done()
    }

    #[test]
    fn test_is_relevant_change() {
        assert!(is_relevant_change(Path::new("/cards/bert_sts_mrpc_pfeiffer.yaml")));
        assert!(is_relevant_change(Path::new("/cards/gpt2_lm_poem.yml")));
        assert!(!is_relevant_change(Path::new("/cards/README.md")));
        assert!(!is_relevant_change(Path::new("/cards/adapter.zip")));
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let result = CatalogWatcher::with_callback(
            "/nonexistent/cards",
            WatcherConfig::DEBOUNCE,
            Box::new(|| {}),
        );
        assert!(matches!(result, Err(CatalogError::Watcher { .. })));
    }

    #[test]
    fn test_stop_does_not_fire_callback() {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let watcher = CatalogWatcher::with_callback(
            temp_dir.path(),
            Duration::from_millis(50),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        watcher.stop();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_watch_refreshes_catalog_on_new_card() {
        let temp_dir = TempDir::new().unwrap();
        let source = DirectorySource::new(temp_dir.path());
        let (catalog, _) = Catalog::load_from(&source).unwrap();
        let catalog = Arc::new(catalog);
        assert!(catalog.is_empty());

        let watcher = CatalogWatcher::watch(Arc::clone(&catalog), source).unwrap();
        std::fs::write(temp_dir.path().join("gpt2_lm_poem_pfeiffer.yaml"), CARD).unwrap();

        let refreshed = wait_for(WatcherConfig::DEBOUNCE * 10, || catalog.len() == 1);
        watcher.stop();
        assert!(refreshed, "catalog was not refreshed after a card was added");
        assert!(catalog.resolve("lm", Some("poem"), None, None).is_ok());
    }

    #[test]
    fn test_non_card_files_do_not_trigger_callback() {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let watcher = CatalogWatcher::with_callback(
            temp_dir.path(),
            Duration::from_millis(100),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        std::fs::write(temp_dir.path().join("README.md"), "not a card").unwrap();
        std::thread::sleep(Duration::from_millis(1000));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // the watcher is still live: a card does fire it
        std::fs::write(temp_dir.path().join("gpt2_lm_poem_pfeiffer.yml"), CARD).unwrap();
        let fired = wait_for(Duration::from_secs(5), || calls.load(Ordering::SeqCst) > 0);
        watcher.stop();
        assert!(fired);
    }
}
