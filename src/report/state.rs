//! Persisted balance-fingerprint state
//!
//! The previous run's fingerprint is the only state shared between runs.
//! It lives behind the [`StateStore`] trait so the batch coordinator can be
//! exercised with an in-memory double instead of a real file.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

/// Store for the last run's balance fingerprint
///
/// Both operations are deliberately infallible at the interface: the
/// fingerprint is informational, so a missing or unwritable store degrades
/// to a log line, never a run failure.
pub trait StateStore: Send + Sync {
    /// Load the previously persisted fingerprint, if any
    fn load_fingerprint(&self) -> Option<String>;

    /// Persist the fingerprint for the next run
    fn save_fingerprint(&self, fingerprint: &str);
}

/// File-backed store: one short hex digest in a text file
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store over the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStateStore {
    fn load_fingerprint(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }

    fn save_fingerprint(&self, fingerprint: &str) {
        if let Err(err) = std::fs::write(&self.path, fingerprint) {
            warn!(
                path = %self.path.display(),
                error = %err,
                "Failed to save balance fingerprint"
            );
        }
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: Mutex<Option<String>>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a fingerprint
    pub fn with_fingerprint(fingerprint: &str) -> Self {
        Self {
            inner: Mutex::new(Some(fingerprint.to_string())),
        }
    }

    /// Current stored value
    pub fn current(&self) -> Option<String> {
        self.inner.lock().expect("state lock poisoned").clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load_fingerprint(&self) -> Option<String> {
        self.current()
    }

    fn save_fingerprint(&self, fingerprint: &str) {
        *self.inner.lock().expect("state lock poisoned") = Some(fingerprint.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.txt"));

        assert!(store.load_fingerprint().is_none());

        store.save_fingerprint("abcdef0123456789");
        assert_eq!(
            store.load_fingerprint().as_deref(),
            Some("abcdef0123456789")
        );
    }

    #[test]
    fn test_file_store_trims_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.txt");
        std::fs::write(&path, "abc123\n").unwrap();

        let store = FileStateStore::new(path);
        assert_eq!(store.load_fingerprint().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_file_store_empty_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.txt");
        std::fs::write(&path, "").unwrap();

        let store = FileStateStore::new(path);
        assert!(store.load_fingerprint().is_none());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStateStore::new();
        assert!(store.load_fingerprint().is_none());

        store.save_fingerprint("fp1");
        assert_eq!(store.load_fingerprint().as_deref(), Some("fp1"));

        store.save_fingerprint("fp2");
        assert_eq!(store.current().as_deref(), Some("fp2"));
    }
}
