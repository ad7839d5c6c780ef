//! Scroll-offset persistence.
//!
//! Simple keyed storage for per-container scroll offsets: read once on
//! mount, written on a debounce after scrolling settles (the debounce lives
//! in the coordinator; this module only stores). Storage failures degrade
//! gracefully - they are logged and the offset is simply not restored next
//! run.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Keyed offset storage. One key per named scroll container.
pub trait ScrollPositionStore: Send {
    fn get(&self, key: &str) -> Option<u64>;
    fn set(&mut self, key: &str, offset: u64);
    /// Push pending writes to the backing medium, if any.
    fn flush(&mut self) {}
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryScrollStore {
    offsets: HashMap<String, u64>,
}

impl MemoryScrollStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScrollPositionStore for MemoryScrollStore {
    fn get(&self, key: &str) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    fn set(&mut self, key: &str, offset: u64) {
        self.offsets.insert(key.to_string(), offset);
    }
}

/// JSON-file-backed store with atomic write-rename so an interrupted write
/// never corrupts the previous state.
#[derive(Debug)]
pub struct FileScrollStore {
    path: PathBuf,
    offsets: HashMap<String, u64>,
    dirty: bool,
}

impl FileScrollStore {
    /// Open the store, loading existing offsets. A missing or corrupt file
    /// starts empty.
    pub fn open(path: PathBuf) -> Self {
        let offsets = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(offsets) => offsets,
                Err(err) => {
                    warn!(target: "core.persist", path = %path.display(), "corrupt offset store: {err}");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            offsets,
            dirty: false,
        }
    }

    fn write_out(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.offsets)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl ScrollPositionStore for FileScrollStore {
    fn get(&self, key: &str) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    fn set(&mut self, key: &str, offset: u64) {
        self.offsets.insert(key.to_string(), offset);
        self.dirty = true;
    }

    fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        if let Err(err) = self.write_out() {
            warn!(target: "core.persist", path = %self.path.display(), "offset write failed: {err}");
            return;
        }
        self.dirty = false;
    }
}

impl Drop for FileScrollStore {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryScrollStore::new();
        assert_eq!(store.get("chat"), None);
        store.set("chat", 42);
        assert_eq!(store.get("chat"), Some(42));
        store.set("chat", 7);
        assert_eq!(store.get("chat"), Some(7));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scroll.json");

        let mut store = FileScrollStore::open(path.clone());
        store.set("chat", 120);
        store.set("sidebar", 3);
        store.flush();

        let reopened = FileScrollStore::open(path);
        assert_eq!(reopened.get("chat"), Some(120));
        assert_eq!(reopened.get("sidebar"), Some(3));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scroll.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileScrollStore::open(path);
        assert_eq!(store.get("chat"), None);
    }

    #[test]
    fn flush_without_changes_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scroll.json");
        let mut store = FileScrollStore::open(path.clone());
        store.flush();
        assert!(!path.exists(), "no write without dirty state");
    }
}
