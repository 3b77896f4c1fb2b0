//! Durable storage for the last confirmed status
//!
//! There is no authoritative in-memory cache: every `read` goes back to the
//! underlying medium, so the record may be inspected or edited between
//! cycles.

use crate::contracts::{PersistedState, Status};
use crate::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Storage for the single persisted record
pub trait StateStore: Send + Sync {
    /// Load the full record. Missing or unreadable records yield `None`.
    fn load(&self) -> Option<PersistedState>;

    /// Durably replace the record
    fn write(&self, status: Status, timestamp: DateTime<Utc>) -> Result<()>;

    /// Last persisted status, `None` when absent or corrupt
    fn read(&self) -> Option<Status> {
        self.load().map(|state| state.status)
    }
}

/// JSON file store with write-then-rename replacement
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the target; suffixed so it never collides with it
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_bytes(&self) -> Option<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file unreadable, treating as absent");
                None
            }
        }
    }
}

/// The only field the transition decision depends on
#[derive(Deserialize)]
struct StatusOnly {
    status: Status,
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Option<PersistedState> {
        let bytes = self.read_bytes()?;

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file malformed, treating as absent");
                None
            }
        }
    }

    /// Hand-edited records without a usable timestamp still count
    fn read(&self) -> Option<Status> {
        let bytes = self.read_bytes()?;

        match serde_json::from_slice::<StatusOnly>(&bytes) {
            Ok(record) => Some(record.status),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file malformed, treating as absent");
                None
            }
        }
    }

    fn write(&self, status: Status, timestamp: DateTime<Utc>) -> Result<()> {
        let record = PersistedState::new(status, timestamp);
        let json = serde_json::to_vec_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::store(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        // The handle is flushed and closed before the rename.
        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path).map_err(|e| {
                MonitorError::store(format!("failed to create {}: {}", temp_path.display(), e))
            })?;
            file.write_all(&json)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(MonitorError::store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), status = %status, "State persisted");
        Ok(())
    }
}

/// In-memory store, mainly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Option<PersistedState>>,
    writes: AtomicUsize,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted status
    pub fn with_status(status: Status) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.state.write() {
            *guard = Some(PersistedState::new(status, Utc::now()));
        }
        store
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail as if the medium were gone
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.read().ok().and_then(|guard| guard.clone())
    }

    fn write(&self, status: Status, timestamp: DateTime<Utc>) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(MonitorError::store("store is read-only"));
        }

        let mut guard = self
            .state
            .write()
            .map_err(|e| MonitorError::store(format!("Failed to acquire lock: {}", e)))?;
        *guard = Some(PersistedState::new(status, timestamp));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("status.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_none() {
        let (_dir, store) = file_store();
        assert_eq!(store.read(), None);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = file_store();
        let now = Utc::now();

        store.write(Status::Exhausted, now).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.status, Status::Exhausted);
        assert_eq!(state.timestamp, now);
        assert_eq!(store.read(), Some(Status::Exhausted));
    }

    #[test]
    fn test_write_replaces_previous_record() {
        let (_dir, store) = file_store();

        store.write(Status::Available, Utc::now()).unwrap();
        store.write(Status::Exhausted, Utc::now()).unwrap();

        assert_eq!(store.read(), Some(Status::Exhausted));
    }

    #[test]
    fn test_corrupt_file_reads_none() {
        let (_dir, store) = file_store();
        fs::write(store.path(), "{\"status\": \"avail").unwrap();
        assert_eq!(store.read(), None);

        fs::write(store.path(), "{\"status\": \"maybe\", \"timestamp\": \"2025-01-01T00:00:00Z\"}")
            .unwrap();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_record_is_plain_json() {
        let (_dir, store) = file_store();
        store.write(Status::Available, Utc::now()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["status"], "available");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let (dir, store) = file_store();
        store.write(Status::Available, Utc::now()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "status.json");
    }

    #[test]
    fn test_external_edit_is_seen() {
        let (_dir, store) = file_store();
        store.write(Status::Available, Utc::now()).unwrap();

        fs::write(
            store.path(),
            "{\"status\": \"exhausted\", \"timestamp\": \"2025-01-01T00:00:00Z\"}",
        )
        .unwrap();

        assert_eq!(store.read(), Some(Status::Exhausted));
    }

    #[test]
    fn test_read_tolerates_loose_timestamps() {
        let (_dir, store) = file_store();

        fs::write(
            store.path(),
            r#"{"status":"exhausted","timestamp":"2025-10-01T08:30:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(store.read(), Some(Status::Exhausted));
        assert!(store.load().is_some());

        fs::write(store.path(), r#"{"status":"exhausted"}"#).unwrap();
        assert_eq!(store.read(), Some(Status::Exhausted));
        assert!(store.load().is_none());

        fs::write(store.path(), r#"{"status":"available","timestamp":"yesterday"}"#).unwrap();
        assert_eq!(store.read(), Some(Status::Available));
    }

    #[test]
    fn test_tmp_suffixed_state_file_stays_atomic() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("status.tmp"));

        assert_ne!(store.temp_path(), store.path());
        assert_eq!(store.temp_path(), dir.path().join("status.tmp.tmp"));

        store.write(Status::Exhausted, Utc::now()).unwrap();
        assert_eq!(store.read(), Some(Status::Exhausted));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state/status.json"));

        store.write(Status::Available, Utc::now()).unwrap();
        assert_eq!(store.read(), Some(Status::Available));
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStore::with_status(Status::Available);
        assert_eq!(store.read(), Some(Status::Available));
        assert_eq!(store.write_count(), 0);

        store.write(Status::Exhausted, Utc::now()).unwrap();
        assert_eq!(store.write_count(), 1);

        store.set_read_only(true);
        assert!(store.write(Status::Available, Utc::now()).is_err());
        assert_eq!(store.read(), Some(Status::Exhausted));
    }
}
