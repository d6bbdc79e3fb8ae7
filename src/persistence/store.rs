//! Key/value stores backing the persistence layer.
//!
//! Values are JSON texts keyed by logical field name. A batch write replaces
//! all given keys at once, so a snapshot is never partially applied.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::error::PersistenceError;

/// A durable string key/value store.
pub trait KeyValueStore: Send {
    /// Reads one value.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes all entries as one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be made durable; in that case
    /// none of the entries are considered written.
    fn put_batch(&mut self, entries: Vec<(String, String)>) -> Result<(), PersistenceError>;
}

// ============================================================================
// FileStore
// ============================================================================

/// A store that keeps all keys in one JSON document on disk.
///
/// Every batch rewrites the document through a temporary file followed by a
/// rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file yields an empty store. A file that is not a JSON object
    /// of strings is treated as empty too (with a warning) so that corrupt
    /// state falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "State file {} is corrupt, starting from defaults: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(PersistenceError::io(path, e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, entries: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }

        let json = serde_json::to_string(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, json).map_err(|e| PersistenceError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| PersistenceError::io(&self.path, e))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put_batch(&mut self, entries: Vec<(String, String)>) -> Result<(), PersistenceError> {
        let mut next = self.entries.clone();
        next.extend(entries);
        self.write_atomic(&next)?;
        self.entries = next;
        Ok(())
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// An in-process store.
///
/// Clones share the same map, so a clone kept by a test can observe what
/// the engine wrote and can seed a second engine to simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one raw value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), value.into());
        }
    }

    /// Returns a copy of every stored entry.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put_batch(&mut self, entries: Vec<(String, String)>) -> Result<(), PersistenceError> {
        let mut map = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        map.extend(entries);
        Ok(())
    }
}
