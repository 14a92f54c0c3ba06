//! Durable key-value storage for the session credential.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plays the role a browser's local storage plays for a web client: a small
//! string map that survives restarts. [`FileStore`] keeps the map in a JSON
//! file; [`MemoryStore`] is for tests and embedders that persist elsewhere.
//!
//! TRADE-OFFS
//! ==========
//! No cross-process locking. Two processes writing the same file race and the
//! last writer wins. Writes go through a temp file and rename so a crash never
//! leaves a half-written credential behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ClientError;

/// Key the session credential lives under.
pub const CREDENTIAL_KEY: &str = "credential";

/// Minimal durable string map.
pub trait CredentialStore: Send + Sync {
    /// Read a value. Missing keys are `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Remove a value. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, ClientError> {
        self.entries
            .lock()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".into()))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON-file-backed store. The whole map is rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| ClientError::Storage(format!("{} is not a JSON string map: {e}", self.path.display())))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| storage_error(dir, &e))?;
        }
        let body = serde_json::to_string_pretty(map).map_err(|e| ClientError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| storage_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> ClientError {
    ClientError::Storage(format!("{}: {err}", path.display()))
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut map = self.read_map().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "discarding unreadable credential file");
            BTreeMap::new()
        });
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(err) => {
                // An unreadable file holds nothing we can trust; drop it.
                tracing::warn!(error = %err, "removing unreadable credential file");
                return match std::fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(storage_error(&self.path, &e)),
                };
            }
        };
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
