//! File-backed [`KeyValueStore`].
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chronicle_core::{KeyValueStore, StoreError};
use chronicle_logging::{chronicle_debug, chronicle_warn};

use crate::persist::write_atomic;

/// A RON map on disk. Every mutation rewrites the whole file atomically;
/// the store holds a few dozen small entries.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store, starting empty when the file is missing. A file
    /// that cannot be parsed is an error rather than silently discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => ron::from_str(&text)
                .map_err(|err| StoreError::Serialize(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                chronicle_debug!("No state file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = ron::ser::to_string_pretty(&self.entries, ron::ser::PrettyConfig::default())
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        write_atomic(&self.path, text.as_bytes()).map_err(|err| {
            chronicle_warn!("Could not write {}: {}", self.path.display(), err);
            StoreError::Io(err.to_string())
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
