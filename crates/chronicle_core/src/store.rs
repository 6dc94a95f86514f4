//! Key-value persistence seam.
//!
//! Everything the platform kept in browser storage goes through
//! [`KeyValueStore`]. Values are plain strings; structured values are JSON
//! documents written with [`set_json`].
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use chronicle_logging::chronicle_warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),
    #[error("store serialization error: {0}")]
    Serialize(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Vec<String>;
}

/// Reads and deserializes a JSON value. Unparseable values are logged and
/// treated as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            chronicle_warn!("Ignoring unreadable value under '{}': {}", key, err);
            None
        }
    }
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|err| StoreError::Serialize(err.to_string()))?;
    store.set(key, raw)
}

/// In-memory store, used by tests and as the fallback when no state file is
/// configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_json_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set("blogFriends", "{not json".to_string()).unwrap();
        let value: Option<Vec<String>> = get_json(&store, "blogFriends");
        assert!(value.is_none());
    }

    #[test]
    fn json_helpers_round_trip() {
        let mut store = MemoryStore::new();
        set_json(&mut store, "tags", &vec!["a", "b"]).unwrap();
        let value: Option<Vec<String>> = get_json(&store, "tags");
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(store.keys(), vec!["tags".to_string()]);
    }
}
