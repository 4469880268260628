use super::models::CacheEntry;
use super::MediaCacheStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

/// Non-persistent media cache, useful for tests and for running without a
/// database. Entries are lost when the process exits.
#[derive(Default)]
pub struct InMemoryMediaCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryMediaCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, CacheEntry)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl MediaCacheStore for InMemoryMediaCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }
}
