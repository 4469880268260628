//! Durable key to platform-reference cache.
//!
//! The upload worker is the only writer; request handlers and presentation
//! code read concurrently. Entries are never evicted.

mod memory_store;
mod models;
mod schema;
mod sqlite_media_cache;

pub use memory_store::InMemoryMediaCacheStore;
pub use models::*;
pub use schema::MEDIA_CACHE_VERSIONED_SCHEMAS;
pub use sqlite_media_cache::SqliteMediaCacheStore;

use anyhow::Result;

pub trait MediaCacheStore: Send + Sync {
    /// Looks up the entry stored for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    /// Stores `entry` for `key`, replacing any previous entry.
    fn set(&self, key: &str, entry: &CacheEntry) -> Result<()>;
    /// Number of cached entries.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
