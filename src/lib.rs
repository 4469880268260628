//! Memesearch media cache library
//!
//! Uploads meme media to Telegram once and caches the resulting `file_id` so
//! the bot can attach it to messages without re-uploading.

pub mod config;
pub mod media_api;
pub mod media_cache;
pub mod metrics;
pub mod sqlite_persistence;
pub mod telegram;
pub mod upload_pipeline;

// Re-export commonly used types for convenience
pub use media_cache::{CacheEntry, MediaCacheStore, MediaKind, SqliteMediaCacheStore};
pub use upload_pipeline::{MediaFetcher, MediaUploader, UploadError, UploadPipeline};
