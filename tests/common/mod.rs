//! Common test infrastructure
//!
//! Hand-written fetcher and uploader doubles, a fake Bot API / media API
//! server, and a pipeline builder backed by a temporary SQLite cache. Tests
//! should only import from this module.

#![allow(dead_code, unused_imports)]

mod doubles;
mod fixtures;
mod server;

pub use doubles::{CountingFetcher, ScriptedUploader};
pub use fixtures::*;
pub use server::{FakeServer, TEST_API_TOKEN, TEST_BOT_TOKEN};

use memesearch_media_cache::config::UploadPipelineSettings;
use memesearch_media_cache::{CacheEntry, SqliteMediaCacheStore, UploadPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const PLACEHOLDER_FILE_ID: &str = "PLACEHOLDER_FILE_ID";

pub fn placeholder() -> CacheEntry {
    CacheEntry::placeholder(PLACEHOLDER_FILE_ID)
}

/// A pipeline over a fresh on-disk cache. Not started.
pub struct TestPipeline {
    pub pipeline: Arc<UploadPipeline>,
    pub store: Arc<SqliteMediaCacheStore>,
    pub uploader: Arc<ScriptedUploader>,
    pub db_path: PathBuf,
    _temp_dir: TempDir, // Keep temp dir alive
}

impl TestPipeline {
    pub fn new(uploader: ScriptedUploader) -> Self {
        Self::with_settings(uploader, UploadPipelineSettings::default())
    }

    pub fn with_settings(uploader: ScriptedUploader, settings: UploadPipelineSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("media_cache.db");
        let store =
            Arc::new(SqliteMediaCacheStore::new(&db_path).expect("Failed to open media cache"));
        let uploader = Arc::new(uploader);
        let pipeline = Arc::new(UploadPipeline::new(
            store.clone(),
            uploader.clone(),
            placeholder(),
            &settings,
        ));

        Self {
            pipeline,
            store,
            uploader,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// Replaces the pipeline with a new one over a reopened database, as a
    /// process restart would.
    pub fn restart(self, uploader: ScriptedUploader) -> Self {
        let store =
            Arc::new(SqliteMediaCacheStore::new(&self.db_path).expect("Failed to reopen cache"));
        let uploader = Arc::new(uploader);
        let pipeline = Arc::new(UploadPipeline::new(
            store.clone(),
            uploader.clone(),
            placeholder(),
            &UploadPipelineSettings::default(),
        ));

        Self {
            pipeline,
            store,
            uploader,
            db_path: self.db_path,
            _temp_dir: self._temp_dir,
        }
    }
}
