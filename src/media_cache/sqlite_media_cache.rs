use super::models::{CacheEntry, MediaKind};
use super::schema::MEDIA_CACHE_VERSIONED_SCHEMAS;
use super::MediaCacheStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed media cache.
///
/// Runs in WAL mode with a dedicated read connection, so lookups from request
/// handlers are not serialized behind the worker's writes.
pub struct SqliteMediaCacheStore {
    reader: Mutex<Connection>,
    writer: Mutex<Connection>,
}

impl SqliteMediaCacheStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();

        let writer = open_versioned(path, MEDIA_CACHE_VERSIONED_SCHEMAS, "media cache")?;
        let journal_mode: String =
            writer.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(
                "Media cache database at {:?} is using journal mode {}",
                path,
                journal_mode
            );
        }

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open media cache read connection")?;

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<(String, String)> {
        Ok((row.get("remote_reference")?, row.get("kind")?))
    }
}

impl MediaCacheStore for SqliteMediaCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.reader.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT remote_reference, kind FROM media_cache WHERE key = ?1",
                params![key],
                Self::row_to_entry,
            )
            .optional()
            .with_context(|| format!("Failed to read media cache entry {}", key))?;

        let Some((remote_reference, kind)) = row else {
            return Ok(None);
        };
        let kind = MediaKind::parse(&kind)
            .with_context(|| format!("Unknown media kind {:?} stored for key {}", kind, key))?;
        Ok(Some(CacheEntry {
            remote_reference,
            kind,
        }))
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute(
            "INSERT INTO media_cache (key, remote_reference, kind)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                remote_reference = ?2,
                kind = ?3,
                created_at = cast(strftime('%s','now') as int)",
            params![key, entry.remote_reference, entry.kind.as_str()],
        )
        .with_context(|| format!("Failed to write media cache entry {}", key))?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let conn = self.reader.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM media_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
