//! Data models for cached platform media references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical identifier of a media item, stable across requests (e.g. a meme id).
pub type CacheKey = String;

/// Kind of media the messaging platform stores for a cached reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable platform reference plus the kind of media behind it.
///
/// Entries are immutable: a newer upload for the same key replaces the whole
/// entry rather than editing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Platform-issued id that can be attached to messages without re-uploading.
    pub remote_reference: String,
    pub kind: MediaKind,
}

impl CacheEntry {
    pub fn new(remote_reference: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            remote_reference: remote_reference.into(),
            kind,
        }
    }

    /// The stand-in returned while the real entry is not available yet.
    /// It always points at an already-uploaded photo.
    pub fn placeholder(remote_reference: impl Into<String>) -> Self {
        Self::new(remote_reference, MediaKind::Photo)
    }
}
