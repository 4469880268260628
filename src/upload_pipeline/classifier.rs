//! Content sniffing for fetched media.

use crate::media_cache::MediaKind;

/// Only this many leading bytes are inspected.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Supported(MediaKind),
    /// Terminal rejection. `mime` is the detected type when one was recognized.
    Unsupported { mime: Option<&'static str> },
}

pub fn classify(bytes: &[u8]) -> Classification {
    let prefix = &bytes[..bytes.len().min(SNIFF_LEN)];
    let Some(kind) = infer::get(prefix) else {
        return Classification::Unsupported { mime: None };
    };

    match kind.mime_type() {
        "image/png" | "image/jpeg" => Classification::Supported(MediaKind::Photo),
        "video/mp4" => Classification::Supported(MediaKind::Video),
        other => Classification::Unsupported { mime: Some(other) },
    }
}
