//! Subset of the Telegram Bot API types the uploader reads.

use serde::Deserialize;

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before repeating a rate-limited request.
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Available sizes of a photo, smallest first.
    pub photo: Option<Vec<PhotoSize>>,
    pub video: Option<FileRef>,
    /// Silent MP4s sent through sendVideo may come back as animations.
    pub animation: Option<FileRef>,
    pub document: Option<FileRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

/// Any file-backed attachment; only the ids matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub file_unique_id: String,
}

impl Message {
    /// File id of the largest photo size.
    pub fn photo_file_id(&self) -> Option<&str> {
        self.photo
            .as_ref()
            .and_then(|sizes| sizes.last())
            .map(|size| size.file_id.as_str())
    }

    pub fn video_file_id(&self) -> Option<&str> {
        self.video
            .as_ref()
            .or(self.animation.as_ref())
            .or(self.document.as_ref())
            .map(|file| file.file_id.as_str())
    }
}
