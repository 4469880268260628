use crate::media_cache::MediaKind;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single upload attempt, classified by the uploader itself so
/// the retry policy never has to look at platform-specific error shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The platform asked us to slow down and wait `retry_after`.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("upload failed: {0}")]
    Failed(String),
}

impl UploadError {
    pub fn failed(message: impl Into<String>) -> Self {
        UploadError::Failed(message.into())
    }
}

/// Uploads media to the messaging platform's fixed storage destination and
/// returns the durable reference the platform assigned to it.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, bytes: &[u8], kind: MediaKind) -> Result<String, UploadError>;
}
