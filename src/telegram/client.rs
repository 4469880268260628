//! Telegram Bot API client used as the media uploader.

use super::models::{Message, TelegramResponse, User};
use crate::media_cache::MediaKind;
use crate::upload_pipeline::{MediaUploader, UploadError};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Wait used when a 429 arrives without a `retry_after` hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Uploads media by posting it to a fixed storage chat and keeping the
/// `file_id` Telegram assigns to it.
pub struct TelegramUploader {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    storage_chat_id: i64,
}

impl TelegramUploader {
    /// # Arguments
    /// * `api_base` - Bot API base URL (e.g., "https://api.telegram.org")
    /// * `bot_token` - Token issued by BotFather
    /// * `storage_chat_id` - Chat that hosts every uploaded file
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(
        api_base: String,
        bot_token: String,
        storage_chat_id: i64,
        timeout_sec: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create Telegram HTTP client")?;

        let api_base = api_base.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_base,
            bot_token,
            storage_chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Verifies the bot token by asking who we are.
    pub async fn get_me(&self) -> Result<User> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to connect to Telegram")?;

        let status = response.status();
        let body: TelegramResponse<User> = response
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Invalid getMe response (status {})", status))?;

        match (body.ok, body.result) {
            (true, Some(user)) => Ok(user),
            _ => bail!(
                "getMe failed with status {}: {}",
                status,
                body.description.unwrap_or_default()
            ),
        }
    }

    async fn send_media(&self, bytes: &[u8], kind: MediaKind) -> Result<String, UploadError> {
        let (method, field, file_name) = match kind {
            MediaKind::Photo => ("sendPhoto", "photo", "photo.jpg"),
            MediaKind::Video => ("sendVideo", "video", "video.mp4"),
        };

        let form = Form::new()
            .text("chat_id", self.storage_chat_id.to_string())
            .text("disable_notification", "true")
            .part(field, Part::bytes(bytes.to_vec()).file_name(file_name));

        debug!("Calling {} with {} bytes", method, bytes.len());
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::failed(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::failed(e.without_url().to_string()))?;

        parse_upload_response(status, &body, kind)
    }
}

#[async_trait]
impl MediaUploader for TelegramUploader {
    async fn upload(&self, bytes: &[u8], kind: MediaKind) -> Result<String, UploadError> {
        self.send_media(bytes, kind).await
    }
}

/// Maps a sendPhoto/sendVideo response to the uploaded file id or a
/// classified error.
pub(crate) fn parse_upload_response(
    status: StatusCode,
    body: &str,
    kind: MediaKind,
) -> Result<String, UploadError> {
    let response: TelegramResponse<Message> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(_) if status == StatusCode::TOO_MANY_REQUESTS => {
            return Err(UploadError::RateLimited {
                retry_after: DEFAULT_RETRY_AFTER,
            });
        }
        Err(e) => {
            return Err(UploadError::failed(format!(
                "unreadable response (status {}): {}",
                status, e
            )));
        }
    };

    if !response.ok || !status.is_success() {
        let rate_limited =
            status == StatusCode::TOO_MANY_REQUESTS || response.error_code == Some(429);
        if rate_limited {
            let retry_after = response
                .parameters
                .and_then(|p| p.retry_after)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(UploadError::RateLimited { retry_after });
        }
        return Err(UploadError::failed(format!(
            "Telegram error {}: {}",
            response.error_code.unwrap_or(i64::from(status.as_u16())),
            response.description.unwrap_or_default()
        )));
    }

    let Some(message) = response.result else {
        return Err(UploadError::failed("response carried no message"));
    };
    let file_id = match kind {
        MediaKind::Photo => message.photo_file_id(),
        MediaKind::Video => message.video_file_id(),
    };
    file_id
        .map(str::to_string)
        .ok_or_else(|| UploadError::failed(format!("response carried no {} file id", kind)))
}
