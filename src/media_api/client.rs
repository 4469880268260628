//! HTTP client for the primary media store.

use crate::config::UploadPipelineSettings;
use crate::upload_pipeline::{MediaFetcher, MediaTooLarge};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

pub struct MediaApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    /// Bodies larger than this are abandoned mid-read.
    max_media_bytes: usize,
}

impl MediaApiClient {
    /// # Arguments
    /// * `base_url` - Base URL of the media API (e.g., "http://localhost:8080")
    /// * `token` - Optional bearer token sent with every request
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, token: Option<String>, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create media API HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Url::parse(&base_url).with_context(|| format!("Invalid media API URL: {}", base_url))?;

        Ok(Self {
            client,
            base_url,
            token,
            max_media_bytes: UploadPipelineSettings::default().max_media_bytes,
        })
    }

    pub fn with_max_media_bytes(mut self, max_media_bytes: usize) -> Self {
        self.max_media_bytes = max_media_bytes;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/media/{id}` with `id` percent-encoded as one path segment.
    fn media_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Media API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push("media")
            .push(id);
        Ok(url)
    }

    /// Downloads the raw bytes of media `id`.
    ///
    /// Fails with [`MediaTooLarge`] as soon as the announced or received size
    /// passes the configured limit, without buffering the rest of the body.
    pub async fn get_media(&self, id: &str) -> Result<Vec<u8>> {
        let url = self.media_url(id)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let mut response = request
            .send()
            .await
            .with_context(|| format!("Failed to request media {}", id))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => bail!("media {} not found", id),
            status => bail!("Media request for {} failed with status: {}", id, status),
        }

        let limit = self.max_media_bytes;
        if let Some(len) = response.content_length() {
            if len > limit as u64 {
                return Err(MediaTooLarge { limit })
                    .with_context(|| format!("media {} is {} bytes", id, len));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed to read body of media {}", id))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(MediaTooLarge { limit })
                    .with_context(|| format!("media {} body too long", id));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Fetch capability for one media item, to hand to the upload pipeline.
    pub fn fetcher(self: &Arc<Self>, id: impl Into<String>) -> Arc<dyn MediaFetcher> {
        Arc::new(ApiMediaFetcher {
            client: self.clone(),
            media_id: id.into(),
        })
    }
}

/// Fetches one media item from the media API.
pub struct ApiMediaFetcher {
    client: Arc<MediaApiClient>,
    media_id: String,
}

impl ApiMediaFetcher {
    pub fn new(client: Arc<MediaApiClient>, media_id: impl Into<String>) -> Self {
        Self {
            client,
            media_id: media_id.into(),
        }
    }
}

#[async_trait]
impl MediaFetcher for ApiMediaFetcher {
    async fn fetch(&self) -> Result<Vec<u8>> {
        self.client.get_media(&self.media_id).await
    }
}
