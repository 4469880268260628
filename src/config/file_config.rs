use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub bot_token: Option<String>,
    pub telegram_api_url: Option<String>,
    pub storage_chat_id: Option<i64>,
    pub placeholder_file_id: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub metrics_port: Option<u16>,

    // Feature configs
    pub upload_pipeline: Option<UploadPipelineConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UploadPipelineConfig {
    pub queue_capacity: Option<usize>,
    pub enqueue_timeout_ms: Option<u64>,
    pub max_upload_attempts: Option<u32>,
    pub rate_limit_wait_cap_secs: Option<u64>,
    pub max_media_bytes: Option<usize>,
    pub suppress_in_flight_duplicates: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
