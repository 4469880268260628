mod file_config;

pub use file_config::{FileConfig, UploadPipelineConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub bot_token: Option<String>,
    pub telegram_api_url: Option<String>,
    pub storage_chat_id: Option<i64>,
    pub placeholder_file_id: Option<String>,
    pub http_timeout_sec: u64,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub api_url: String,
    pub api_token: Option<String>,
    pub bot_token: String,
    pub telegram_api_url: String,
    /// Chat the uploader posts media to; it acts as the permanent content host.
    pub storage_chat_id: i64,
    pub placeholder_file_id: String,
    pub http_timeout_sec: u64,
    pub metrics_port: Option<u16>,

    pub upload_pipeline: UploadPipelineSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let api_url = file
            .api_url
            .or_else(|| cli.api_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("api_url must be specified via --api-url or in config file")
            })?;
        let api_token = file.api_token.or_else(|| cli.api_token.clone());

        let bot_token = file
            .bot_token
            .or_else(|| cli.bot_token.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("bot_token must be specified via --bot-token or in config file")
            })?;
        let telegram_api_url = file
            .telegram_api_url
            .or_else(|| cli.telegram_api_url.clone())
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());
        let storage_chat_id = file
            .storage_chat_id
            .or(cli.storage_chat_id)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "storage_chat_id must be specified via --storage-chat-id or in config file"
                )
            })?;
        let placeholder_file_id = file
            .placeholder_file_id
            .or_else(|| cli.placeholder_file_id.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "placeholder_file_id must be specified via --placeholder-file-id or in config file"
                )
            })?;

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        let metrics_port = file.metrics_port.or(cli.metrics_port);

        let up_file = file.upload_pipeline.unwrap_or_default();
        let defaults = UploadPipelineSettings::default();
        let upload_pipeline = UploadPipelineSettings {
            queue_capacity: up_file.queue_capacity.unwrap_or(defaults.queue_capacity),
            enqueue_timeout: up_file
                .enqueue_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.enqueue_timeout),
            max_upload_attempts: up_file
                .max_upload_attempts
                .unwrap_or(defaults.max_upload_attempts),
            rate_limit_wait_cap: up_file
                .rate_limit_wait_cap_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_wait_cap),
            max_media_bytes: up_file.max_media_bytes.unwrap_or(defaults.max_media_bytes),
            suppress_in_flight_duplicates: up_file
                .suppress_in_flight_duplicates
                .unwrap_or(defaults.suppress_in_flight_duplicates),
        };
        if upload_pipeline.queue_capacity == 0 {
            bail!("upload_pipeline.queue_capacity must be greater than zero");
        }
        if upload_pipeline.max_upload_attempts == 0 {
            bail!("upload_pipeline.max_upload_attempts must be greater than zero");
        }

        Ok(Self {
            db_dir,
            api_url,
            api_token,
            bot_token,
            telegram_api_url,
            storage_chat_id,
            placeholder_file_id,
            http_timeout_sec,
            metrics_port,
            upload_pipeline,
        })
    }

    pub fn media_cache_db_path(&self) -> PathBuf {
        self.db_dir.join("media_cache.db")
    }
}

/// Process-wide tuning of the upload pipeline. Never varies per request.
#[derive(Debug, Clone)]
pub struct UploadPipelineSettings {
    /// Fixed capacity of the queue between request handlers and the worker.
    pub queue_capacity: usize,
    /// Longest a caller waits for a queue slot before its request is dropped.
    pub enqueue_timeout: Duration,
    /// Budget of non-rate-limit upload failures per job.
    pub max_upload_attempts: u32,
    /// Upper bound on a single rate-limit sleep.
    pub rate_limit_wait_cap: Duration,
    /// Payloads above this size are dropped before classification.
    pub max_media_bytes: usize,
    /// Skip enqueueing a key whose upload is already queued or running.
    pub suppress_in_flight_duplicates: bool,
}

impl Default for UploadPipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 400,
            enqueue_timeout: Duration::from_millis(20),
            max_upload_attempts: 3,
            rate_limit_wait_cap: Duration::from_secs(5),
            max_media_bytes: 16 * 1024 * 1024,
            suppress_in_flight_duplicates: true,
        }
    }
}
