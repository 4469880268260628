use anyhow::{Context, Result};
use clap::Parser;
use memesearch_media_cache::config::{AppConfig, CliConfig, FileConfig};
use memesearch_media_cache::media_api::MediaApiClient;
use memesearch_media_cache::metrics;
use memesearch_media_cache::telegram::TelegramUploader;
use memesearch_media_cache::{CacheEntry, MediaCacheStore, SqliteMediaCacheStore, UploadPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Canonicalizes a path argument. Paths that don't exist yet are made
/// absolute against the working directory instead.
fn resolve_cli_path(arg: &str) -> Result<PathBuf> {
    let path = PathBuf::from(arg);
    match path.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()?.join(path))
            }
        }
        Err(e) => Err(e).with_context(|| format!("Error resolving path: {}", arg)),
    }
}

/// Uploads media from the media API to Telegram and caches the file ids.
#[derive(Parser, Debug)]
#[command(name = "memesearch-cache-warmer")]
struct CliArgs {
    /// Media ids to warm. Read from stdin, one per line, when none are given.
    pub media_ids: Vec<String>,

    /// Path to a TOML config file. Its values override CLI arguments.
    #[clap(long, value_parser = resolve_cli_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the media cache database.
    #[clap(long, value_parser = resolve_cli_path, env = "MEMESEARCH_DB_DIR")]
    pub db_dir: Option<PathBuf>,

    /// Base URL of the media API.
    #[clap(long, env = "MEMESEARCH_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the media API.
    #[clap(long, env = "MEMESEARCH_API_TOKEN")]
    pub api_token: Option<String>,

    #[clap(long, env = "TELEGRAM_BOT_TOKEN")]
    pub bot_token: Option<String>,

    /// Bot API base URL, for self-hosted Bot API servers.
    #[clap(long)]
    pub telegram_api_url: Option<String>,

    /// Chat that hosts every uploaded file.
    #[clap(long, allow_hyphen_values = true)]
    pub storage_chat_id: Option<i64>,

    /// file_id of an already-uploaded photo shown while media is pending.
    #[clap(long)]
    pub placeholder_file_id: Option<String>,

    /// Timeout in seconds for media API and Telegram requests.
    #[clap(long, default_value_t = 60)]
    pub http_timeout_sec: u64,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long)]
    pub metrics_port: Option<u16>,

    /// Upload again even if the media is already cached.
    #[clap(long)]
    pub force_refresh: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            bot_token: self.bot_token.clone(),
            telegram_api_url: self.telegram_api_url.clone(),
            storage_chat_id: self.storage_chat_id,
            placeholder_file_id: self.placeholder_file_id.clone(),
            http_timeout_sec: self.http_timeout_sec,
            metrics_port: self.metrics_port,
        }
    }
}

async fn read_media_ids_from_stdin() -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();
    let shutdown = CancellationToken::new();
    if let Some(port) = config.metrics_port {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::serve_metrics(port, token).await {
                error!("Metrics server failed: {:#}", e);
            }
        });
        info!("Metrics available at port {}!", port);
    }

    let db_path = config.media_cache_db_path();
    info!("Opening media cache database at {:?}...", db_path);
    let store = Arc::new(SqliteMediaCacheStore::new(&db_path)?);
    let cached = store.len()?;
    metrics::set_media_cache_entries(cached);
    info!("Media cache holds {} entries", cached);

    let uploader = TelegramUploader::new(
        config.telegram_api_url.clone(),
        config.bot_token.clone(),
        config.storage_chat_id,
        config.http_timeout_sec,
    )?;
    let me = uploader.get_me().await?;
    info!(
        "Authorized as bot {} (@{})",
        me.id,
        me.username.as_deref().unwrap_or("?")
    );

    let media_api = Arc::new(
        MediaApiClient::new(
            config.api_url.clone(),
            config.api_token.clone(),
            config.http_timeout_sec,
        )?
        .with_max_media_bytes(config.upload_pipeline.max_media_bytes),
    );
    info!("Media API at {}", media_api.base_url());

    let pipeline = Arc::new(UploadPipeline::new(
        store.clone(),
        Arc::new(uploader),
        CacheEntry::placeholder(config.placeholder_file_id.clone()),
        &config.upload_pipeline,
    ));
    pipeline.start()?;

    let abort_pipeline = pipeline.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning pending uploads");
            if let Err(e) = abort_pipeline.abort().await {
                error!("Failed to abort upload pipeline: {}", e);
            }
        }
    });

    let media_ids = if cli_args.media_ids.is_empty() {
        read_media_ids_from_stdin().await?
    } else {
        cli_args.media_ids.clone()
    };
    info!("Warming {} media ids", media_ids.len());

    for id in &media_ids {
        let entry = pipeline
            .request_upload(id, cli_args.force_refresh, media_api.fetcher(id.as_str()))
            .await;
        if &entry != pipeline.placeholder() {
            info!("{} already cached", id);
        }
    }

    pipeline.stop().await?;
    shutdown.cancel();

    let mut missing = 0;
    for id in &media_ids {
        match store.get(id)? {
            Some(entry) => println!("{}\t{}\t{}", id, entry.kind, entry.remote_reference),
            None => {
                missing += 1;
                println!("{}\tmissing", id);
            }
        }
    }
    info!(
        "Done: {} cached, {} missing",
        media_ids.len() - missing,
        missing
    );
    Ok(())
}
