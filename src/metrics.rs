use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Metric name prefix for all memesearch metrics
const PREFIX: &str = "memesearch";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Coordinator
    pub static ref UPLOAD_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upload_requests_total"), "Upload requests by how they were answered"),
        &["result"]
    ).expect("Failed to create upload_requests_total metric");

    pub static ref UPLOAD_QUEUE_DEPTH: IntGauge = IntGauge::new(
        format!("{PREFIX}_upload_queue_depth"),
        "Jobs waiting in the upload queue"
    ).expect("Failed to create upload_queue_depth metric");

    // Worker
    pub static ref UPLOAD_JOBS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upload_jobs_total"), "Upload jobs by terminal outcome"),
        &["outcome"]
    ).expect("Failed to create upload_jobs_total metric");

    pub static ref UPLOAD_JOB_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_upload_job_duration_seconds"),
            "Time from enqueue to terminal outcome"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0])
    ).expect("Failed to create upload_job_duration_seconds metric");

    // Retry policy
    pub static ref UPLOAD_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upload_attempts_total"), "Individual upload attempts"),
        &["result"]
    ).expect("Failed to create upload_attempts_total metric");

    pub static ref RATE_LIMIT_WAIT_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_rate_limit_wait_seconds"),
            "Time slept after a rate-limit response"
        )
        .buckets(vec![0.5, 1.0, 2.0, 3.0, 4.0, 5.0])
    ).expect("Failed to create rate_limit_wait_seconds metric");

    // Cache
    pub static ref MEDIA_CACHE_ENTRIES: Gauge = Gauge::new(
        format!("{PREFIX}_media_cache_entries"),
        "Entries in the media cache"
    ).expect("Failed to create media_cache_entries metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(UPLOAD_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPLOAD_QUEUE_DEPTH.clone()));
    let _ = REGISTRY.register(Box::new(UPLOAD_JOBS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPLOAD_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(UPLOAD_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RATE_LIMIT_WAIT_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(MEDIA_CACHE_ENTRIES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_upload_request(result: &str) {
    UPLOAD_REQUESTS_TOTAL.with_label_values(&[result]).inc();
}

pub fn set_queue_depth(depth: usize) {
    UPLOAD_QUEUE_DEPTH.set(depth as i64);
}

pub fn record_upload_job(outcome: &str, duration: Duration) {
    UPLOAD_JOBS_TOTAL.with_label_values(&[outcome]).inc();
    UPLOAD_JOB_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_upload_attempt(result: &str) {
    UPLOAD_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_rate_limit_wait(wait: Duration) {
    RATE_LIMIT_WAIT_SECONDS.observe(wait.as_secs_f64());
}

pub fn set_media_cache_entries(count: usize) {
    MEDIA_CACHE_ENTRIES.set(count as f64);
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Serves `/metrics` on localhost until `shutdown` is cancelled.
pub async fn serve_metrics(port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", port))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
