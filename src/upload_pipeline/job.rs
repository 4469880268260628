use super::fetcher::MediaFetcher;
use crate::media_cache::{CacheEntry, CacheKey};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// One pending upload. Lives only in the queue and the worker, never persisted.
pub struct UploadJob {
    pub key: CacheKey,
    pub fetcher: Arc<dyn MediaFetcher>,
    /// Tags every log line of this job.
    pub correlation_id: String,
    pub enqueued_at: Instant,
}

impl UploadJob {
    pub fn new(key: impl Into<CacheKey>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            key: key.into(),
            fetcher,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            enqueued_at: Instant::now(),
        }
    }
}

impl fmt::Debug for UploadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadJob")
            .field("key", &self.key)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

/// Non-terminal stages a job moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Queued,
    Fetching,
    Classifying,
    Uploading,
    Caching,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Fetching => "fetching",
            JobStage::Classifying => "classifying",
            JobStage::Uploading => "uploading",
            JobStage::Caching => "caching",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended without a cache entry. None of these are retried as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    FetchError,
    TooLarge,
    UnsupportedType,
    RetryExhausted,
    CacheWriteFailed,
    QueueFull,
    PipelineStopped,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::FetchError => "fetch_error",
            DropReason::TooLarge => "too_large",
            DropReason::UnsupportedType => "unsupported_type",
            DropReason::RetryExhausted => "retry_exhausted",
            DropReason::CacheWriteFailed => "cache_write_failed",
            DropReason::QueueFull => "queue_full",
            DropReason::PipelineStopped => "pipeline_stopped",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Cached(CacheEntry),
    Dropped(DropReason),
}

impl JobOutcome {
    /// Label used for the jobs metric.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Cached(_) => "cached",
            JobOutcome::Dropped(reason) => reason.as_str(),
        }
    }
}
