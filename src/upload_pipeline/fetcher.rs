use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Source of the raw bytes for one upload job.
///
/// Invoked at most once per job and never retried by the worker; a caller
/// that wants another try simply requests the upload again.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Returned by fetchers that stop reading once media outgrows `limit` bytes.
/// The worker drops such jobs as too large rather than as fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("media exceeds the {limit} byte limit")]
pub struct MediaTooLarge {
    pub limit: usize,
}
