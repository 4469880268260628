//! The single sequential consumer of the upload queue.

use super::classifier::{classify, Classification};
use super::fetcher::MediaTooLarge;
use super::in_flight::InFlightKeys;
use super::job::{DropReason, JobOutcome, JobStage, UploadJob};
use super::retry_policy::RetryPolicy;
use super::uploader::MediaUploader;
use crate::media_cache::{CacheEntry, MediaCacheStore};
use crate::metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct UploadWorker {
    store: Arc<dyn MediaCacheStore>,
    uploader: Arc<dyn MediaUploader>,
    retry_policy: RetryPolicy,
    max_media_bytes: usize,
    in_flight: Option<Arc<InFlightKeys>>,
}

impl UploadWorker {
    pub fn new(
        store: Arc<dyn MediaCacheStore>,
        uploader: Arc<dyn MediaUploader>,
        retry_policy: RetryPolicy,
        max_media_bytes: usize,
        in_flight: Option<Arc<InFlightKeys>>,
    ) -> Self {
        Self {
            store,
            uploader,
            retry_policy,
            max_media_bytes,
            in_flight,
        }
    }

    /// Drains `receiver` one job at a time.
    ///
    /// Returns when every sender is gone and the queue is empty, or as soon as
    /// `shutdown` is cancelled (dropping the job in progress, if any).
    pub async fn run(self, mut receiver: mpsc::Receiver<UploadJob>, shutdown: CancellationToken) {
        info!("Upload worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Upload worker received shutdown signal");
                    break;
                }
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            metrics::set_queue_depth(receiver.len());

            let key = job.key.clone();
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    warn!("Upload worker aborted while processing {}", key);
                    self.release(&key);
                    break;
                }
                _ = self.process(job) => {}
            }
        }

        let abandoned = receiver.len();
        if abandoned > 0 {
            warn!("Upload worker stopped with {} jobs still queued", abandoned);
        }
        info!("Upload worker stopped");
    }

    /// Takes one job to a terminal outcome.
    pub async fn process(&self, job: UploadJob) -> JobOutcome {
        let span = info_span!(
            "upload_job",
            key = %job.key,
            correlation_id = %job.correlation_id
        );
        let outcome = self.execute(&job).instrument(span).await;

        metrics::record_upload_job(outcome.label(), job.enqueued_at.elapsed());
        self.release(&job.key);
        outcome
    }

    async fn execute(&self, job: &UploadJob) -> JobOutcome {
        debug!(
            "Job {} after {:?}",
            JobStage::Fetching,
            job.enqueued_at.elapsed()
        );
        let bytes = match job.fetcher.fetch().await {
            Ok(bytes) => bytes,
            Err(e) if e.downcast_ref::<MediaTooLarge>().is_some() => {
                warn!("{:#}, dropping job", e);
                return JobOutcome::Dropped(DropReason::TooLarge);
            }
            Err(e) => {
                error!("Failed to fetch media, dropping job: {:#}", e);
                return JobOutcome::Dropped(DropReason::FetchError);
            }
        };
        if bytes.len() > self.max_media_bytes {
            warn!(
                "Media is {} bytes, above the {} byte limit, dropping job",
                bytes.len(),
                self.max_media_bytes
            );
            return JobOutcome::Dropped(DropReason::TooLarge);
        }

        debug!("Job {} {} bytes", JobStage::Classifying, bytes.len());
        let kind = match classify(&bytes) {
            Classification::Supported(kind) => kind,
            Classification::Unsupported { mime } => {
                warn!(
                    "Unsupported media type {}, dropping job",
                    mime.unwrap_or("unknown")
                );
                return JobOutcome::Dropped(DropReason::UnsupportedType);
            }
        };

        debug!("Job {} as {}", JobStage::Uploading, kind);
        let payload: &[u8] = &bytes;
        let uploader = &self.uploader;
        let remote_reference = match self
            .retry_policy
            .run(&job.correlation_id, move || uploader.upload(payload, kind))
            .await
        {
            Ok(remote_reference) => remote_reference,
            Err(e) => {
                error!("Dropping job: {}", e);
                return JobOutcome::Dropped(DropReason::RetryExhausted);
            }
        };

        debug!("Job {}", JobStage::Caching);
        let entry = CacheEntry::new(remote_reference, kind);
        if let Err(e) = self.store.set(&job.key, &entry) {
            error!("Uploaded media but failed to cache it: {:#}", e);
            return JobOutcome::Dropped(DropReason::CacheWriteFailed);
        }
        info!("Cached {} {}", entry.kind, entry.remote_reference);

        match self.store.len() {
            Ok(count) => metrics::set_media_cache_entries(count),
            Err(e) => debug!("Could not count media cache entries: {:#}", e),
        }
        JobOutcome::Cached(entry)
    }

    fn release(&self, key: &str) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.release(key);
        }
    }
}
