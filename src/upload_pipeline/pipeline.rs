use super::fetcher::MediaFetcher;
use super::in_flight::InFlightKeys;
use super::job::{DropReason, JobStage, UploadJob};
use super::retry_policy::RetryPolicy;
use super::uploader::MediaUploader;
use super::worker::UploadWorker;
use crate::config::UploadPipelineSettings;
use crate::media_cache::{CacheEntry, MediaCacheStore};
use crate::metrics;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("upload pipeline already started")]
    AlreadyStarted,
    #[error("upload pipeline was never started")]
    NotStarted,
    #[error("upload pipeline has been stopped")]
    Stopped,
    #[error("upload worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Entry point for turning fetchable media into cached platform references.
///
/// Owns the bounded queue and the single worker draining it. Construct once
/// at startup, share behind an `Arc`, call [`UploadPipeline::start`], and
/// [`UploadPipeline::stop`] on shutdown. Requests made before `start` are
/// buffered in the queue.
pub struct UploadPipeline {
    store: Arc<dyn MediaCacheStore>,
    placeholder: CacheEntry,
    enqueue_timeout: Duration,
    /// `None` once the pipeline has been stopped.
    sender: RwLock<Option<mpsc::Sender<UploadJob>>>,
    /// Worker and receiver waiting for `start`.
    pending: Mutex<Option<(UploadWorker, mpsc::Receiver<UploadJob>)>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    in_flight: Option<Arc<InFlightKeys>>,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn MediaCacheStore>,
        uploader: Arc<dyn MediaUploader>,
        placeholder: CacheEntry,
        settings: &UploadPipelineSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let in_flight = settings
            .suppress_in_flight_duplicates
            .then(|| Arc::new(InFlightKeys::new()));
        let worker = UploadWorker::new(
            store.clone(),
            uploader,
            RetryPolicy::new(settings),
            settings.max_media_bytes,
            in_flight.clone(),
        );

        Self {
            store,
            placeholder,
            enqueue_timeout: settings.enqueue_timeout,
            sender: RwLock::new(Some(sender)),
            pending: Mutex::new(Some((worker, receiver))),
            worker_handle: Mutex::new(None),
            shutdown: CancellationToken::new(),
            in_flight,
        }
    }

    /// Returns the cached entry for `key`, or the placeholder while an upload
    /// is scheduled in the background.
    ///
    /// Never fails and never waits longer than the enqueue timeout. A cache
    /// hit returns without touching the queue unless `force_refresh` is set.
    pub async fn request_upload(
        &self,
        key: &str,
        force_refresh: bool,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> CacheEntry {
        if !force_refresh {
            match self.store.get(key) {
                Ok(Some(entry)) => {
                    debug!("Media cache hit for {}", key);
                    metrics::record_upload_request("cache_hit");
                    return entry;
                }
                Ok(None) => {}
                Err(e) => warn!("Media cache lookup for {} failed, treating as miss: {:#}", key, e),
            }
        }

        let sender = self.sender.read().unwrap().clone();
        let Some(sender) = sender else {
            debug!("Not scheduling {}: {}", key, DropReason::PipelineStopped);
            metrics::record_upload_request("stopped");
            return self.placeholder.clone();
        };

        // Released on drop unless the job reaches the queue, which also covers
        // callers that give up while waiting for a slot.
        let claim = match &self.in_flight {
            Some(in_flight) => match in_flight.claim(key) {
                Some(claim) => Some(claim),
                None => {
                    debug!("Upload for {} already in flight", key);
                    metrics::record_upload_request("in_flight");
                    return self.placeholder.clone();
                }
            },
            None => None,
        };

        let job = UploadJob::new(key, fetcher);
        let correlation_id = job.correlation_id.clone();
        debug!(
            correlation_id = %correlation_id,
            stage = %JobStage::Queued,
            "Scheduling upload for {}",
            key
        );
        match sender.send_timeout(job, self.enqueue_timeout).await {
            Ok(()) => {
                if let Some(claim) = claim {
                    claim.hand_over();
                }
                debug!(correlation_id = %correlation_id, "Enqueued upload for {}", key);
                metrics::record_upload_request("enqueued");
                metrics::set_queue_depth(sender.max_capacity() - sender.capacity());
            }
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(
                    correlation_id = %correlation_id,
                    "Upload queue full after {:?}, dropping {}: {}",
                    self.enqueue_timeout,
                    key,
                    DropReason::QueueFull
                );
                metrics::record_upload_request("queue_full");
            }
            Err(SendTimeoutError::Closed(_)) => {
                debug!("Not scheduling {}: {}", key, DropReason::PipelineStopped);
                metrics::record_upload_request("stopped");
            }
        }

        self.placeholder.clone()
    }

    /// Spawns the worker on the current tokio runtime.
    pub fn start(&self) -> Result<(), PipelineError> {
        if self.sender.read().unwrap().is_none() {
            return Err(PipelineError::Stopped);
        }
        let pending = self.pending.lock().unwrap().take();
        let Some((worker, receiver)) = pending else {
            return Err(PipelineError::AlreadyStarted);
        };

        let handle = tokio::spawn(worker.run(receiver, self.shutdown.clone()));
        *self.worker_handle.lock().unwrap() = Some(handle);
        info!("Upload pipeline started");
        Ok(())
    }

    /// Closes the queue and waits for the worker to finish every accepted job.
    pub async fn stop(&self) -> Result<(), PipelineError> {
        self.sender.write().unwrap().take();

        let handle = self.worker_handle.lock().unwrap().take();
        let Some(handle) = handle else {
            let pending = self.pending.lock().unwrap().take();
            if pending.is_some() {
                return Err(PipelineError::NotStarted);
            }
            return Ok(());
        };

        info!("Stopping upload pipeline, draining queue");
        handle
            .await
            .map_err(|e| PipelineError::WorkerPanicked(e.to_string()))?;
        info!("Upload pipeline stopped");
        Ok(())
    }

    /// Like [`UploadPipeline::stop`] but abandons queued jobs and the job in
    /// progress. Meant for process shutdown only.
    pub async fn abort(&self) -> Result<(), PipelineError> {
        warn!("Aborting upload pipeline");
        self.shutdown.cancel();
        self.stop().await
    }

    /// Jobs currently waiting in the queue.
    pub fn queue_len(&self) -> usize {
        match self.sender.read().unwrap().as_ref() {
            Some(sender) => sender.max_capacity() - sender.capacity(),
            None => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker_handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn placeholder(&self) -> &CacheEntry {
        &self.placeholder
    }

    /// The store entries are written to, for readers that render media.
    pub fn store(&self) -> &Arc<dyn MediaCacheStore> {
        &self.store
    }
}
