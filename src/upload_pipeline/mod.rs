//! Background upload of media to the messaging platform.
//!
//! Callers go through [`UploadPipeline::request_upload`], which answers from
//! the media cache or hands back a placeholder and queues the upload. A single
//! worker drains the bounded queue: fetch, classify, upload with retries, then
//! write the platform reference to the cache.

mod classifier;
mod fetcher;
mod in_flight;
mod job;
mod pipeline;
mod retry_policy;
mod uploader;
mod worker;

pub use classifier::{classify, Classification, SNIFF_LEN};
pub use fetcher::{MediaFetcher, MediaTooLarge};
pub use in_flight::{InFlightClaim, InFlightKeys};
pub use job::{DropReason, JobOutcome, JobStage, UploadJob};
pub use pipeline::{PipelineError, UploadPipeline};
pub use retry_policy::{AbandonedError, RetryPolicy};
pub use uploader::{MediaUploader, UploadError};
pub use worker::UploadWorker;
