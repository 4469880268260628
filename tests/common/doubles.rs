#![allow(dead_code)]

use async_trait::async_trait;
use memesearch_media_cache::{MediaFetcher, MediaKind, MediaUploader, UploadError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Serves fixed bytes (or a fixed error) and counts how often it was asked.
pub struct CountingFetcher {
    result: Result<Vec<u8>, String>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn bytes(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(bytes),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for CountingFetcher {
    async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(bytes) => Ok(bytes.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

/// One recorded upload attempt.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub at: Instant,
    pub kind: MediaKind,
    pub size: usize,
}

/// Replays scripted attempt results, then succeeds with `FILE_<n>` ids.
#[derive(Default)]
pub struct ScriptedUploader {
    script: Mutex<VecDeque<Result<String, UploadError>>>,
    /// Result used once the script runs out, instead of succeeding.
    fallback: Option<UploadError>,
    attempts: Mutex<Vec<Attempt>>,
}

impl ScriptedUploader {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn with_script(script: Vec<Result<String, UploadError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Rate limited on every attempt.
    pub fn always_rate_limited(retry_after: Duration) -> Self {
        Self {
            fallback: Some(UploadError::RateLimited { retry_after }),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaUploader for ScriptedUploader {
    async fn upload(&self, bytes: &[u8], kind: MediaKind) -> Result<String, UploadError> {
        let n = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Attempt {
                at: Instant::now(),
                kind,
                size: bytes.len(),
            });
            attempts.len()
        };

        if let Some(result) = self.script.lock().unwrap().pop_front() {
            return result;
        }
        match &self.fallback {
            Some(err) => Err(err.clone()),
            None => Ok(format!("FILE_{}", n)),
        }
    }
}
