//! Retry policy for platform uploads.
//!
//! Two tiers: rate-limit responses are waited out without limit (each wait
//! capped), every other failure spends one attempt from a small budget.

use super::uploader::UploadError;
use crate::config::UploadPipelineSettings;
use crate::metrics;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Shortest rate-limit sleep. A zero hint would otherwise retry in a tight
/// loop that never spends the attempt budget.
pub const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Returned once the attempt budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload abandoned after {attempts} failed attempts: {last_error}")]
pub struct AbandonedError {
    pub attempts: u32,
    pub last_error: UploadError,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of non-rate-limit failures tolerated before abandoning.
    pub max_attempts: u32,
    /// Upper bound on a single rate-limit sleep.
    pub rate_limit_wait_cap: Duration,
}

impl RetryPolicy {
    pub fn new(config: &UploadPipelineSettings) -> Self {
        Self {
            max_attempts: config.max_upload_attempts,
            rate_limit_wait_cap: config.rate_limit_wait_cap,
        }
    }

    /// How long to sleep when the platform suggests waiting `retry_after`.
    pub fn rate_limit_wait(&self, retry_after: Duration) -> Duration {
        retry_after
            .max(MIN_RATE_LIMIT_WAIT)
            .min(self.rate_limit_wait_cap)
    }

    /// Runs `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// `correlation_id` is attached to the abandonment log line so operators
    /// can find the whole history of the job.
    pub async fn run<T, F, Fut>(&self, correlation_id: &str, mut op: F) -> Result<T, AbandonedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut remaining = self.max_attempts;

        loop {
            let err = match op().await {
                Ok(value) => {
                    metrics::record_upload_attempt("success");
                    return Ok(value);
                }
                Err(err) => err,
            };

            match err {
                UploadError::RateLimited { retry_after } => {
                    metrics::record_upload_attempt("rate_limited");
                    let wait = self.rate_limit_wait(retry_after);
                    warn!(
                        "Rate limited by platform (suggested {:?}), sleeping {:?}",
                        retry_after, wait
                    );
                    metrics::record_rate_limit_wait(wait);
                    tokio::time::sleep(wait).await;
                }
                UploadError::Failed(_) => {
                    metrics::record_upload_attempt("failed");
                    remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        error!(
                            correlation_id,
                            "Abandoning upload after {} failed attempts: {}",
                            self.max_attempts,
                            err
                        );
                        return Err(AbandonedError {
                            attempts: self.max_attempts,
                            last_error: err,
                        });
                    }
                    warn!(
                        "Upload attempt failed ({} left): {}",
                        remaining, err
                    );
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&UploadPipelineSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed list of attempt results, then succeeds.
    struct Script {
        results: Mutex<VecDeque<Result<&'static str, UploadError>>>,
        calls: Mutex<u32>,
    }

    impl Script {
        fn new(results: Vec<Result<&'static str, UploadError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            }
        }

        async fn attempt(&self) -> Result<&'static str, UploadError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("FILE_ID"))
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    fn rate_limited(secs: u64) -> Result<&'static str, UploadError> {
        Err(UploadError::RateLimited {
            retry_after: Duration::from_secs(secs),
        })
    }

    fn failed() -> Result<&'static str, UploadError> {
        Err(UploadError::failed("boom"))
    }

    #[test]
    fn test_new_from_config() {
        let policy = RetryPolicy::new(&UploadPipelineSettings::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.rate_limit_wait_cap, Duration::from_secs(5));
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.rate_limit_wait(Duration::from_secs(3)),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.rate_limit_wait(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.rate_limit_wait(Duration::from_secs(30)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_zero_rate_limit_hint_is_floored() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_wait(Duration::ZERO), MIN_RATE_LIMIT_WAIT);
        assert_eq!(
            policy.rate_limit_wait(Duration::from_millis(200)),
            MIN_RATE_LIMIT_WAIT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_limit_hints_still_sleep() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![rate_limited(0), rate_limited(0), rate_limited(0)]);
        let start = Instant::now();

        let result = policy.run("cid", || script.attempt()).await;

        assert_eq!(result, Ok("FILE_ID"));
        assert_eq!(script.calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![]);
        let start = Instant::now();

        let result = policy.run("cid", || script.attempt()).await;

        assert_eq!(result, Ok("FILE_ID"));
        assert_eq!(script.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sleeps_suggested_wait() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![rate_limited(3)]);
        let start = Instant::now();

        let result = policy.run("cid", || script.attempt()).await;

        assert_eq!(result, Ok("FILE_ID"));
        assert_eq!(script.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sleep_is_capped() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![rate_limited(30)]);
        let start = Instant::now();

        policy.run("cid", || script.attempt()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandons_after_three_failures() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![failed(), failed(), failed()]);
        let start = Instant::now();

        let err = policy.run("cid", || script.attempt()).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, UploadError::failed("boom"));
        assert_eq!(script.calls(), 3);
        // Generic failures retry without sleeping.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![failed(), failed()]);

        let result = policy.run("cid", || script.attempt()).await;

        assert_eq!(result, Ok("FILE_ID"));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limits_do_not_consume_attempts() {
        let policy = RetryPolicy::default();
        let script = Script::new(vec![
            failed(),
            rate_limited(1),
            failed(),
            rate_limited(2),
            rate_limited(1),
        ]);
        let start = Instant::now();

        let result = policy.run("cid", || script.attempt()).await;

        assert_eq!(result, Ok("FILE_ID"));
        assert_eq!(script.calls(), 6);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_rate_limits_then_abandon() {
        let policy = RetryPolicy::default();
        let mut results = vec![rate_limited(1); 10];
        results.extend([failed(), failed(), failed()]);
        let script = Script::new(results);

        let err = policy.run("cid", || script.attempt()).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(script.calls(), 13);
    }
}
