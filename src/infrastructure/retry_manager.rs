//! 재시도 관리자 - jittered exponential backoff around async operations
//!
//! The executor runs an operation, asks a caller-supplied predicate whether a
//! failure is transient, and if so sleeps a randomized delay and tries again.
//! Fatal failures and exhausted retries propagate the last error unchanged.
//!
//! Delay for retry `n` (0-indexed):
//! `min(min_backoff + (2^n - 1) * U(0.8, 1.2) * delta, U(0.6, 1.0) * max_backoff)`.
//! Randomness comes from `fastrand`'s thread-local generator, so concurrent
//! workers never share RNG state.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::Cancelled;

/// Backoff parameters for [`RetryExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub retry_count: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub delta_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        crate::infrastructure::config::RetryConfig::default().to_policy()
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let min = self.min_backoff.as_secs_f64();
        let max = self.max_backoff.as_secs_f64();
        let delta = self.delta_backoff.as_secs_f64();

        let growth = 2f64.powi(attempt.min(62) as i32) - 1.0;
        let delta_n = growth * uniform(0.8 * delta, 1.2 * delta);
        let ceiling = uniform(0.6 * max, max);

        let secs = (min + delta_n).min(ceiling).clamp(0.0, max);
        Duration::from_secs_f64(secs).min(self.max_backoff)
    }
}

fn uniform(low: f64, high: f64) -> f64 {
    low + fastrand::f64() * (high - low)
}

/// Observability hook: (error, attempt number starting at 1, delay before next try)
pub type AttemptFailedHook = Arc<dyn Fn(&dyn Display, u32, Duration) + Send + Sync>;

/// Generic retry wrapper used by the resolver and the page scraper
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    on_attempt_failed: AttemptFailedHook,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            on_attempt_failed: Arc::new(|error: &dyn Display, attempt: u32, delay: Duration| {
                warn!("🔄 Attempt {} failed, retrying in {:?}: {}", attempt, delay, error);
            }),
        }
    }

    /// Replace the default logging hook
    pub fn with_attempt_hook(mut self, hook: AttemptFailedHook) -> Self {
        self.on_attempt_failed = hook;
        self
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails fatally, runs out of retries,
    /// or `cancellation_token` fires.
    pub async fn execute<T, E, Op, Fut, P>(
        &self,
        mut operation: Op,
        is_transient: P,
        cancellation_token: &CancellationToken,
    ) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display + From<Cancelled>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancellation_token.is_cancelled() {
                return Err(E::from(Cancelled));
            }

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("✅ Operation succeeded after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !is_transient(&error) {
                debug!("❌ Fatal failure on attempt {}: {}", attempt + 1, error);
                return Err(error);
            }
            if attempt >= self.policy.retry_count {
                warn!("❌ Giving up after {} attempts: {}", attempt + 1, error);
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            (self.on_attempt_failed)(&error, attempt + 1, delay);

            tokio::select! {
                () = tokio::time::sleep(delay) => {},
                () = cancellation_token.cancelled() => {
                    warn!("🛑 Retry loop cancelled while backing off");
                    return Err(E::from(Cancelled));
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScrapeError;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(retry_count: u32) -> RetryPolicy {
        RetryPolicy {
            retry_count,
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            delta_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_retries() {
        let calls = AtomicU32::new(0);
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&delays);
        let executor = RetryExecutor::new(fast_policy(3)).with_attempt_hook(Arc::new(
            move |_: &dyn Display, attempt: u32, delay: Duration| {
                recorded.lock().unwrap().push((attempt, delay));
            },
        ));

        let result: Result<(), ScrapeError> = executor
            .execute(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(ScrapeError::transient(format!("boom {n}"))) }
                },
                |_| true,
                &CancellationToken::new(),
            )
            .await;

        // initial attempt + 3 retries, last error surfaces unchanged
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result, Err(ScrapeError::transient("boom 3")));

        let delays = delays.lock().unwrap();
        assert_eq!(delays.iter().map(|(a, _)| *a).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(delays.iter().all(|(_, d)| *d <= Duration::from_millis(5)));
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new(fast_policy(5));

        let result: Result<(), ScrapeError> = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(ScrapeError::format("bad id suffix")) }
                },
                ScrapeError::is_transient,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScrapeError::Format { .. })));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new(fast_policy(3));

        let result = executor
            .execute(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(ScrapeError::transient("blank name"))
                        } else {
                            Ok(n)
                        }
                    }
                },
                ScrapeError::is_transient,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_attempt() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<(), ScrapeError> = RetryExecutor::new(fast_policy(3))
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                ScrapeError::is_transient,
                &token,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result, Err(ScrapeError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff() {
        let policy = RetryPolicy {
            retry_count: 3,
            min_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(60),
            delta_backoff: Duration::from_secs(1),
        };
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result: Result<(), ScrapeError> = RetryExecutor::new(policy)
            .execute(
                || async { Err(ScrapeError::transient("timeout")) },
                ScrapeError::is_transient,
                &token,
            )
            .await;

        assert_eq!(result, Err(ScrapeError::Cancelled));
    }

    #[test]
    fn test_first_delay_is_min_backoff_when_below_ceiling() {
        let policy = RetryPolicy {
            retry_count: 3,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            delta_backoff: Duration::from_secs(1),
        };
        // delta_0 is zero, and 100ms is far below the 6s lower ceiling
        let delay = policy.delay_for(0);
        assert!((delay.as_secs_f64() - 0.1).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_delay_bounded_by_max_backoff(
            attempt in 0u32..40,
            min_ms in 0u64..5_000,
            extra_ms in 0u64..60_000,
            delta_ms in 0u64..10_000,
        ) {
            let policy = RetryPolicy {
                retry_count: 10,
                min_backoff: Duration::from_millis(min_ms),
                max_backoff: Duration::from_millis(min_ms + extra_ms),
                delta_backoff: Duration::from_millis(delta_ms),
            };
            let delay = policy.delay_for(attempt);
            prop_assert!(delay <= policy.max_backoff);
        }
    }
}
