//! Retry policy shared by the page fetch and the store API calls.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Classifies an error for retry decisions.
pub trait Transient {
    /// HTTP status attached to the error, if any.
    fn status(&self) -> Option<u16>;

    /// Whether the error came from the transport (connect, timeout, reset).
    fn is_transport(&self) -> bool {
        false
    }
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// `base * 2^(retry - 1)`.
    Exponential { base: Duration },
    /// `step * retry` plus a uniform random jitter in `[0, jitter]`.
    Linear { step: Duration, jitter: Duration },
}

impl Backoff {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential { base } => {
                let exp = retry.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exp)
            }
            Backoff::Linear { step, jitter } => {
                let jitter_ms = jitter.as_millis() as u64;
                let extra = if jitter_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=jitter_ms)
                };
                step.saturating_mul(retry) + Duration::from_millis(extra)
            }
        }
    }
}

/// How many times to try an operation and which failures are worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// HTTP statuses that trigger another attempt.
    pub retriable_statuses: Vec<u16>,
    /// Whether transport errors (no status) trigger another attempt.
    pub retry_transport: bool,
}

impl RetryPolicy {
    /// Page fetch: 3 retries, exponential backoff from 300ms, gateway/server errors.
    pub fn http_fetch() -> Self {
        Self {
            max_attempts: 4,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(300),
            },
            retriable_statuses: vec![500, 502, 503, 504],
            retry_transport: true,
        }
    }

    /// Store API: 5 attempts, linear backoff with jitter, rate limit and server errors.
    pub fn store_api() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Linear {
                step: Duration::from_secs(2),
                jitter: Duration::from_secs(1),
            },
            retriable_statuses: vec![429, 500, 503],
            retry_transport: false,
        }
    }

    /// Same policy with no sleeping between attempts.
    pub fn without_delay(mut self) -> Self {
        self.backoff = Backoff::None;
        self
    }

    /// Whether `err` may succeed on a later attempt.
    pub fn should_retry<E: Transient>(&self, err: &E) -> bool {
        match err.status() {
            Some(status) => self.retriable_statuses.contains(&status),
            None => self.retry_transport && err.is_transport(),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retriable error, or the
    /// attempt budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && self.should_retry(&err) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct FakeError(Option<u16>);

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake error {:?}", self.0)
        }
    }

    impl Transient for FakeError {
        fn status(&self) -> Option<u16> {
            self.0
        }

        fn is_transport(&self) -> bool {
            self.0.is_none()
        }
    }

    #[test]
    fn test_exponential_backoff_doubles() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(300),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(300));
        assert_eq!(backoff.delay(2), Duration::from_millis(600));
        assert_eq!(backoff.delay(3), Duration::from_millis(1200));
    }

    #[test]
    fn test_linear_backoff_stays_within_jitter() {
        let backoff = Backoff::Linear {
            step: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
        };
        for retry in 1..=4 {
            let delay = backoff.delay(retry);
            let floor = Duration::from_secs(2 * retry as u64);
            assert!(delay >= floor);
            assert!(delay <= floor + Duration::from_secs(1));
        }
    }

    #[test]
    fn test_store_policy_statuses() {
        let policy = RetryPolicy::store_api();
        assert!(policy.should_retry(&FakeError(Some(429))));
        assert!(policy.should_retry(&FakeError(Some(503))));
        assert!(!policy.should_retry(&FakeError(Some(502))));
        assert!(!policy.should_retry(&FakeError(Some(403))));
        assert!(!policy.should_retry(&FakeError(None)));
    }

    #[test]
    fn test_fetch_policy_retries_transport() {
        let policy = RetryPolicy::http_fetch();
        assert!(policy.should_retry(&FakeError(None)));
        assert!(policy.should_retry(&FakeError(Some(504))));
        assert!(!policy.should_retry(&FakeError(Some(404))));
    }

    #[tokio::test]
    async fn test_run_recovers_after_transient_failures() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::store_api().without_delay();

        let result = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(FakeError(Some(503)))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_permanent_error() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::store_api().without_delay();

        let result: Result<(), _> = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                async { Err(FakeError(Some(403))) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_at_attempt_budget() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::http_fetch().without_delay();

        let result: Result<(), _> = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                async { Err(FakeError(Some(500))) }
            })
            .await;

        assert_eq!(result.unwrap_err().0, Some(500));
        assert_eq!(calls.get(), 4);
    }
}
