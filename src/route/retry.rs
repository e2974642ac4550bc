use std::fmt::Display;
use std::future::Future;
use std::iter;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::jitter;
use tracing::{debug, warn};

/// How often and how patiently an upstream call is retried. `max_attempts` counts the first attempt, delays double
/// from `base_delay` up to `max_delay`, and every attempt is cut off after `attempt_timeout`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration, attempt_timeout: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            attempt_timeout,
            jitter: false,
        }
    }

    /// Keeps retrying for as long as the caller lets it, with the same doubling delays.
    pub fn unbounded(base_delay: Duration, max_delay: Duration, attempt_timeout: Duration) -> Self {
        RetryPolicy::new(usize::MAX, base_delay, max_delay, attempt_timeout)
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Waits between consecutive attempts: `base * 2^n`, capped at `max_delay`, one fewer than `max_attempts`.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let max_delay = self.max_delay;
        let strategy = iter::successors(Some(self.base_delay), |delay| Some(delay.saturating_mul(2)))
            .map(move |delay| delay.min(max_delay))
            .take(self.max_attempts - 1);

        if self.jitter { Box::new(strategy.map(jitter)) } else { Box::new(strategy) }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RetryError<E> {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(E),
}

/// Runs `operation` until it succeeds or the policy runs out of attempts, returning the last error. The attempt
/// number (starting at 1) is passed to the operation.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempt_timeout = policy.attempt_timeout;
    let max_attempts = policy.max_attempts;
    let mut attempt = 0;

    Retry::spawn(policy.delays(), || {
        attempt += 1;
        let current = attempt;
        let call = operation(current);
        async move {
            debug!(attempt = current, "🔁 Attempt {}/{}...", current, max_attempts);
            match timeout(attempt_timeout, call).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    warn!(attempt = current, "⚠️ Attempt {}/{} failed: {}", current, max_attempts, e);
                    Err(RetryError::Failed(e))
                }
                Err(_) => {
                    warn!(attempt = current, "⏳ Attempt {}/{} timed out after {:?}", current, max_attempts, attempt_timeout);
                    Err(RetryError::Timeout(attempt_timeout))
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn instant_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO, Duration::from_secs(1))
    }

    #[test]
    fn delays_double_from_the_base_delay() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500), Duration::from_secs(30), Duration::from_secs(12));

        let delays = policy.delays().collect::<Vec<_>>();

        assert_eq!(delays, vec![Duration::from_millis(500), Duration::from_millis(1_000), Duration::from_millis(2_000)]);
    }

    #[test]
    fn delays_are_capped_by_the_max_delay() {
        let policy = RetryPolicy::new(5, Duration::from_millis(400), Duration::from_millis(1_000), Duration::from_secs(12));

        let delays = policy.delays().collect::<Vec<_>>();

        assert_eq!(delays, vec![Duration::from_millis(400), Duration::from_millis(800), Duration::from_millis(1_000), Duration::from_millis(1_000)]);
    }

    #[rstest]
    #[case(1, vec![1, 2, 4])]
    #[case(3, vec![3, 6, 12])]
    #[case(501, vec![501, 1_002, 2_004])]
    fn delays_keep_small_and_odd_base_delays_exact(#[case] base_ms: u64, #[case] expected_ms: Vec<u64>) {
        let policy = RetryPolicy::new(4, Duration::from_millis(base_ms), Duration::from_secs(30), Duration::from_secs(12));

        let delays = policy.delays().collect::<Vec<_>>();

        assert_eq!(delays, expected_ms.into_iter().map(Duration::from_millis).collect::<Vec<_>>());
    }

    #[test]
    fn unbounded_delays_double_up_to_the_cap_and_stay_there() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(500), Duration::from_secs(30), Duration::from_secs(5));

        let delays = policy.delays().take(9).map(|d| d.as_millis()).collect::<Vec<_>>();

        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]);
    }

    #[test]
    fn jittered_delays_never_exceed_the_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(30), Duration::from_secs(12)).with_jitter(true);

        let delays = policy.delays().collect::<Vec<_>>();

        assert_eq!(delays.len(), 4);
        for (delay, ceiling) in delays.iter().zip([500, 1_000, 2_000, 4_000]) {
            assert!(*delay <= Duration::from_millis(ceiling), "{:?} exceeds {} ms", delay, ceiling);
        }
    }

    #[test]
    fn a_single_attempt_never_waits() {
        assert_eq!(instant_policy(1).delays().count(), 0);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn call_with_retry_returns_the_first_success() {
        let calls = AtomicUsize::new(0);

        let result = call_with_retry(&instant_policy(4), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if attempt < 3 { Err("busy") } else { Ok(attempt) } }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test_log::test(tokio::test)]
    async fn call_with_retry_stops_at_the_attempt_ceiling() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = call_with_retry(&instant_policy(4), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("HTTP 503 on attempt {}", attempt)) }
        })
        .await;

        assert_eq!(result, Err(RetryError::Failed("HTTP 503 on attempt 4".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test_log::test(tokio::test)]
    async fn call_with_retry_times_out_hanging_attempts() {
        let policy = RetryPolicy::new(2, Duration::ZERO, Duration::ZERO, Duration::from_millis(20));

        let result: Result<(), RetryError<String>> = call_with_retry(&policy, |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(RetryError::Timeout(Duration::from_millis(20))));
    }
}
