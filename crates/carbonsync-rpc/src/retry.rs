//! Bounded retry policy.
//!
//! The default is three attempts with no delay between them. A backoff can
//! be configured for rate-limited endpoints.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Cap on the delay between attempts.
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    ///
    /// Returns `None` once the attempt budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.config.max_attempts.max(1) {
            return None;
        }
        let base_ms = self.config.initial_backoff.as_millis() as f64
            * self.config.multiplier.powi(attempt as i32 - 1);
        let capped = base_ms.min(self.config.max_backoff.as_millis() as f64);
        Some(Duration::from_millis(capped as u64))
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `should_retry` decides which errors are worth another attempt; the
    /// last observed error is returned when the budget runs out.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        should_retry: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if should_retry(&e) => match self.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            call = label,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying call"
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    None => {
                        tracing::error!(call = label, attempt, error = %e, "max attempts exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_budget_is_three_attempts_without_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(1), Some(Duration::ZERO));
        assert_eq!(policy.next_delay(2), Some(Duration::ZERO));
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        });
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_millis(300)));
        assert_eq!(policy.next_delay(5), Some(Duration::from_millis(300)));
        assert_eq!(policy.next_delay(6), None);
    }

    #[tokio::test]
    async fn run_returns_last_error_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::default()
            .run("test", |_| true, || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure {n}")) }
            })
            .await;
        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_recovers_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = RetryPolicy::default()
            .run("test", |_| true, || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 2 { Err("flaky".into()) } else { Ok(n) } }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::default()
            .run("test", |_| false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
