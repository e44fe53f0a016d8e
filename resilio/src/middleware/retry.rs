//! Retry with configurable backoff and optional jitter.
//!
//! A failing operation is re-invoked up to a bound, with a delay between
//! attempts. Failures are retried or propagated unchanged; the retry policy
//! never converts a failure into anything else.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Middleware;
use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::operation::Operation;
use async_trait::async_trait;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// delay = base
    #[default]
    Fixed,
    /// delay = base * 2^(attempt - 1)
    Exponential,
}

/// Jitter strategy to spread out concurrent retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JitterStrategy {
    /// No jitter; delays are exactly as computed.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a computed delay in milliseconds.
    #[must_use]
    pub fn apply(&self, delay_ms: u64) -> u64 {
        match self {
            Self::None => delay_ms,
            Self::Full => {
                if delay_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay_ms)
                }
            }
            Self::Equal => {
                let half = delay_ms / 2;
                if half == 0 {
                    delay_ms
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt. Zero means exactly one
    /// attempt with no wait.
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    pub backoff_base_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Fixed,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_backoff_base_ms(mut self, delay_ms: u64) -> Self {
        self.backoff_base_ms = delay_ms;
        self
    }

    /// Sets the maximum delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Computes the delay before the given retry. `attempt` is 1-indexed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms;
        let delay = match self.backoff {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Exponential => {
                base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            }
        };
        Duration::from_millis(self.jitter.apply(delay.min(self.max_delay_ms)))
    }
}

/// Re-invokes a failing operation up to the configured bound.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from a config.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the policy's configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<T> Middleware<T> for RetryPolicy
where
    T: Send + 'static,
{
    async fn execute(
        &self,
        operation: &mut Operation<T>,
        ctx: &ExecutionContext,
    ) -> Result<T, ResilienceError> {
        let mut attempt: u32 = 0;
        loop {
            match operation.invoke().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let err = ResilienceError::from_boxed(err);
                    if attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    if ctx.is_cancelled() {
                        return Err(err);
                    }

                    attempt += 1;
                    ctx.record_attempt();
                    let delay = self.config.delay_for(attempt);
                    ctx.try_emit_event(
                        "middleware.retry_scheduled",
                        Some(serde_json::json!({
                            "attempt": attempt,
                            "delay_ms": delay.as_millis() as u64,
                            "error": err.to_string(),
                        })),
                    );
                    debug!(
                        operation = %ctx.operation_name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("retried_op")
    }

    fn fast() -> RetryConfig {
        RetryConfig::new().with_backoff_base_ms(1)
    }

    #[test]
    fn test_config_builder() {
        let config = RetryConfig::new()
            .with_max_retries(5)
            .with_backoff_base_ms(500)
            .with_max_delay_ms(10_000)
            .with_backoff(BackoffStrategy::Exponential)
            .with_jitter(JitterStrategy::Full);

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_ms, 500);
        assert_eq!(config.max_delay_ms, 10_000);
        assert_eq!(config.backoff, BackoffStrategy::Exponential);
        assert_eq!(config.jitter, JitterStrategy::Full);
    }

    #[test]
    fn test_fixed_delay() {
        let config = RetryConfig::new().with_backoff_base_ms(100);
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(5), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_delay() {
        let config = RetryConfig::new()
            .with_backoff_base_ms(100)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_backoff_base_ms(1000)
            .with_max_delay_ms(5000)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(config.delay_for(20), Duration::from_millis(5000));
    }

    #[test]
    fn test_full_jitter_bounds() {
        for _ in 0..100 {
            assert!(JitterStrategy::Full.apply(100) <= 100);
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        for _ in 0..100 {
            let d = JitterStrategy::Equal.apply(100);
            assert!((50..=100).contains(&d));
        }
    }

    #[tokio::test]
    async fn test_success_consumes_no_retry() {
        let policy = RetryPolicy::new(fast().with_max_retries(3));
        let calls = Arc::new(AtomicU32::new(0));
        let probe = calls.clone();
        let mut op = Operation::new(move || {
            let calls = probe.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>("ok")
            }
        });

        let context = ctx();
        let result = policy.execute(&mut op, &context).await;
        assert_eq!(result.ok(), Some("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.attempts(), 0);
    }

    #[tokio::test]
    async fn test_always_failing_op_invoked_exactly_n_plus_one_times() {
        for max_retries in [0u32, 1, 2, 4] {
            let policy = RetryPolicy::new(fast().with_max_retries(max_retries));
            let calls = Arc::new(AtomicU32::new(0));
            let probe = calls.clone();
            let mut op = Operation::new(move || {
                let calls = probe.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("down".to_string())
                }
            });

            let err = policy.execute(&mut op, &ctx()).await.unwrap_err();
            assert!(matches!(err, ResilienceError::Operation { .. }));
            assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        }
    }

    #[tokio::test]
    async fn test_last_failure_kind_preserved() {
        let policy = RetryPolicy::new(fast().with_max_retries(2));
        let mut op: Operation<u32> = Operation::new(|| async {
            let timeout = ResilienceError::Timeout {
                timeout_ms: 5,
                operation: "inner".to_string(),
            };
            Err::<u32, _>(Box::new(timeout) as crate::operation::BoxError)
        });

        let err = policy.execute(&mut op, &ctx()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_attempt_counter_incremented_per_retry() {
        let policy = RetryPolicy::new(fast().with_max_retries(3));
        let mut op: Operation<u32> =
            Operation::new(|| async { Err::<u32, _>("down".to_string()) });

        let context = ctx();
        let _ = policy.execute(&mut op, &context).await;
        assert_eq!(context.attempts(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_retrying() {
        let policy = RetryPolicy::new(fast().with_max_retries(10));
        let calls = Arc::new(AtomicU32::new(0));
        let probe = calls.clone();
        let context = ctx();
        context.mark_cancelled();

        let mut op = Operation::new(move || {
            let calls = probe.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("down".to_string())
            }
        });

        let err = policy.execute(&mut op, &context).await.unwrap_err();
        assert!(matches!(err, ResilienceError::Operation { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_backoff_wait_between_retries() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_retries(2)
                .with_backoff_base_ms(10),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let probe = calls.clone();
        let mut op = Operation::new(move || {
            let calls = probe.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            }
        });

        let start = tokio::time::Instant::now();
        let result = policy.execute(&mut op, &ctx()).await;
        let elapsed = start.elapsed();

        assert_eq!(result.ok(), Some(3));
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(30));
    }
}
