//! Deadline enforcement for a single operation attempt.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::Middleware;
use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::operation::Operation;
use async_trait::async_trait;

/// Configuration for the timeout guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Deadline for one attempt, in milliseconds.
    pub timeout_ms: u64,
}

impl TimeoutConfig {
    /// Creates a config with the given deadline.
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    /// Returns the deadline as a [`Duration`].
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Races an operation attempt against a deadline.
///
/// The attempt runs as a detached task: when the deadline elapses first, the
/// task is abandoned rather than aborted, and whatever it eventually produces
/// is discarded. Callers whose operations must stop early should observe
/// [`ExecutionContext::is_cancelled`] inside the operation itself.
#[derive(Debug, Clone)]
pub struct TimeoutGuard {
    config: TimeoutConfig,
}

impl TimeoutGuard {
    /// Creates a guard from a config.
    #[must_use]
    pub fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }

    /// Creates a guard with the given deadline in milliseconds.
    #[must_use]
    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::new(TimeoutConfig::new(timeout_ms))
    }

    /// Returns the configured deadline in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }

    fn timeout_error(&self, ctx: &ExecutionContext) -> ResilienceError {
        ctx.try_emit_event(
            "middleware.timeout",
            Some(serde_json::json!({ "timeout_ms": self.config.timeout_ms })),
        );
        warn!(
            operation = %ctx.operation_name(),
            timeout_ms = self.config.timeout_ms,
            "operation timed out"
        );
        ResilienceError::Timeout {
            timeout_ms: self.config.timeout_ms,
            operation: ctx.operation_name().to_string(),
        }
    }
}

#[async_trait]
impl<T> Middleware<T> for TimeoutGuard
where
    T: Send + 'static,
{
    async fn execute(
        &self,
        operation: &mut Operation<T>,
        ctx: &ExecutionContext,
    ) -> Result<T, ResilienceError> {
        // A zero deadline fails before the attempt's future is even built,
        // so no observable work starts.
        if self.config.timeout_ms == 0 {
            return Err(self.timeout_error(ctx));
        }

        let task = tokio::spawn(operation.invoke());
        match tokio::time::timeout(self.config.deadline(), task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(source))) => Err(ResilienceError::from_boxed(source)),
            Ok(Err(join_error)) => {
                if join_error.is_panic() {
                    let message = panic_message(join_error.into_panic());
                    Err(ResilienceError::Panicked {
                        operation: ctx.operation_name().to_string(),
                        message,
                    })
                } else {
                    Err(ResilienceError::Cancelled {
                        operation: ctx.operation_name().to_string(),
                    })
                }
            }
            // Dropping the join handle detaches the attempt; its eventual
            // result is discarded.
            Err(_elapsed) => Err(self.timeout_error(ctx)),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
