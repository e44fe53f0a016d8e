//! Mock operations and middleware for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::middleware::{FallbackStrategy, Middleware};
use crate::operation::{BoxError, Operation};

/// Builds operations that fail a fixed number of times before succeeding,
/// recording every invocation.
#[derive(Debug, Default)]
pub struct FlakyOperation {
    failures_before_success: u32,
    calls: Arc<AtomicU32>,
}

impl FlakyOperation {
    /// Creates a flaky operation that fails the given number of times.
    /// Zero means it succeeds on the first invocation.
    #[must_use]
    pub fn new(failures_before_success: u32) -> Self {
        Self {
            failures_before_success,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns the number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Produces the operation, yielding `success_value` once the configured
    /// failures are spent.
    #[must_use]
    pub fn operation<T>(&self, success_value: T) -> Operation<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let calls = Arc::clone(&self.calls);
        let failures = self.failures_before_success;
        Operation::new(move || {
            let calls = Arc::clone(&calls);
            let value = success_value.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(BoxError::from(format!("transient failure {n}")))
                } else {
                    Ok(value)
                }
            }
        })
    }
}

/// Returns an operation that always fails with the given message.
#[must_use]
pub fn failing_operation<T>(message: &str) -> Operation<T>
where
    T: Send + 'static,
{
    let message = message.to_string();
    Operation::new(move || {
        let message = message.clone();
        async move { Err::<T, _>(BoxError::from(message)) }
    })
}

/// Returns an operation whose futures never settle.
#[must_use]
pub fn never_completes<T>() -> Operation<T>
where
    T: Send + 'static,
{
    Operation::new(|| std::future::pending::<Result<T, BoxError>>())
}

/// Returns an operation that settles with `value` after `delay_ms`.
#[must_use]
pub fn slow_operation<T>(delay_ms: u64, value: T) -> Operation<T>
where
    T: Clone + Send + Sync + 'static,
{
    Operation::new(move || {
        let value = value.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, BoxError>(value)
        }
    })
}

/// Identity middleware: invokes the operation and passes its result through
/// untouched. Substitutable for any pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMiddleware;

#[async_trait]
impl<T> Middleware<T> for PassthroughMiddleware
where
    T: Send + 'static,
{
    async fn execute(
        &self,
        operation: &mut Operation<T>,
        _ctx: &ExecutionContext,
    ) -> Result<T, ResilienceError> {
        operation.invoke().await.map_err(ResilienceError::from_boxed)
    }
}

/// Builds fallback strategies whose supplier invocations are counted.
#[derive(Debug, Default)]
pub struct CountingFallback {
    calls: Arc<AtomicU32>,
}

impl CountingFallback {
    /// Creates a new counting fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of supplier invocations so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Produces a strategy supplying the given value.
    #[must_use]
    pub fn supplying<T>(&self, value: T) -> FallbackStrategy<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let calls = Arc::clone(&self.calls);
        FallbackStrategy::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        })
    }
}
