//! The middleware pipeline: fixed-order composition of timeout, retry, and
//! fallback around a caller-supplied operation.
//!
//! Composition order is `Fallback(Retry(Timeout(operation)))` and is load
//! bearing: each retry attempt is individually time-bounded (timeout
//! innermost), and a substitute result is produced only after retries are
//! exhausted (fallback outermost). Omitted stages drop out of the chain
//! without affecting the rest.

mod builder;

pub use builder::PipelineBuilder;


use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::middleware::{FallbackStrategy, Middleware, RetryPolicy, TimeoutGuard};
use crate::operation::Operation;

/// An immutable, reusable resilience pipeline for operations yielding `T`.
///
/// The pipeline is stateless across calls: every [`execute`](Self::execute)
/// builds a fresh composed chain from the configs captured at construction.
/// Concurrent executions share nothing but those immutable configs.
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .with_timeout_ms(500)
///     .with_retry(RetryConfig::new().with_max_retries(2).with_backoff_base_ms(50))
///     .with_fallback_value(Vitals::default())
///     .build();
///
/// let ctx = Arc::new(ExecutionContext::new("fetch_vitals"));
/// let vitals = pipeline.execute(Operation::new(|| fetch()), &ctx).await?;
/// ```
pub struct Pipeline<T> {
    timeout: Option<Arc<TimeoutGuard>>,
    retry: Option<Arc<RetryPolicy>>,
    fallback: Option<Arc<FallbackStrategy<T>>>,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// Returns a builder for configuring a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder::new()
    }

    pub(crate) fn from_stages(
        timeout: Option<TimeoutGuard>,
        retry: Option<RetryPolicy>,
        fallback: Option<FallbackStrategy<T>>,
    ) -> Self {
        Self {
            timeout: timeout.map(Arc::new),
            retry: retry.map(Arc::new),
            fallback: fallback.map(Arc::new),
        }
    }

    /// Returns true if a timeout stage is configured.
    #[must_use]
    pub fn has_timeout(&self) -> bool {
        self.timeout.is_some()
    }

    /// Returns true if a retry stage is configured.
    #[must_use]
    pub fn has_retry(&self) -> bool {
        self.retry.is_some()
    }

    /// Returns true if a fallback stage is configured.
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Runs the operation through the composed chain.
    ///
    /// Returns the operation's value, the fallback substitute on terminal
    /// failure (when configured), or the terminal [`ResilienceError`].
    pub async fn execute(
        &self,
        operation: Operation<T>,
        ctx: &Arc<ExecutionContext>,
    ) -> Result<T, ResilienceError> {
        let mut chain = operation;
        if let Some(guard) = &self.timeout {
            chain = Operation::wrapped(
                Arc::clone(guard) as Arc<dyn Middleware<T>>,
                chain,
                Arc::clone(ctx),
            );
        }
        if let Some(policy) = &self.retry {
            chain = Operation::wrapped(
                Arc::clone(policy) as Arc<dyn Middleware<T>>,
                chain,
                Arc::clone(ctx),
            );
        }
        if let Some(strategy) = &self.fallback {
            chain = Operation::wrapped(
                Arc::clone(strategy) as Arc<dyn Middleware<T>>,
                chain,
                Arc::clone(ctx),
            );
        }

        chain.invoke().await.map_err(ResilienceError::from_boxed)
    }
}
