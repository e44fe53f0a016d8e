//! Builder for assembling a [`Pipeline`] from optional stage configs.

use super::Pipeline;
use crate::middleware::{
    FallbackStrategy, RetryConfig, RetryPolicy, TimeoutConfig, TimeoutGuard,
};

/// Configures which stages a [`Pipeline`] carries.
///
/// Every stage is optional; an omitted stage is simply absent from the chain.
/// The composition order itself is fixed and not configurable.
pub struct PipelineBuilder<T> {
    timeout: Option<TimeoutConfig>,
    retry: Option<RetryConfig>,
    fallback: Option<FallbackStrategy<T>>,
}

impl<T> PipelineBuilder<T>
where
    T: Send + 'static,
{
    /// Creates a builder with no stages configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: None,
            retry: None,
            fallback: None,
        }
    }

    /// Enables the timeout stage.
    #[must_use]
    pub fn with_timeout(mut self, config: TimeoutConfig) -> Self {
        self.timeout = Some(config);
        self
    }

    /// Enables the timeout stage with a deadline in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(TimeoutConfig::new(timeout_ms))
    }

    /// Enables the retry stage.
    #[must_use]
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Enables the fallback stage.
    #[must_use]
    pub fn with_fallback(mut self, strategy: FallbackStrategy<T>) -> Self {
        self.fallback = Some(strategy);
        self
    }

    /// Enables the fallback stage with a fixed substitute value.
    #[must_use]
    pub fn with_fallback_value(self, value: T) -> Self
    where
        T: Clone + Sync,
    {
        self.with_fallback(FallbackStrategy::value(value))
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline<T> {
        Pipeline::from_stages(
            self.timeout.map(TimeoutGuard::new),
            self.retry.map(RetryPolicy::new),
            self.fallback,
        )
    }
}

impl<T> Default for PipelineBuilder<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
