//! Fallback substitution on terminal failure.

use tracing::warn;

use super::Middleware;
use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::operation::{BoxError, Operation};
use async_trait::async_trait;

/// Supplies a substitute result when the wrapped chain has terminally failed.
///
/// Fallback is unconditional on any failure: the strategy never inspects the
/// failure kind, so a configured supplier guarantees a result unless the
/// supplier itself fails.
pub struct FallbackStrategy<T> {
    supplier: Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>,
}

impl<T> FallbackStrategy<T>
where
    T: Send + 'static,
{
    /// Creates a strategy from a supplier closure.
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(supplier),
        }
    }

    /// Creates a strategy that substitutes a fixed value.
    pub fn value(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move || Ok(value.clone()))
    }
}

#[async_trait]
impl<T> Middleware<T> for FallbackStrategy<T>
where
    T: Send + 'static,
{
    async fn execute(
        &self,
        operation: &mut Operation<T>,
        ctx: &ExecutionContext,
    ) -> Result<T, ResilienceError> {
        match operation.invoke().await {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = ResilienceError::from_boxed(err);
                ctx.try_emit_event(
                    "middleware.fallback_engaged",
                    Some(serde_json::json!({ "error": err.to_string() })),
                );
                warn!(
                    operation = %ctx.operation_name(),
                    error = %err,
                    "substituting fallback result"
                );
                match (self.supplier)() {
                    Ok(substitute) => Ok(substitute),
                    Err(source) => Err(ResilienceError::Fallback { source }),
                }
            }
        }
    }
}
