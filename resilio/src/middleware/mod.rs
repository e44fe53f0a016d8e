//! Middleware stages: timeout enforcement, retry with backoff, and fallback
//! substitution.

mod fallback;
mod retry;
mod timeout;

pub use fallback::FallbackStrategy;
pub use retry::{BackoffStrategy, JitterStrategy, RetryConfig, RetryPolicy};
pub use timeout::{TimeoutConfig, TimeoutGuard};

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::errors::ResilienceError;
use crate::operation::Operation;

/// The shared capability every pipeline stage implements.
///
/// A middleware wraps the invocation of an operation: it may bound it,
/// re-invoke it, or substitute its result, but never mutates the operation
/// itself. Test doubles substitute for any stage by implementing the same
/// trait (see [`crate::testing::mocks::PassthroughMiddleware`]).
#[async_trait]
pub trait Middleware<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Runs the operation under this stage's policy.
    async fn execute(
        &self,
        operation: &mut Operation<T>,
        ctx: &ExecutionContext,
    ) -> Result<T, ResilienceError>;
}
