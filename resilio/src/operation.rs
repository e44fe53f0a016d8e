//! The caller-supplied unit of asynchronous work.
//!
//! An [`Operation`] is a zero-argument factory producing one future per
//! attempt. The pipeline never mutates the underlying work; middleware only
//! wraps its invocation, and retrying means asking the factory for a fresh
//! future.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::middleware::Middleware;

/// Boxed error type carried by operation futures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The future produced by one invocation of an [`Operation`].
pub type OperationFuture<T> = BoxFuture<'static, Result<T, BoxError>>;

fn boxed<T, Fut>(fut: Fut) -> OperationFuture<T>
where
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    Box::pin(fut)
}

/// A retryable asynchronous operation yielding `T`.
///
/// Constructed from any `FnMut` closure returning a future:
///
/// ```rust,ignore
/// let op = Operation::new(|| async { client.fetch_vitals().await });
/// ```
pub struct Operation<T> {
    factory: Box<dyn FnMut() -> OperationFuture<T> + Send>,
}

impl<T> Operation<T>
where
    T: Send + 'static,
{
    /// Creates an operation from an async factory closure.
    ///
    /// The closure is invoked once per attempt; each call must produce an
    /// independent future. Idempotence of the underlying work under retry is
    /// the caller's responsibility.
    pub fn new<F, Fut, E>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            factory: Box::new(move || {
                let fut = f();
                boxed(async move { fut.await.map_err(Into::into) })
            }),
        }
    }

    /// Invokes the operation, producing the future for one attempt.
    pub fn invoke(&mut self) -> OperationFuture<T> {
        (self.factory)()
    }

    /// Wraps this operation with a middleware stage, producing a new
    /// operation whose every invocation runs the stage around the inner one.
    ///
    /// This is the composition primitive the pipeline is built from; it is
    /// public so callers can layer custom [`Middleware`] implementations the
    /// same way.
    #[must_use]
    pub fn wrapped(
        middleware: Arc<dyn Middleware<T>>,
        inner: Self,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        let inner = Arc::new(tokio::sync::Mutex::new(inner));
        Self {
            factory: Box::new(move || {
                let middleware = Arc::clone(&middleware);
                let inner = Arc::clone(&inner);
                let ctx = Arc::clone(&ctx);
                boxed(async move {
                    let mut operation = inner.lock().await;
                    middleware
                        .execute(&mut operation, &ctx)
                        .await
                        .map_err(|err| Box::new(err) as BoxError)
                })
            }),
        }
    }
}
