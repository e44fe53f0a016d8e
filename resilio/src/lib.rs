//! # Resilio
//!
//! Composable resilience middleware for unreliable asynchronous operations.
//!
//! Resilio wraps a caller-supplied operation (a network call, a device read)
//! in a fixed-order chain of middleware stages:
//!
//! - **Timeout enforcement**: each attempt races a deadline
//! - **Retry with backoff**: failing attempts are re-invoked up to a bound
//! - **Fallback substitution**: terminal failure yields a configured
//!   substitute instead of an error
//!
//! The composition order is always `Fallback(Retry(Timeout(operation)))`:
//! every retry is individually time-bounded, and the fallback engages only
//! once retries are exhausted. Any stage may be omitted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resilio::prelude::*;
//!
//! let pipeline = Pipeline::builder()
//!     .with_timeout_ms(500)
//!     .with_retry(RetryConfig::new().with_max_retries(2).with_backoff_base_ms(50))
//!     .with_fallback_value(Vitals::default())
//!     .build();
//!
//! let ctx = Arc::new(ExecutionContext::new("fetch_vitals"));
//! let vitals = pipeline
//!     .execute(Operation::new(|| client.fetch_vitals()), &ctx)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod errors;
pub mod events;
pub mod middleware;
pub mod operation;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::ExecutionContext;
    pub use crate::errors::ResilienceError;
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::middleware::{
        BackoffStrategy, FallbackStrategy, JitterStrategy, Middleware,
        RetryConfig, RetryPolicy, TimeoutConfig, TimeoutGuard,
    };
    pub use crate::operation::{BoxError, Operation, OperationFuture};
    pub use crate::pipeline::{Pipeline, PipelineBuilder};
}

pub use context::ExecutionContext;
pub use errors::ResilienceError;
pub use operation::{BoxError, Operation};
pub use pipeline::{Pipeline, PipelineBuilder};
