//! Error types for the resilience pipeline.
//!
//! Every failure in this crate is a returned [`ResilienceError`]; nothing in
//! the pipeline is fatal to the process. Operation panics are captured by the
//! timeout guard's task boundary and surfaced as [`ResilienceError::Panicked`].

use thiserror::Error;

use crate::operation::BoxError;

/// The error type produced by every middleware stage and by the pipeline.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The operation did not settle before the configured deadline.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that elapsed, in milliseconds.
        timeout_ms: u64,
        /// The operation name from the execution context.
        operation: String,
    },

    /// The wrapped operation itself failed; the original cause is attached.
    #[error("operation failed: {source}")]
    Operation {
        /// The operation's own error, unmodified.
        #[source]
        source: BoxError,
    },

    /// The fallback supplier failed while producing a substitute result.
    #[error("fallback supplier failed: {source}")]
    Fallback {
        /// The supplier's error.
        #[source]
        source: BoxError,
    },

    /// The operation's task panicked.
    #[error("operation '{operation}' panicked: {message}")]
    Panicked {
        /// The operation name from the execution context.
        operation: String,
        /// The panic payload, stringified when possible.
        message: String,
    },

    /// The execution context was cancelled between attempts.
    #[error("operation '{operation}' cancelled")]
    Cancelled {
        /// The operation name from the execution context.
        operation: String,
    },
}

impl ResilienceError {
    /// Recovers a `ResilienceError` that crossed the boxed operation
    /// boundary, so that failure kinds survive middleware layering.
    ///
    /// Errors raised by an inner stage travel through [`crate::Operation`]
    /// futures as [`BoxError`]; downcasting restores them unchanged. Anything
    /// else is the operation's own failure and is wrapped with its cause
    /// attached.
    #[must_use]
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<Self>() {
            Ok(resilience) => *resilience,
            Err(other) => Self::Operation { source: other },
        }
    }

    /// Returns true if this is a deadline failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the fallback supplier failed.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Returns the underlying cause for operation and fallback failures.
    #[must_use]
    pub fn cause(&self) -> Option<&BoxError> {
        match self {
            Self::Operation { source } | Self::Fallback { source } => Some(source),
            _ => None,
        }
    }
}
