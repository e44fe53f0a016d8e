//! Per-call execution context threaded through every middleware layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::events::{get_event_sink, EventSink};

/// Caller-supplied metadata for one pipeline execution.
///
/// The context lives for the duration of a single
/// [`Pipeline::execute`](crate::pipeline::Pipeline::execute) call. Middleware
/// passes it through unchanged except for the attempt counter, which the
/// retry policy increments before each retry. Counters are never read across
/// concurrent executions; each call gets its own context.
pub struct ExecutionContext {
    /// Diagnostic label for the wrapped operation.
    operation_name: String,
    /// Correlation id for logs and events.
    execution_id: Uuid,
    /// Arbitrary caller-defined keys, immutable after construction.
    tags: HashMap<String, serde_json::Value>,
    /// Retries performed so far within this execution.
    attempts: AtomicU32,
    /// Cooperative cancellation flag.
    cancelled: AtomicBool,
    /// Event sink for middleware lifecycle events.
    event_sink: Arc<dyn EventSink>,
}

impl ExecutionContext {
    /// Creates a context for the named operation.
    #[must_use]
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            execution_id: Uuid::new_v4(),
            tags: HashMap::new(),
            attempts: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
            event_sink: get_event_sink(),
        }
    }

    /// Attaches a caller-defined tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.tags.insert(key.into(), value);
        self
    }

    /// Sets the event sink for this execution.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Returns the execution correlation id.
    #[must_use]
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Returns a caller-defined tag, if present.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&serde_json::Value> {
        self.tags.get(key)
    }

    /// Returns the number of retries performed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Records one retry. Called by the retry policy before each re-attempt.
    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks the context as cancelled.
    ///
    /// Cancellation is cooperative: the retry policy stops scheduling further
    /// attempts, and the caller's operation may observe the flag itself.
    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Emits a middleware event enriched with this context's identity.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert(
                "execution_id".to_string(),
                serde_json::json!(self.execution_id.to_string()),
            );
            map.insert(
                "operation".to_string(),
                serde_json::json!(&self.operation_name),
            );
            map.insert("attempts".to_string(), serde_json::json!(self.attempts()));
        }

        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;

    #[test]
    fn test_context_creation() {
        let ctx = ExecutionContext::new("fetch_vitals")
            .with_tag("patient_id", serde_json::json!("p-123"));

        assert_eq!(ctx.operation_name(), "fetch_vitals");
        assert_eq!(ctx.tag("patient_id"), Some(&serde_json::json!("p-123")));
        assert_eq!(ctx.attempts(), 0);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_attempt_counter_only_increases() {
        let ctx = ExecutionContext::new("op");
        ctx.record_attempt();
        ctx.record_attempt();
        assert_eq!(ctx.attempts(), 2);
    }

    #[test]
    fn test_cancellation() {
        let ctx = ExecutionContext::new("op");
        ctx.mark_cancelled();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_events_carry_context_identity() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = ExecutionContext::new("sync_records").with_event_sink(sink.clone());
        ctx.record_attempt();

        ctx.try_emit_event("middleware.retry_scheduled", Some(serde_json::json!({"delay_ms": 10})));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let data = events[0].1.as_ref().unwrap();
        assert_eq!(data["operation"], "sync_records");
        assert_eq!(data["attempts"], 1);
        assert_eq!(data["delay_ms"], 10);
        assert!(data["execution_id"].is_string());
    }

    #[test]
    fn test_distinct_execution_ids() {
        let a = ExecutionContext::new("op");
        let b = ExecutionContext::new("op");
        assert_ne!(a.execution_id(), b.execution_id());
    }
}
