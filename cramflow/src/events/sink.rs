//! Sinks for pipeline lifecycle events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Receives lifecycle events from the driver, monitor and pipeline.
///
/// `event_type` is a dotted name such as `stage.checkpointed` or
/// `job.failed`; `data` carries the stage, job key or counts involved.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event.
    async fn emit(&self, event_type: &str, data: Option<Value>);

    /// Delivers an event from synchronous code. Must not block or fail.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Forwards events to `tracing`.
///
/// Failure events (`*.failed`) are always logged at `WARN`. Everything else
/// goes out at the configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Logs routine events at `level`. Only `INFO` and `DEBUG` are distinguished.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    fn record(&self, event_type: &str, data: Option<&Value>) {
        let data = data.map(Value::to_string).unwrap_or_default();
        if event_type.ends_with(".failed") {
            warn!(event = event_type, %data, "Pipeline event");
        } else if self.level == Level::INFO {
            info!(event = event_type, %data, "Pipeline event");
        } else {
            debug!(event = event_type, %data, "Pipeline event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data.as_ref());
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Dotted event name.
    pub event_type: String,
    /// Payload, if any.
    pub data: Option<Value>,
    /// When the sink received it.
    pub received_at: DateTime<Utc>,
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event_type: &str, data: Option<Value>) {
        self.recorded.lock().push(RecordedEvent {
            event_type: event_type.to_owned(),
            data,
            received_at: Utc::now(),
        });
    }

    /// Snapshot of everything received so far.
    #[must_use]
    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.recorded.lock().clone()
    }

    /// Event names in arrival order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// Events whose name starts with `prefix`, so `"job."` matches both
    /// `job.succeeded` and `job.failed`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.recorded
            .lock()
            .iter()
            .filter(|e| e.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.recorded.lock().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_logging_sink_accepts_every_family() {
        NoOpEventSink.emit("stage.started", None).await;
        let sink = LoggingEventSink::new(Level::INFO);
        sink.emit("stage.started", Some(json!({"stage": 0}))).await;
        sink.try_emit("job.failed", Some(json!({"key": "a.cram"})));
        LoggingEventSink::default().try_emit("monitor.waiting", None);
    }

    #[tokio::test]
    async fn test_collector_keeps_order_and_payloads() {
        let sink = CollectingEventSink::new();
        sink.emit("stage.started", Some(json!({"stage": 1}))).await;
        sink.try_emit("job.failed", Some(json!({"key": "a.cram"})));
        sink.emit("stage.checkpointed", None).await;

        assert_eq!(
            sink.event_types(),
            vec!["stage.started", "job.failed", "stage.checkpointed"]
        );
        assert_eq!(sink.events_of_type("stage.").len(), 2);

        let failed = sink.events_of_type("job.");
        assert_eq!(failed[0].data, Some(json!({"key": "a.cram"})));

        let recorded = sink.recorded();
        assert!(recorded[0].received_at <= recorded[2].received_at);

        sink.clear();
        assert!(sink.recorded().is_empty());
    }
}
