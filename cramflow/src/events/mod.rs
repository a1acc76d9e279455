//! Lifecycle events for observability.
//!
//! The stage driver and job monitor report what they are doing through an
//! [`EventSink`]. The default sink forwards everything to `tracing`; tests use
//! [`CollectingEventSink`] to assert on the sequence of events.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};
