//! Logging infrastructure: the machine-readable event transcript.
//!
//! Provides [`JsonlEventSink`], a JSONL file writer that implements the
//! [`TurnEventSink`](conductor_application::TurnEventSink) port. Diagnostic
//! logs go through `tracing` and are configured by the binary.

mod jsonl_event_sink;

pub use jsonl_event_sink::JsonlEventSink;
