//! Port for the turn event stream.
//!
//! The transport layer consumes [`TurnEvent`]s one per line. `emit` is
//! synchronous and non-fallible so a slow or broken consumer never stalls
//! a phase; sinks drop what they cannot deliver.

use conductor_domain::TurnEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

pub trait TurnEventSink: Send + Sync {
    fn emit(&self, event: TurnEvent);
}

/// No-op sink for tests and headless runs.
pub struct NoEventSink;

impl TurnEventSink for NoEventSink {
    fn emit(&self, _event: TurnEvent) {}
}

/// Forwards events to an unbounded channel.
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<TurnEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl TurnEventSink for ChannelEventSink {
    fn emit(&self, event: TurnEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Delivers every event to each inner sink in order.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn TurnEventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Arc<dyn TurnEventSink>>) -> Self {
        Self { sinks }
    }
}

impl TurnEventSink for CompositeEventSink {
    fn emit(&self, event: TurnEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
