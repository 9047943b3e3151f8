use crate::domain::events::LedgerEvent;
use crate::domain::ports::EventSink;
use tokio::sync::broadcast;

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: LedgerEvent) {}
}

/// Fans events out to any number of subscribers over a bounded broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; publishing never blocks.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<LedgerEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: LedgerEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}
