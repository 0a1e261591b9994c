//! Change broadcast for in-process consumers
//!
//! Two signals:
//! - `ShortcutsChanged` carries the full collection after a successful save
//! - `UsageUpdated` carries nothing; stats views re-derive what they need

use tokio::sync::broadcast;
use tracing::trace;

use crate::config::DEFAULT_BROADCAST_CAPACITY;
use crate::shortcuts::Shortcut;

#[derive(Debug, Clone, PartialEq)]
pub enum ShortcutEvent {
    ShortcutsChanged(Vec<Shortcut>),
    UsageUpdated,
}

impl ShortcutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ShortcutEvent::ShortcutsChanged(_) => "shortcuts-changed",
            ShortcutEvent::UsageUpdated => "usage-updated",
        }
    }
}

/// Broadcast bus shared by the store, the aggregator and the UI.
#[derive(Debug, Clone)]
pub struct ChangeBroadcast {
    sender: broadcast::Sender<ShortcutEvent>,
}

impl ChangeBroadcast {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShortcutEvent> {
        self.sender.subscribe()
    }

    pub fn shortcuts_changed(&self, shortcuts: Vec<Shortcut>) {
        self.emit(ShortcutEvent::ShortcutsChanged(shortcuts));
    }

    pub fn usage_updated(&self) {
        self.emit(ShortcutEvent::UsageUpdated);
    }

    fn emit(&self, event: ShortcutEvent) {
        trace!(event = event.name(), "Emitting shortcut event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = ChangeBroadcast::new();
        bus.usage_updated();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribers_see_events_in_order() {
        let bus = ChangeBroadcast::new();
        let mut rx = bus.subscribe();

        bus.shortcuts_changed(Vec::new());
        bus.usage_updated();

        assert_eq!(rx.try_recv().unwrap(), ShortcutEvent::ShortcutsChanged(Vec::new()));
        assert_eq!(rx.try_recv().unwrap().name(), "usage-updated");
    }
}
