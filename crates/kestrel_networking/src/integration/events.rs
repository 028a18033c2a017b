//! # Cosmetic Event Channel
//!
//! How notifications leave the core for the presentation layer.
//!
//! ```text
//! ScalarReplicator ──ValueChanged──┐
//! Health ─────────HealthChanged────┤
//! AmmoLedger ─────AmmoChanged──────┼──> EventChannel ──> HUD / particles
//! ProjectilePool ─Rocket*──────────┤
//! Reconciliation ─CorrectionApplied┘
//! ```
//!
//! The channel is bounded. Once it is full, new events are dropped until the
//! presentation layer drains it; the simulation never waits on presentation.

use kestrel_shared::CosmeticEvent;

/// Default capacity of a peer's cosmetic channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Channel for sending events between systems.
#[derive(Clone, Debug)]
pub struct EventChannel<T> {
    sender: crossbeam_channel::Sender<T>,
    receiver: crossbeam_channel::Receiver<T>,
}

impl<T> EventChannel<T> {
    /// Creates a new bounded event channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Publishes an event without blocking. Returns false if it was dropped.
    pub fn emit(&self, event: T) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::trace!("event channel full, dropping event");
                false
            }
        }
    }

    /// Tries to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drains every pending event.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Gets a clone of the receiver for another consumer.
    #[must_use]
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.receiver.clone()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Channel of presentation-layer notifications.
pub type CosmeticChannel = EventChannel<CosmeticEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_shared::EntityId;

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let channel = EventChannel::new(2);
        assert!(channel.emit(1));
        assert!(channel.emit(2));
        assert!(!channel.emit(3));
        assert_eq!(channel.drain(), vec![1, 2]);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_cosmetic_events_flow() {
        let channel = CosmeticChannel::default();
        channel.emit(CosmeticEvent::AmmoChanged {
            entity: EntityId(4),
            count: 3,
        });
        let events = channel.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity(), EntityId(4));
    }
}
