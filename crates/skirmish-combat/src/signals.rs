//! Hit signal bus.
//!
//! Contact emitters publish hit signals for feedback layers (audio,
//! particles, UI) without knowing their consumers. Signals carry no
//! resolution semantics: dropping one loses feedback, never damage.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use skirmish_common::EntityId;

/// Signals published by contact emitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSignal {
    /// A damageable target was hit.
    Damageable(EntityId),
    /// A non-damageable candidate was hit.
    NonDamageable(EntityId),
    /// Anything qualifying was hit (fires alongside the two above).
    Anything(EntityId),
}

impl HitSignal {
    /// Entity reference carried by the signal.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Damageable(id) | Self::NonDamageable(id) | Self::Anything(id) => *id,
        }
    }
}

/// Bus for broadcasting hit signals to subscribers.
#[derive(Debug)]
pub struct SignalBus {
    /// Sender for publishing signals
    sender: Sender<HitSignal>,
    /// Receiver for collecting signals
    receiver: Receiver<HitSignal>,
    /// Channel capacity
    capacity: usize,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl SignalBus {
    /// Creates a new bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes a signal. Non-blocking: a full bus drops the signal.
    pub fn publish(&self, signal: HitSignal) {
        let _ = self.sender.try_send(signal);
    }

    /// Drains all pending signals.
    pub fn drain(&self) -> Vec<HitSignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = self.receiver.try_recv() {
            signals.push(signal);
        }
        signals
    }

    /// Returns the number of pending signals.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing signals.
    #[must_use]
    pub fn sender(&self) -> Sender<HitSignal> {
        self.sender.clone()
    }
}
