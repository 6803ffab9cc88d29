//! Kill volumes.
//!
//! A kill volume is a degenerate emitter: qualifying contact defeats the
//! target outright. No randomization, no direction, no invincibility, no
//! knockback, no repeats.

use tracing::debug;

use skirmish_common::CategoryMask;

use crate::contact::{ContactEvent, ContactKinds};
use crate::emitter::ContactStore;

/// Instantly defeats qualifying targets on contact.
#[derive(Debug, Clone)]
pub struct KillVolume {
    /// Categories a candidate must intersect to qualify.
    pub target_filter: CategoryMask,
    /// Notification kinds this volume evaluates.
    pub subscriptions: ContactKinds,
    enabled: bool,
}

impl Default for KillVolume {
    fn default() -> Self {
        Self::new(CategoryMask::all())
    }
}

impl KillVolume {
    /// Creates a kill volume for the given categories.
    #[must_use]
    pub fn new(target_filter: CategoryMask) -> Self {
        Self {
            target_filter,
            subscriptions: ContactKinds::all(),
            enabled: true,
        }
    }

    /// Sets the notification kinds this volume evaluates.
    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: ContactKinds) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Returns whether the volume evaluates contacts.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the volume.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Evaluates one overlap notification.
    ///
    /// Returns whether the contact defeated the target. A defeated or
    /// non-damageable candidate is a no-op, making repeat contacts
    /// idempotent.
    pub fn evaluate_contact<S: ContactStore>(&self, event: &ContactEvent, store: &mut S) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.subscriptions.contains(event.kind.flag()) {
            return false;
        }
        if !store
            .categories(event.candidate)
            .intersects(self.target_filter)
        {
            return false;
        }

        match store.vitality_mut(event.candidate) {
            Some(vitality) if !vitality.is_defeated() => {
                vitality.defeat();
                debug!(target = ?event.candidate, "kill volume defeated target");
                true
            }
            _ => false,
        }
    }
}
