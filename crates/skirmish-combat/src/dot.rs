//! Damage-over-time handoff and scheduling.
//!
//! An emitter's only obligation to a damage-over-time sequence is to supply
//! one complete, self-consistent parameter set ([`DotHandoff`]) at the first
//! hit. From then on the sequence belongs to the target side: a
//! [`DotScheduler`] (an arena of timers keyed by target id, ticked by the
//! simulation) produces the repeats. The emitter may be deactivated or
//! destroyed while a sequence it initiated continues.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use skirmish_common::EntityId;

use crate::damageable::DamageType;
use crate::profile::DamageProfile;

/// Complete parameter set handed to a damage-over-time acceptor.
///
/// Carries owned copies of everything the sequence needs (notably the
/// profile list), never references back into the emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotHandoff {
    /// Damage applied by each repeat, pre-modifier.
    pub tick_amount: f32,
    /// Entity that initiated the sequence, if still known.
    pub source: Option<EntityId>,
    /// Invincibility window opened by the first application.
    pub initial_invincibility: f32,
    /// Invincibility window opened by each subsequent application.
    pub tick_invincibility: f32,
    /// Damage direction recorded at the initiating hit.
    pub direction: Vec3,
    /// Profiles carried by the initiating hit (owned copy).
    pub profiles: Vec<DamageProfile>,
    /// Total number of applications, the immediate first one included.
    pub repeat_count: u32,
    /// Seconds between applications.
    pub interval: f32,
    /// Whether the target may cancel the remaining repeats.
    pub interruptible: bool,
    /// Damage type carried by the repeats.
    pub repeated_type: DamageType,
}

/// One pending damage application produced by the scheduler.
///
/// The caller applies it through [`crate::damageable::Vitality::apply_repeat`].
#[derive(Debug, Clone, PartialEq)]
pub struct DotApplication {
    /// Target to damage.
    pub target: EntityId,
    /// Pre-modifier damage amount.
    pub amount: f32,
    /// Initiating entity, if still known.
    pub source: Option<EntityId>,
    /// Invincibility window to open.
    pub invincibility: f32,
    /// Damage direction.
    pub direction: Vec3,
    /// Damage type of this application.
    pub damage_type: DamageType,
    /// Profiles whose conditions re-apply with this application.
    pub profiles: Vec<DamageProfile>,
}

/// A running sequence on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ActiveDot {
    handoff: DotHandoff,
    /// Applications still owed after the immediate first one.
    remaining: u32,
    /// Seconds until the next application.
    until_next: f32,
}

/// Arena of damage-over-time timers, keyed by target id.
///
/// Owned by the target side of the simulation and ticked once per step.
/// Accepting a new sequence for a target replaces any running one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DotScheduler {
    active: HashMap<EntityId, ActiveDot>,
}

impl DotScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a sequence for a target and returns the immediate first
    /// application.
    ///
    /// The first application uses the initial invincibility window; the
    /// `repeat_count - 1` remaining ones fire from [`DotScheduler::tick`]
    /// spaced `interval` apart with the tick invincibility window. The
    /// `interruptible` flag is latched here and never re-checked.
    pub fn accept(&mut self, target: EntityId, handoff: DotHandoff) -> DotApplication {
        let initial = DotApplication {
            target,
            amount: handoff.tick_amount,
            source: handoff.source,
            invincibility: handoff.initial_invincibility,
            direction: handoff.direction,
            damage_type: handoff.repeated_type,
            profiles: handoff.profiles.clone(),
        };

        let remaining = handoff.repeat_count.max(1) - 1;
        if remaining > 0 {
            debug!(?target, remaining, interval = handoff.interval, "damage-over-time accepted");
            let until_next = handoff.interval;
            self.active.insert(
                target,
                ActiveDot {
                    handoff,
                    remaining,
                    until_next,
                },
            );
        } else {
            self.active.remove(&target);
        }

        initial
    }

    /// Advances all timers, returning the applications that came due.
    pub fn tick(&mut self, dt: f32) -> Vec<DotApplication> {
        let mut due = Vec::new();

        for (target, dot) in &mut self.active {
            dot.until_next -= dt;
            while dot.until_next <= 0.0 && dot.remaining > 0 {
                due.push(DotApplication {
                    target: *target,
                    amount: dot.handoff.tick_amount,
                    source: dot.handoff.source,
                    invincibility: dot.handoff.tick_invincibility,
                    direction: dot.handoff.direction,
                    damage_type: dot.handoff.repeated_type,
                    profiles: dot.handoff.profiles.clone(),
                });
                dot.remaining -= 1;
                dot.until_next += dot.handoff.interval;
            }
        }

        self.active.retain(|_, dot| dot.remaining > 0);
        due
    }

    /// Cancels the remaining repeats on a target.
    ///
    /// Succeeds only when the sequence was accepted as interruptible;
    /// returns whether anything was cancelled.
    pub fn cancel(&mut self, target: EntityId) -> bool {
        match self.active.get(&target) {
            Some(dot) if dot.handoff.interruptible => {
                self.active.remove(&target);
                true
            }
            _ => false,
        }
    }

    /// Returns whether a sequence is running on a target.
    #[must_use]
    pub fn is_active(&self, target: EntityId) -> bool {
        self.active.contains_key(&target)
    }

    /// Number of running sequences.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
