//! Damage profiles and ranged damage sampling.
//!
//! This module provides:
//! - `DamageRange`: a min/max damage band with misconfiguration tolerance
//! - `DamageProfile`: a typed damage entry with optional condition effects
//! - Per-tick sample memoization so one logical step never re-rolls

use serde::{Deserialize, Serialize};

use crate::damageable::DamageType;

/// A min/max damage band sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRange {
    /// Lower bound of the band.
    pub min: f32,
    /// Upper bound of the band.
    pub max: f32,
}

impl DamageRange {
    /// Creates a new damage range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Creates a fixed-value range.
    #[must_use]
    pub const fn flat(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Returns whether the bounds are inverted (`min > max`).
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }

    /// Samples a value uniformly from the band.
    ///
    /// Inverted bounds are tolerated by sampling from the widened band
    /// `[min(min,max), max(min,max)]` rather than erroring; a misconfigured
    /// range costs a hit its intended distribution, never the frame.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f32 {
        let lo = self.min.min(self.max);
        let hi = self.min.max(self.max);
        if hi - lo <= f32::EPSILON {
            return lo;
        }
        lo + rng.f32() * (hi - lo)
    }
}

impl Default for DamageRange {
    fn default() -> Self {
        Self::new(10.0, 10.0)
    }
}

/// A typed damage entry layered on top of an emitter's base range.
///
/// All profile entries on an emitter are summed with the base sample when a
/// hit resolves. Entries may additionally force a stun and/or a movement
/// slow on the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageProfile {
    /// Damage type of this entry.
    pub damage_type: DamageType,
    /// Damage band contributed by this entry.
    pub range: DamageRange,
    /// Whether a hit forces a stun on the target.
    pub applies_stun: bool,
    /// Stun duration in seconds.
    pub stun_duration: f32,
    /// Whether a hit slows the target's movement.
    pub applies_slow: bool,
    /// Movement multiplier while slowed (1.0 = unaffected).
    pub slow_multiplier: f32,
    /// Slow duration in seconds.
    pub slow_duration: f32,
    /// Sample memoized for the current tick (tick index, value).
    #[serde(skip)]
    cached: Option<(u64, f32)>,
}

impl DamageProfile {
    /// Creates a new profile with no condition effects.
    #[must_use]
    pub fn new(damage_type: DamageType, min: f32, max: f32) -> Self {
        Self {
            damage_type,
            range: DamageRange::new(min, max),
            applies_stun: false,
            stun_duration: 0.0,
            applies_slow: false,
            slow_multiplier: 1.0,
            slow_duration: 0.0,
            cached: None,
        }
    }

    /// Makes hits with this profile force a stun.
    #[must_use]
    pub fn with_stun(mut self, duration: f32) -> Self {
        self.applies_stun = true;
        self.stun_duration = duration.max(0.0);
        self
    }

    /// Makes hits with this profile slow the target.
    #[must_use]
    pub fn with_slow(mut self, multiplier: f32, duration: f32) -> Self {
        self.applies_slow = true;
        self.slow_multiplier = multiplier.max(0.0);
        self.slow_duration = duration.max(0.0);
        self
    }

    /// Samples this entry's damage contribution for the given tick.
    ///
    /// The sampled value is stable for the duration of one tick: repeated
    /// calls with the same tick index return the memoized value, and a new
    /// tick index invalidates it. This keeps every resolution within a
    /// single logical step consistent.
    pub fn sample(&mut self, tick: u64, rng: &mut fastrand::Rng) -> f32 {
        if let Some((cached_tick, value)) = self.cached {
            if cached_tick == tick {
                return value;
            }
        }
        let value = self.range.sample(rng);
        self.cached = Some((tick, value));
        value
    }

    /// Returns whether this entry carries any condition effect.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        self.applies_stun || self.applies_slow
    }
}
