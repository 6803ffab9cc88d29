//! Damageable entity state.
//!
//! This module provides:
//! - Damage types with per-type intake and knockback modifiers
//! - `Vitality`: current/max vitality, invincibility windows, defeat state
//! - Condition bookkeeping (stun, movement slow) applied by damage profiles
//!
//! A `Vitality` is consumed, not owned, by damage sources: emitters resolve
//! it through a capability store once per contact and never hold on to it.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use skirmish_common::EntityId;

use crate::profile::DamageProfile;

/// Type of damage dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Physical damage.
    Physical,
    /// Fire damage.
    Fire,
    /// Ice/cold damage.
    Ice,
    /// Electric/lightning damage.
    Electric,
    /// Poison damage.
    Poison,
    /// True damage (ignores per-type modifiers).
    True,
}

impl Default for DamageType {
    fn default() -> Self {
        Self::Physical
    }
}

impl DamageType {
    /// Check if damage of this type ignores per-type modifiers.
    #[must_use]
    pub fn is_true_damage(&self) -> bool {
        matches!(self, Self::True)
    }
}

/// Result of a damage-intake call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageOutcome {
    /// Vitality actually removed (post-modifier, clamped at zero vitality).
    pub applied: f32,
    /// Whether this intake defeated the target.
    pub defeated: bool,
}

/// An active movement slow on a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Movement multiplier while active (1.0 = unaffected).
    pub multiplier: f32,
    /// Seconds remaining.
    pub remaining: f32,
}

/// Vitality and damage-intake state for an entity.
///
/// Invariant: `current` stays in `[0, max]`. Once `current` reaches zero the
/// entity is defeated — a terminal, idempotent state that blocks all further
/// intake until an explicit [`Vitality::revive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitality {
    /// Current vitality.
    pub current: f32,
    /// Maximum vitality.
    pub max: f32,
    /// Blocks all intake and knockback while set.
    pub invulnerable: bool,
    /// Global knockback sensitivity (1.0 = configured force unchanged).
    pub knockback_multiplier: f32,
    /// Skip knockback entirely when the post-modifier damage output is zero.
    pub knockback_requires_damage: bool,
    /// Hitting this target does not recoil damage onto the attacker.
    pub suppresses_recoil: bool,
    /// Seconds left in the invincibility window opened by the last hit.
    pub invincibility_remaining: f32,
    /// Direction of the last hit taken (normalized).
    pub last_hit_direction: Vec3,
    /// Post-modifier amount of the last hit taken.
    pub last_hit_amount: f32,
    /// Per-type intake multipliers (absent = 1.0, 0.0 = immune).
    pub damage_modifiers: HashMap<DamageType, f32>,
    /// Per-type knockback force multipliers (absent = 1.0).
    pub knockback_modifiers: HashMap<DamageType, f32>,
    /// Damage types whose hits never knock this target back.
    pub knockback_immunities: HashSet<DamageType>,
    /// Seconds of forced stun remaining.
    pub stun_remaining: f32,
    /// Active movement slow, if any.
    pub slow: Option<SlowEffect>,
}

impl Default for Vitality {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Vitality {
    /// Creates vitality at full capacity.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            invulnerable: false,
            knockback_multiplier: 1.0,
            knockback_requires_damage: false,
            suppresses_recoil: false,
            invincibility_remaining: 0.0,
            last_hit_direction: Vec3::ZERO,
            last_hit_amount: 0.0,
            damage_modifiers: HashMap::new(),
            knockback_modifiers: HashMap::new(),
            knockback_immunities: HashSet::new(),
            stun_remaining: 0.0,
            slow: None,
        }
    }

    /// Marks the target invulnerable.
    #[must_use]
    pub fn with_invulnerable(mut self, invulnerable: bool) -> Self {
        self.invulnerable = invulnerable;
        self
    }

    /// Sets the global knockback sensitivity.
    #[must_use]
    pub fn with_knockback_multiplier(mut self, multiplier: f32) -> Self {
        self.knockback_multiplier = multiplier;
        self
    }

    /// Requires non-zero damage output for knockback to land.
    #[must_use]
    pub fn with_knockback_requires_damage(mut self, requires: bool) -> Self {
        self.knockback_requires_damage = requires;
        self
    }

    /// Exempts attackers from recoil when hitting this target.
    #[must_use]
    pub fn with_suppressed_recoil(mut self, suppresses: bool) -> Self {
        self.suppresses_recoil = suppresses;
        self
    }

    /// Sets a per-type intake multiplier (0.0 = immune).
    #[must_use]
    pub fn with_damage_modifier(mut self, damage_type: DamageType, multiplier: f32) -> Self {
        self.damage_modifiers
            .insert(damage_type, multiplier.max(0.0));
        self
    }

    /// Sets a per-type knockback force multiplier.
    #[must_use]
    pub fn with_knockback_modifier(mut self, damage_type: DamageType, multiplier: f32) -> Self {
        self.knockback_modifiers
            .insert(damage_type, multiplier.max(0.0));
        self
    }

    /// Makes hits of a damage type never knock this target back.
    #[must_use]
    pub fn with_knockback_immunity(mut self, damage_type: DamageType) -> Self {
        self.knockback_immunities.insert(damage_type);
        self
    }

    /// Returns whether the entity is defeated.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.current <= 0.0
    }

    /// Returns vitality as a fraction of maximum (0.0 to 1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    /// Returns whether a damage-intake call would land this frame.
    ///
    /// False while defeated, invulnerable, or inside the invincibility
    /// window opened by a previous hit.
    #[must_use]
    pub fn can_take_damage_this_frame(&self) -> bool {
        !self.is_defeated() && !self.invulnerable && self.invincibility_remaining <= 0.0
    }

    /// Returns the per-type intake multiplier for a damage type.
    #[must_use]
    pub fn damage_modifier(&self, damage_type: DamageType) -> f32 {
        if damage_type.is_true_damage() {
            return 1.0;
        }
        self.damage_modifiers
            .get(&damage_type)
            .copied()
            .unwrap_or(1.0)
    }

    /// Computes the post-modifier damage output for an amount.
    ///
    /// The amount is multiplied by this target's modifier for each distinct
    /// damage type present in `profiles`. A hit carrying no profiles passes
    /// through unmodified. `apply_multipliers` set to false bypasses the
    /// modifiers entirely (used by callers that already resolved them).
    #[must_use]
    pub fn damage_output(
        &self,
        amount: f32,
        profiles: &[DamageProfile],
        apply_multipliers: bool,
    ) -> f32 {
        if !apply_multipliers || profiles.is_empty() {
            return amount;
        }
        let mut seen = HashSet::new();
        let mut output = amount;
        for profile in profiles {
            if seen.insert(profile.damage_type) {
                output *= self.damage_modifier(profile.damage_type);
            }
        }
        output.max(0.0)
    }

    /// Scales a knockback force by this target's per-type modifiers.
    #[must_use]
    pub fn knockback_force(&self, force: Vec3, profiles: &[DamageProfile]) -> Vec3 {
        let mut seen = HashSet::new();
        let mut force = force;
        for profile in profiles {
            if seen.insert(profile.damage_type) {
                if let Some(multiplier) = self.knockback_modifiers.get(&profile.damage_type) {
                    force *= *multiplier;
                }
            }
        }
        force
    }

    /// Returns whether this target accepts knockback from these profiles.
    #[must_use]
    pub fn can_receive_knockback(&self, profiles: &[DamageProfile]) -> bool {
        !profiles
            .iter()
            .any(|p| self.knockback_immunities.contains(&p.damage_type))
    }

    /// Applies the condition effects (stun, slow) carried by profiles.
    ///
    /// A longer stun always wins; a slow replaces the active one when it is
    /// at least as strong.
    pub fn apply_conditions(&mut self, profiles: &[DamageProfile]) {
        for profile in profiles {
            if profile.applies_stun {
                self.stun_remaining = self.stun_remaining.max(profile.stun_duration);
            }
            if profile.applies_slow {
                let stronger = self
                    .slow
                    .map_or(true, |s| profile.slow_multiplier <= s.multiplier);
                if stronger {
                    self.slow = Some(SlowEffect {
                        multiplier: profile.slow_multiplier,
                        remaining: profile.slow_duration,
                    });
                }
            }
        }
    }

    /// Current movement multiplier from active conditions.
    #[must_use]
    pub fn movement_multiplier(&self) -> f32 {
        if self.stun_remaining > 0.0 {
            return 0.0;
        }
        self.slow.map_or(1.0, |s| s.multiplier)
    }

    /// Applies a damage-intake call.
    ///
    /// No-op (zero outcome) while ineligible per
    /// [`Vitality::can_take_damage_this_frame`]. Otherwise reduces vitality
    /// by the post-modifier output, records the hit direction and amount,
    /// opens the invincibility window, and applies profile conditions.
    pub fn apply_damage(
        &mut self,
        amount: f32,
        source: Option<EntityId>,
        invincibility: f32,
        direction: Vec3,
        profiles: &[DamageProfile],
    ) -> DamageOutcome {
        if !self.can_take_damage_this_frame() {
            return DamageOutcome::default();
        }

        let output = self.damage_output(amount, profiles, true);
        self.intake(output, source, invincibility, direction, profiles)
    }

    /// Applies one repeat of a damage-over-time sequence.
    ///
    /// Repeats carry a single damage type rather than the full profile
    /// modifier product; the stored profiles re-apply their conditions on
    /// every repeat.
    pub fn apply_repeat(
        &mut self,
        amount: f32,
        source: Option<EntityId>,
        invincibility: f32,
        direction: Vec3,
        profiles: &[DamageProfile],
        damage_type: DamageType,
    ) -> DamageOutcome {
        if !self.can_take_damage_this_frame() {
            return DamageOutcome::default();
        }

        let output = (amount * self.damage_modifier(damage_type)).max(0.0);
        self.intake(output, source, invincibility, direction, profiles)
    }

    fn intake(
        &mut self,
        output: f32,
        source: Option<EntityId>,
        invincibility: f32,
        direction: Vec3,
        profiles: &[DamageProfile],
    ) -> DamageOutcome {
        let applied = output.min(self.current);
        self.current -= applied;
        self.last_hit_direction = direction.normalize_or_zero();
        self.last_hit_amount = output;
        self.invincibility_remaining = invincibility.max(0.0);
        self.apply_conditions(profiles);

        let defeated = self.is_defeated();
        if defeated {
            debug!(?source, "entity defeated by damage intake");
        }

        DamageOutcome { applied, defeated }
    }

    /// Unconditionally zeroes vitality.
    ///
    /// Ignores invulnerability and invincibility windows; idempotent on an
    /// already-defeated target.
    pub fn defeat(&mut self) {
        self.current = 0.0;
    }

    /// Heals the entity. Defeated entities stay defeated until revived.
    pub fn heal(&mut self, amount: f32) {
        if self.is_defeated() {
            return;
        }
        self.current = (self.current + amount.max(0.0)).min(self.max);
    }

    /// Revives or resets the entity to the given vitality.
    ///
    /// Clears the invincibility window and any active conditions.
    pub fn revive(&mut self, vitality: f32) {
        self.current = vitality.clamp(0.0, self.max);
        self.invincibility_remaining = 0.0;
        self.stun_remaining = 0.0;
        self.slow = None;
    }

    /// Advances time-based state: the invincibility window and conditions.
    pub fn tick(&mut self, dt: f32) {
        self.invincibility_remaining = (self.invincibility_remaining - dt).max(0.0);
        self.stun_remaining = (self.stun_remaining - dt).max(0.0);
        if let Some(slow) = &mut self.slow {
            slow.remaining -= dt;
            if slow.remaining <= 0.0 {
                self.slow = None;
            }
        }
    }
}
