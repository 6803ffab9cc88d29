//! Direction and knockback resolution.
//!
//! This module provides:
//! - The four knockback direction policies, with distinct planar (2D) and
//!   volumetric (3D) algorithms
//! - Damage-direction resolution with movement hysteresis
//! - The angular-limited planar turn used to keep knockback continuous
//!
//! Everything here is pure math over contact-time snapshots; applying the
//! resulting impulse is the capability store's job.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::contact::ContactSpace;

/// Maximum angle (radians) a planar knockback force may turn in one tick.
///
/// Planar modes steer the configured force toward the resolved direction
/// instead of snapping to it, so consecutive ticks of a persisting overlap
/// produce a continuous impulse direction.
pub const MAX_PLANAR_TURN_RADIANS: f32 = 0.35;

/// Minimum emitter movement before the damage direction re-resolves.
///
/// Sub-threshold motion keeps the previously resolved direction, filtering
/// the jitter of sub-pixel movement out of hit feedback.
pub const DIRECTION_HYSTERESIS: f32 = 0.05;

/// Policy for deriving the damage direction attached to an intake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageDirectionMode {
    /// Vector from the emitter's owner to the target.
    OwnerPosition,
    /// Displacement of the emitter since its last recorded damage position.
    Velocity,
    /// Externally injected direction.
    ScriptDirection,
}

impl Default for DamageDirectionMode {
    fn default() -> Self {
        Self::OwnerPosition
    }
}

/// Policy for deriving the knockback impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnockbackDirectionMode {
    /// Steer the force toward the owner-to-target direction.
    OwnerPosition,
    /// Derive from the combined target and emitter velocities.
    Speed,
    /// Use the emitter's displacement since the previous tick.
    TravelDirection,
    /// Externally injected direction scaled by the force magnitude.
    ScriptDirection,
}

impl Default for KnockbackDirectionMode {
    fn default() -> Self {
        Self::OwnerPosition
    }
}

/// A resolved knockback impulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    /// Normalized impulse direction.
    pub direction: Vec3,
    /// Impulse magnitude.
    pub magnitude: f32,
}

/// Contact-time snapshots the knockback algorithms read from.
///
/// All fields are captured before any contact evaluation of the tick, so
/// damage and knockback resolution see one consistent world state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnockbackInputs {
    /// Owner position (emitter position substitutes when the owner is gone).
    pub owner_position: Vec3,
    /// Target position at contact time.
    pub target_position: Vec3,
    /// Target velocity at contact time.
    pub target_velocity: Vec3,
    /// Emitter velocity measured over the previous tick.
    pub emitter_velocity: Vec3,
    /// Emitter displacement over the previous tick.
    pub travel: Vec3,
    /// Externally injected direction.
    pub script_direction: Vec3,
}

/// Rotates `force` toward `target` by at most `max_angle` radians.
///
/// The magnitude of `force` is preserved. A degenerate target leaves the
/// force unchanged.
#[must_use]
pub fn rotate_toward(force: Vec2, target: Vec2, max_angle: f32) -> Vec2 {
    let Some(target_dir) = target.try_normalize() else {
        return force;
    };
    let Some(current) = force.try_normalize() else {
        return force;
    };
    let angle = current.perp_dot(target_dir).atan2(current.dot(target_dir));
    Vec2::from_angle(angle.clamp(-max_angle, max_angle)).rotate(force)
}

/// Resolves a knockback impulse for a mode/space pair.
///
/// `force` is the configured force already scaled by the target's
/// sensitivity and per-type hooks. Returns `None` when the resolved vector
/// is degenerate (zero travel, zero script direction, coincident positions
/// with a zero force); a degenerate resolution is a skipped knockback, not
/// an error.
#[must_use]
pub fn resolve_knockback(
    mode: KnockbackDirectionMode,
    space: ContactSpace,
    force: Vec3,
    inputs: &KnockbackInputs,
) -> Option<Impulse> {
    match mode {
        KnockbackDirectionMode::OwnerPosition => {
            let mut to_target = inputs.target_position - inputs.owner_position;
            if space == ContactSpace::Planar {
                to_target.z = 0.0;
            }
            let dir = to_target.try_normalize()?;
            match space {
                ContactSpace::Planar => impulse_from(steer_planar(force, dir)),
                ContactSpace::Volumetric => {
                    let base = force.try_normalize()?;
                    impulse_from(Quat::from_rotation_arc(base, dir) * force)
                }
            }
        }
        KnockbackDirectionMode::Speed => {
            let combined = inputs.target_velocity + inputs.emitter_velocity;
            match space {
                ContactSpace::Planar => {
                    let rotated =
                        rotate_toward(force.truncate(), combined.truncate(), MAX_PLANAR_TURN_RADIANS);
                    impulse_from(rotated.extend(0.0))
                }
                ContactSpace::Volumetric => impulse_from(force * combined.length()),
            }
        }
        KnockbackDirectionMode::TravelDirection => {
            let mut travel = inputs.travel;
            if space == ContactSpace::Planar {
                travel.z = 0.0;
            }
            let direction = travel.try_normalize()?;
            Some(Impulse {
                direction,
                magnitude: force.length(),
            })
        }
        KnockbackDirectionMode::ScriptDirection => {
            let direction = inputs.script_direction.try_normalize()?;
            Some(Impulse {
                direction,
                magnitude: force.length(),
            })
        }
    }
}

/// Steers a force toward a planar direction, angular-limited.
///
/// A force with no planar component cannot be steered; it snaps to the
/// target direction at full magnitude instead.
fn steer_planar(force: Vec3, dir: Vec3) -> Vec3 {
    let planar_force = force.truncate();
    if planar_force.length_squared() <= f32::EPSILON {
        return dir * force.length();
    }
    rotate_toward(planar_force, dir.truncate(), MAX_PLANAR_TURN_RADIANS).extend(0.0)
}

fn impulse_from(vector: Vec3) -> Option<Impulse> {
    let direction = vector.try_normalize()?;
    Some(Impulse {
        direction,
        magnitude: vector.length(),
    })
}

/// Damage-direction state for one emitter.
///
/// Owns the "last recorded damage position" used by the velocity mode and
/// the last resolved direction used as a fallback for degenerate inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageDirectionTracker {
    last_position: Vec3,
    last_direction: Vec3,
}

impl Default for DamageDirectionTracker {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl DamageDirectionTracker {
    /// Creates a tracker anchored at the given position.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self {
            last_position: position,
            last_direction: Vec3::X,
        }
    }

    /// Re-anchors the tracker (used when an emitter is re-activated).
    pub fn reset(&mut self, position: Vec3) {
        self.last_position = position;
        self.last_direction = Vec3::X;
    }

    /// Resolves the damage direction for a contact.
    ///
    /// Always returns a normalized vector; degenerate inputs fall back to
    /// the last resolved direction.
    pub fn resolve(
        &mut self,
        mode: DamageDirectionMode,
        space: ContactSpace,
        owner_position: Vec3,
        target_position: Vec3,
        emitter_position: Vec3,
        script_direction: Vec3,
    ) -> Vec3 {
        match mode {
            DamageDirectionMode::OwnerPosition => {
                let mut direction = target_position - owner_position;
                if space == ContactSpace::Planar {
                    direction.z = 0.0;
                }
                if let Some(dir) = direction.try_normalize() {
                    self.last_direction = dir;
                }
                self.last_direction
            }
            DamageDirectionMode::Velocity => {
                let displacement = emitter_position - self.last_position;
                if displacement.length() > DIRECTION_HYSTERESIS {
                    self.last_position = emitter_position;
                    let mut direction = displacement;
                    if space == ContactSpace::Planar {
                        direction.z = 0.0;
                    }
                    if let Some(dir) = direction.try_normalize() {
                        self.last_direction = dir;
                    }
                }
                self.last_direction
            }
            DamageDirectionMode::ScriptDirection => {
                if let Some(dir) = script_direction.try_normalize() {
                    self.last_direction = dir;
                }
                self.last_direction
            }
        }
    }
}
