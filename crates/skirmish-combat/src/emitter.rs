//! Contact damage emitter.
//!
//! This module provides:
//! - The capability store contract contacts are resolved through
//! - `ContactDamageEmitter`: collision gating, damage resolution, recoil,
//!   knockback application, and damage-over-time handoff
//! - A contact outcome report for callers and tests
//!
//! Evaluation is single-threaded and tick-driven. [`ContactDamageEmitter::
//! begin_tick`] must run before any contact evaluation of the tick so every
//! resolution reads one consistent set of snapshots: *sense → gate → resolve
//! damage → resolve knockback → signal*.

use crossbeam_channel::Sender;
use glam::Vec3;
use std::collections::HashSet;
use tracing::{debug, trace};

use skirmish_common::{CategoryMask, EntityId};

use crate::contact::{ContactEvent, ContactKinds, ContactSpace};
use crate::damageable::{DamageType, Vitality};
use crate::dot::DotHandoff;
use crate::knockback::{
    resolve_knockback, DamageDirectionMode, DamageDirectionTracker, Impulse,
    KnockbackDirectionMode, KnockbackInputs,
};
use crate::metrics::EmitterMetrics;
use crate::profile::{DamageProfile, DamageRange};
use crate::signals::{HitSignal, SignalBus};

use serde::{Deserialize, Serialize};

/// Capability store contacts are resolved through.
///
/// Every lookup is a dynamic capability query on a weak handle: `None` (or
/// an empty mask) means the entity lacks that capability or is gone, and the
/// emitter degrades to the documented fallback instead of erroring. Non-combat
/// entities simply answer `None` everywhere.
pub trait ContactStore {
    /// Damage-intake capability of an entity.
    fn vitality(&self, entity: EntityId) -> Option<&Vitality>;

    /// Mutable damage-intake capability of an entity.
    fn vitality_mut(&mut self, entity: EntityId) -> Option<&mut Vitality>;

    /// World position of an entity.
    fn position(&self, entity: EntityId) -> Option<Vec3>;

    /// Motion capability: current velocity, present only for entities that
    /// can also receive impulses.
    fn velocity(&self, entity: EntityId) -> Option<Vec3>;

    /// Hands an impulse to an entity's motion state.
    fn apply_impulse(&mut self, entity: EntityId, direction: Vec3, magnitude: f32);

    /// Category membership used for target filtering.
    fn categories(&self, entity: EntityId) -> CategoryMask;

    /// Damage-over-time acceptor. Returns false when the target does not
    /// support one, in which case the emitter falls back to a single
    /// application.
    fn start_damage_over_time(&mut self, target: EntityId, handoff: DotHandoff) -> bool;
}

/// Configuration for sustaining damage over a sequence of timed repeats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeatConfig {
    /// Total number of applications, the immediate first one included.
    pub count: u32,
    /// Seconds between applications.
    pub interval: f32,
    /// Whether the target may cancel the remaining repeats.
    pub interruptible: bool,
    /// Damage type carried by the repeats.
    pub damage_type: DamageType,
    /// Invincibility window opened by each repeat after the first.
    #[serde(default)]
    pub tick_invincibility: f32,
}

impl RepeatConfig {
    /// Creates a repeat configuration.
    #[must_use]
    pub fn new(count: u32, interval: f32) -> Self {
        Self {
            count: count.max(1),
            interval: interval.max(0.0),
            interruptible: false,
            damage_type: DamageType::default(),
            tick_invincibility: 0.0,
        }
    }

    /// Allows the target to cancel the remaining repeats.
    #[must_use]
    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Sets the damage type carried by the repeats.
    #[must_use]
    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Sets the invincibility window opened by each repeat.
    #[must_use]
    pub fn with_tick_invincibility(mut self, invincibility: f32) -> Self {
        self.tick_invincibility = invincibility.max(0.0);
        self
    }
}

/// Why a contact was rejected before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The emitter is disabled.
    Disabled,
    /// The emitter does not subscribe to this notification kind.
    NotSubscribed,
    /// The candidate is on the ignore list.
    Ignored,
    /// The candidate's categories do not intersect the target filter.
    FilteredOut,
    /// The emitter has not completed a full tick since activation.
    FirstTick,
}

/// Result of one contact evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactOutcome {
    /// Rejected by a gate; nothing happened, no signals fired.
    Skipped(SkipReason),
    /// Damageable target inside its invincibility window (or invulnerable):
    /// no damage, no knockback; recoil and the hit-anything signal still
    /// apply.
    Shielded,
    /// Candidate without usable vitality: recoil onto the owner only.
    NonDamageable,
    /// Damage resolved against a damageable target.
    Hit(HitReport),
}

/// Details of a resolved hit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitReport {
    /// Pre-modifier amount sampled for the hit.
    pub amount: f32,
    /// Post-modifier output presented to the target.
    pub output: f32,
    /// Damage direction attached to the intake (normalized).
    pub direction: Vec3,
    /// Knockback impulse applied, if any (direction, magnitude).
    pub knockback: Option<(Vec3, f32)>,
    /// Whether the hit was handed off as a damage-over-time sequence.
    pub dot_started: bool,
    /// Whether the target is defeated after the hit.
    pub defeated: bool,
}

/// Resolves contact overlaps into damage, knockback, and signals.
///
/// Owns its configuration and transient per-tick state; never owns the
/// lifetime of its owner or its targets (all references are [`EntityId`]
/// handles resolved through a [`ContactStore`] at contact time).
#[derive(Debug)]
pub struct ContactDamageEmitter {
    /// Entity owning this attack volume (weak handle).
    pub owner: EntityId,
    /// Categories a candidate must intersect to qualify.
    pub target_filter: CategoryMask,
    /// Notification kinds this emitter evaluates.
    pub subscriptions: ContactKinds,
    /// Base damage band sampled per hit.
    pub base_damage: DamageRange,
    /// Typed damage entries summed on top of the base band.
    pub profiles: Vec<DamageProfile>,
    /// Damage-direction policy.
    pub damage_direction: DamageDirectionMode,
    /// Knockback policy.
    pub knockback_direction: KnockbackDirectionMode,
    /// Configured knockback force.
    pub knockback_force: Vec3,
    /// Invincibility window opened on the target by a hit.
    pub invincibility_duration: f32,
    /// Damage-over-time configuration; `None` resolves single hits.
    pub repeat: Option<RepeatConfig>,
    /// Flat recoil onto the owner for every hit.
    pub recoil_on_hit: f32,
    /// Additional flat recoil when hitting a non-damageable candidate.
    pub recoil_on_non_damageable: f32,

    script_direction: Vec3,
    enabled: bool,
    ignore: HashSet<EntityId>,
    tick: u64,
    ticks_active: u64,
    position: Vec3,
    travel: Vec3,
    velocity: Vec3,
    direction_tracker: DamageDirectionTracker,
    rng: fastrand::Rng,
    signals: Option<Sender<HitSignal>>,
    metrics: EmitterMetrics,
}

impl ContactDamageEmitter {
    /// Creates an emitter with default policies for the given owner.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            target_filter: CategoryMask::ENEMY,
            subscriptions: ContactKinds::all(),
            base_damage: DamageRange::default(),
            profiles: Vec::new(),
            damage_direction: DamageDirectionMode::default(),
            knockback_direction: KnockbackDirectionMode::default(),
            knockback_force: Vec3::ZERO,
            invincibility_duration: 0.5,
            repeat: None,
            recoil_on_hit: 0.0,
            recoil_on_non_damageable: 0.0,
            script_direction: Vec3::ZERO,
            enabled: true,
            ignore: HashSet::new(),
            tick: 0,
            ticks_active: 0,
            position: Vec3::ZERO,
            travel: Vec3::ZERO,
            velocity: Vec3::ZERO,
            direction_tracker: DamageDirectionTracker::default(),
            rng: fastrand::Rng::new(),
            signals: None,
            metrics: EmitterMetrics::new(),
        }
    }

    /// Sets the categories a candidate must intersect.
    #[must_use]
    pub fn with_target_filter(mut self, filter: CategoryMask) -> Self {
        self.target_filter = filter;
        self
    }

    /// Sets the notification kinds this emitter evaluates.
    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: ContactKinds) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Sets the base damage band.
    #[must_use]
    pub fn with_base_damage(mut self, min: f32, max: f32) -> Self {
        self.base_damage = DamageRange::new(min, max);
        self
    }

    /// Adds a typed damage entry.
    #[must_use]
    pub fn with_profile(mut self, profile: DamageProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Sets the damage-direction policy.
    #[must_use]
    pub fn with_damage_direction(mut self, mode: DamageDirectionMode) -> Self {
        self.damage_direction = mode;
        self
    }

    /// Sets the knockback policy and force.
    #[must_use]
    pub fn with_knockback(mut self, mode: KnockbackDirectionMode, force: Vec3) -> Self {
        self.knockback_direction = mode;
        self.knockback_force = force;
        self
    }

    /// Sets the invincibility window opened on targets.
    #[must_use]
    pub fn with_invincibility(mut self, duration: f32) -> Self {
        self.invincibility_duration = duration.max(0.0);
        self
    }

    /// Configures damage-over-time repeats.
    #[must_use]
    pub fn with_repeat(mut self, repeat: RepeatConfig) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Sets the flat recoil amounts.
    #[must_use]
    pub fn with_recoil(mut self, on_hit: f32, on_non_damageable: f32) -> Self {
        self.recoil_on_hit = on_hit.max(0.0);
        self.recoil_on_non_damageable = on_non_damageable.max(0.0);
        self
    }

    /// Seeds the damage sampler (deterministic resolution for tests/replays).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Connects this emitter's signals to a bus.
    pub fn connect_signals(&mut self, bus: &SignalBus) {
        self.signals = Some(bus.sender());
    }

    /// Injects the direction used by the script-direction policies.
    pub fn set_script_direction(&mut self, direction: Vec3) {
        self.script_direction = direction;
    }

    /// Returns whether the emitter evaluates contacts.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the emitter.
    ///
    /// Both transitions clear the ignore list; activation additionally
    /// restarts the first-tick suppression window and re-anchors the
    /// damage-direction tracker.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        self.ignore.clear();
        if enabled {
            self.ticks_active = 0;
            self.direction_tracker.reset(self.position);
        }
    }

    /// Excludes a candidate from contact evaluation.
    pub fn ignore(&mut self, entity: EntityId) {
        self.ignore.insert(entity);
    }

    /// Re-admits a previously ignored candidate.
    pub fn unignore(&mut self, entity: EntityId) {
        self.ignore.remove(&entity);
    }

    /// Clears the ignore list.
    pub fn clear_ignored(&mut self) {
        self.ignore.clear();
    }

    /// Returns whether a candidate is currently ignored.
    #[must_use]
    pub fn is_ignored(&self, entity: EntityId) -> bool {
        self.ignore.contains(&entity)
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn metrics(&self) -> &EmitterMetrics {
        &self.metrics
    }

    /// Resets the counters.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Velocity measured over the previous tick.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Advances the emitter's tick and recomputes its motion snapshots.
    ///
    /// Must run once per simulation step, before any contact evaluation of
    /// that step.
    pub fn begin_tick(&mut self, position: Vec3, dt: f32) {
        self.tick += 1;
        if self.enabled {
            self.ticks_active += 1;
        }
        self.travel = position - self.position;
        self.velocity = if dt > 0.0 {
            self.travel / dt
        } else {
            Vec3::ZERO
        };
        self.position = position;
    }

    /// Evaluates one overlap notification.
    ///
    /// Gated contacts produce no effect and no signals. Resolved contacts
    /// follow the order *resolve damage → resolve knockback → signal*; the
    /// hit-anything signal fires for every non-gated contact.
    pub fn evaluate_contact<S: ContactStore>(
        &mut self,
        event: &ContactEvent,
        store: &mut S,
    ) -> ContactOutcome {
        self.metrics.contacts_seen += 1;

        if let Some(reason) = self.gate(event, store) {
            self.metrics.contacts_gated += 1;
            trace!(candidate = ?event.candidate, ?reason, "contact gated");
            return ContactOutcome::Skipped(reason);
        }

        let space = event.kind.space();
        let damageable = store
            .vitality(event.candidate)
            .map_or(false, |v| !v.is_defeated());

        let outcome = if damageable {
            self.resolve_damageable(event.candidate, space, store)
        } else {
            self.resolve_non_damageable(event.candidate, store)
        };

        self.signal(HitSignal::Anything(event.candidate));
        outcome
    }

    fn gate<S: ContactStore>(&self, event: &ContactEvent, store: &S) -> Option<SkipReason> {
        if !self.enabled {
            return Some(SkipReason::Disabled);
        }
        if !self.subscriptions.contains(event.kind.flag()) {
            return Some(SkipReason::NotSubscribed);
        }
        if self.ignore.contains(&event.candidate) {
            return Some(SkipReason::Ignored);
        }
        if !store
            .categories(event.candidate)
            .intersects(self.target_filter)
        {
            return Some(SkipReason::FilteredOut);
        }
        // One full tick must elapse after activation before contacts count.
        if self.ticks_active <= 1 {
            return Some(SkipReason::FirstTick);
        }
        None
    }

    fn resolve_damageable<S: ContactStore>(
        &mut self,
        target: EntityId,
        space: ContactSpace,
        store: &mut S,
    ) -> ContactOutcome {
        let owner_position = store.position(self.owner).unwrap_or(self.position);
        let target_position = store.position(target).unwrap_or(self.position);

        let (eligible, suppresses_recoil) = match store.vitality(target) {
            Some(v) => (v.can_take_damage_this_frame(), v.suppresses_recoil),
            None => return ContactOutcome::NonDamageable,
        };

        if !eligible {
            self.metrics.contacts_shielded += 1;
            self.apply_recoil(self.recoil_on_hit, suppresses_recoil, target, store);
            return ContactOutcome::Shielded;
        }

        // Sample: base band fresh per hit, profile entries stable per tick.
        let tick = self.tick;
        let mut amount = self.base_damage.sample(&mut self.rng);
        for profile in &mut self.profiles {
            amount += profile.sample(tick, &mut self.rng);
        }

        let direction = self.direction_tracker.resolve(
            self.damage_direction,
            space,
            owner_position,
            target_position,
            self.position,
            self.script_direction,
        );

        // Knockback decision from the pre-application state snapshot.
        let knockback =
            self.resolve_target_knockback(target, space, amount, owner_position, target_position, store);

        let output = store
            .vitality(target)
            .map_or(0.0, |v| v.damage_output(amount, &self.profiles, true));

        let mut dot_started = false;
        if let Some(repeat) = self.repeat {
            let handoff = DotHandoff {
                tick_amount: amount,
                source: Some(self.owner),
                initial_invincibility: self.invincibility_duration,
                tick_invincibility: repeat.tick_invincibility,
                direction,
                profiles: self.profiles.clone(),
                repeat_count: repeat.count,
                interval: repeat.interval,
                interruptible: repeat.interruptible,
                repeated_type: repeat.damage_type,
            };
            if store.start_damage_over_time(target, handoff) {
                dot_started = true;
                self.metrics.dot_handoffs += 1;
                debug!(?target, count = repeat.count, interval = repeat.interval, "damage-over-time handed off");
            }
        }

        if !dot_started {
            if let Some(vitality) = store.vitality_mut(target) {
                vitality.apply_damage(
                    amount,
                    Some(self.owner),
                    self.invincibility_duration,
                    direction,
                    &self.profiles,
                );
            }
        }

        if let Some(impulse) = knockback {
            store.apply_impulse(target, impulse.direction, impulse.magnitude);
            self.metrics.knockbacks_applied += 1;
        }

        self.apply_recoil(self.recoil_on_hit, suppresses_recoil, target, store);

        let defeated = store.vitality(target).map_or(false, Vitality::is_defeated);
        if defeated {
            self.metrics.defeats += 1;
        }
        self.metrics.hits_damageable += 1;
        self.signal(HitSignal::Damageable(target));

        ContactOutcome::Hit(HitReport {
            amount,
            output,
            direction,
            knockback: knockback.map(|i| (i.direction, i.magnitude)),
            dot_started,
            defeated,
        })
    }

    fn resolve_non_damageable<S: ContactStore>(
        &mut self,
        candidate: EntityId,
        store: &mut S,
    ) -> ContactOutcome {
        let recoil = self.recoil_on_hit + self.recoil_on_non_damageable;
        self.apply_recoil(recoil, false, candidate, store);
        self.metrics.hits_non_damageable += 1;
        self.signal(HitSignal::NonDamageable(candidate));
        ContactOutcome::NonDamageable
    }

    fn resolve_target_knockback<S: ContactStore>(
        &self,
        target: EntityId,
        space: ContactSpace,
        amount: f32,
        owner_position: Vec3,
        target_position: Vec3,
        store: &S,
    ) -> Option<Impulse> {
        // Knockback needs the motion capability and a configured force.
        let target_velocity = store.velocity(target)?;
        if self.knockback_force.length_squared() <= f32::EPSILON {
            return None;
        }

        let vitality = store.vitality(target)?;
        if vitality.invulnerable {
            return None;
        }
        if vitality.knockback_requires_damage
            && vitality.damage_output(amount, &self.profiles, true) <= 0.0
        {
            return None;
        }
        if !vitality.can_receive_knockback(&self.profiles) {
            return None;
        }

        let force = vitality.knockback_force(
            self.knockback_force * vitality.knockback_multiplier,
            &self.profiles,
        );
        let inputs = KnockbackInputs {
            owner_position,
            target_position,
            target_velocity,
            emitter_velocity: self.velocity,
            travel: self.travel,
            script_direction: self.script_direction,
        };
        resolve_knockback(self.knockback_direction, space, force, &inputs)
    }

    fn apply_recoil<S: ContactStore>(
        &mut self,
        amount: f32,
        suppressed: bool,
        source: EntityId,
        store: &mut S,
    ) {
        if amount <= 0.0 || suppressed {
            return;
        }
        if let Some(owner_vitality) = store.vitality_mut(self.owner) {
            owner_vitality.apply_damage(amount, Some(source), 0.0, Vec3::ZERO, &[]);
            self.metrics.recoils_applied += 1;
        }
    }

    fn signal(&self, signal: HitSignal) {
        if let Some(sender) = &self.signals {
            let _ = sender.try_send(signal);
        }
    }
}

/// Mock capability store for testing.
#[cfg(test)]
pub(crate) struct MockContactStore {
    vitals: std::collections::HashMap<EntityId, Vitality>,
    positions: std::collections::HashMap<EntityId, Vec3>,
    velocities: std::collections::HashMap<EntityId, Vec3>,
    categories: std::collections::HashMap<EntityId, CategoryMask>,
    pub impulses: Vec<(EntityId, Vec3, f32)>,
    pub dots: crate::dot::DotScheduler,
    pub accepts_dot: bool,
}

#[cfg(test)]
impl MockContactStore {
    pub fn new() -> Self {
        Self {
            vitals: std::collections::HashMap::new(),
            positions: std::collections::HashMap::new(),
            velocities: std::collections::HashMap::new(),
            categories: std::collections::HashMap::new(),
            impulses: Vec::new(),
            dots: crate::dot::DotScheduler::new(),
            accepts_dot: true,
        }
    }

    pub fn add_target(
        &mut self,
        entity: EntityId,
        vitality: Vitality,
        position: Vec3,
        categories: CategoryMask,
    ) {
        self.vitals.insert(entity, vitality);
        self.positions.insert(entity, position);
        self.categories.insert(entity, categories);
    }

    pub fn add_prop(&mut self, entity: EntityId, position: Vec3, categories: CategoryMask) {
        self.positions.insert(entity, position);
        self.categories.insert(entity, categories);
    }

    pub fn set_motion(&mut self, entity: EntityId, velocity: Vec3) {
        self.velocities.insert(entity, velocity);
    }

    /// Ticks the damage-over-time arena and applies what came due.
    pub fn tick_dots(&mut self, dt: f32) {
        for app in self.dots.tick(dt) {
            if let Some(vitality) = self.vitals.get_mut(&app.target) {
                vitality.apply_repeat(
                    app.amount,
                    app.source,
                    app.invincibility,
                    app.direction,
                    &app.profiles,
                    app.damage_type,
                );
            }
        }
    }
}

#[cfg(test)]
impl ContactStore for MockContactStore {
    fn vitality(&self, entity: EntityId) -> Option<&Vitality> {
        self.vitals.get(&entity)
    }

    fn vitality_mut(&mut self, entity: EntityId) -> Option<&mut Vitality> {
        self.vitals.get_mut(&entity)
    }

    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec3> {
        self.velocities.get(&entity).copied()
    }

    fn apply_impulse(&mut self, entity: EntityId, direction: Vec3, magnitude: f32) {
        self.impulses.push((entity, direction, magnitude));
    }

    fn categories(&self, entity: EntityId) -> CategoryMask {
        self.categories
            .get(&entity)
            .copied()
            .unwrap_or(CategoryMask::empty())
    }

    fn start_damage_over_time(&mut self, target: EntityId, handoff: DotHandoff) -> bool {
        if !self.accepts_dot {
            return false;
        }
        let initial = self.dots.accept(target, handoff);
        if let Some(vitality) = self.vitals.get_mut(&target) {
            vitality.apply_repeat(
                initial.amount,
                initial.source,
                initial.invincibility,
                initial.direction,
                &initial.profiles,
                initial.damage_type,
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactKind;

    /// Emitter warmed past the first-tick suppression window.
    fn warmed_emitter(owner: EntityId) -> ContactDamageEmitter {
        let mut emitter = ContactDamageEmitter::new(owner).with_seed(11);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);
        emitter
    }

    fn enemy_contact(emitter: &ContactDamageEmitter, target: EntityId) -> ContactEvent {
        ContactEvent::new(emitter.owner, target, ContactKind::Stay2d)
    }

    #[test]
    fn test_disabled_emitter_skips() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.set_enabled(false);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::Disabled));
    }

    #[test]
    fn test_first_tick_suppression() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = ContactDamageEmitter::new(owner).with_seed(1);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);

        let event = enemy_contact(&emitter, target);
        let outcome = emitter.evaluate_contact(&event, &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::FirstTick));

        // From the second tick on, contacts resolve.
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);
        let outcome = emitter.evaluate_contact(&event, &mut store);
        assert!(matches!(outcome, ContactOutcome::Hit(_)));
    }

    #[test]
    fn test_reactivation_restarts_suppression() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.set_enabled(false);
        emitter.set_enabled(true);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::FirstTick));
    }

    #[test]
    fn test_ignore_list_blocks_everything() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let bus = SignalBus::default();
        let mut emitter = warmed_emitter(owner);
        emitter.connect_signals(&bus);
        emitter.ignore(target);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::Ignored));
        assert!(bus.drain().is_empty());
        assert!(store.impulses.is_empty());

        emitter.unignore(target);
        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert!(matches!(outcome, ContactOutcome::Hit(_)));
        assert!(!bus.drain().is_empty());
    }

    #[test]
    fn test_category_filter() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::NPC);

        let mut emitter = warmed_emitter(owner);
        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::FilteredOut));
    }

    #[test]
    fn test_subscription_filter() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.subscriptions = ContactKinds::volumetric();

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::NotSubscribed));
    }

    #[test]
    fn test_missing_candidate_skips() {
        let owner = EntityId::new();
        let missing = EntityId::new();
        let mut store = MockContactStore::new();

        let mut emitter = warmed_emitter(owner);
        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, missing), &mut store);

        // An absent entity has no categories, so the filter gate rejects it.
        assert_eq!(outcome, ContactOutcome::Skipped(SkipReason::FilteredOut));
    }

    #[test]
    fn test_flat_damage_hit() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.base_damage = DamageRange::flat(25.0);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let ContactOutcome::Hit(report) = outcome else {
            panic!("expected a hit");
        };
        assert!((report.amount - 25.0).abs() < f32::EPSILON);
        assert!(!report.defeated);

        let vitality = store.vitality(target).expect("target vitality");
        assert!((vitality.current - 75.0).abs() < f32::EPSILON);
        assert!((vitality.invincibility_remaining - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invincibility_window_shields_repeat_contacts() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.base_damage = DamageRange::flat(10.0);

        let event = enemy_contact(&emitter, target);
        assert!(matches!(
            emitter.evaluate_contact(&event, &mut store),
            ContactOutcome::Hit(_)
        ));
        assert_eq!(
            emitter.evaluate_contact(&event, &mut store),
            ContactOutcome::Shielded
        );
        let vitality = store.vitality(target).expect("target vitality");
        assert!((vitality.current - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defeated_target_routes_non_damageable() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        let mut vitality = Vitality::new(10.0);
        vitality.defeat();
        store.add_target(target, vitality, Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert_eq!(outcome, ContactOutcome::NonDamageable);
    }

    #[test]
    fn test_non_damageable_recoil() {
        let owner = EntityId::new();
        let wall = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(owner, Vitality::new(20.0), Vec3::ZERO, CategoryMask::PLAYER);
        store.add_prop(wall, Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.recoil_on_non_damageable = 5.0;

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, wall), &mut store);
        assert_eq!(outcome, ContactOutcome::NonDamageable);

        let owner_vitality = store.vitality(owner).expect("owner vitality");
        assert!((owner_vitality.current - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_recoil_suppressed_by_target() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(owner, Vitality::new(20.0), Vec3::ZERO, CategoryMask::PLAYER);
        store.add_target(
            target,
            Vitality::new(100.0).with_suppressed_recoil(true),
            Vec3::X,
            CategoryMask::ENEMY,
        );

        let mut emitter = warmed_emitter(owner);
        emitter.recoil_on_hit = 5.0;

        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let owner_vitality = store.vitality(owner).expect("owner vitality");
        assert!((owner_vitality.current - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_recoil_on_damageable_hit() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(owner, Vitality::new(20.0), Vec3::ZERO, CategoryMask::PLAYER);
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.recoil_on_hit = 3.0;
        emitter.recoil_on_non_damageable = 5.0; // must not apply here

        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let owner_vitality = store.vitality(owner).expect("owner vitality");
        assert!((owner_vitality.current - 17.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_knockback_requires_motion_capability() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);
        // No set_motion call: target has no motion capability.

        let mut emitter = warmed_emitter(owner);
        emitter.knockback_force = Vec3::new(10.0, 0.0, 0.0);

        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert!(store.impulses.is_empty());
    }

    #[test]
    fn test_knockback_skipped_for_zero_force_and_invulnerable() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);
        store.set_motion(target, Vec3::ZERO);

        // Zero force: no impulse.
        let mut emitter = warmed_emitter(owner);
        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        assert!(store.impulses.is_empty());

        // Invulnerable target: no impulse even with force configured.
        let invulnerable = EntityId::new();
        store.add_target(
            invulnerable,
            Vitality::new(100.0).with_invulnerable(true),
            Vec3::X,
            CategoryMask::ENEMY,
        );
        store.set_motion(invulnerable, Vec3::ZERO);
        emitter.knockback_force = Vec3::new(10.0, 0.0, 0.0);
        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, invulnerable), &mut store);
        assert!(store.impulses.is_empty());
    }

    #[test]
    fn test_knockback_gates_hold_for_all_modes() {
        let modes = [
            KnockbackDirectionMode::OwnerPosition,
            KnockbackDirectionMode::Speed,
            KnockbackDirectionMode::TravelDirection,
            KnockbackDirectionMode::ScriptDirection,
        ];

        for mode in modes {
            let owner = EntityId::new();
            let zero_force = EntityId::new();
            let invulnerable = EntityId::new();
            let unharmed = EntityId::new();

            let mut store = MockContactStore::new();
            store.add_target(zero_force, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);
            store.add_target(
                invulnerable,
                Vitality::new(100.0).with_invulnerable(true),
                Vec3::X,
                CategoryMask::ENEMY,
            );
            store.add_target(
                unharmed,
                Vitality::new(100.0)
                    .with_knockback_requires_damage(true)
                    .with_damage_modifier(DamageType::Fire, 0.0),
                Vec3::X,
                CategoryMask::ENEMY,
            );
            for target in [zero_force, invulnerable, unharmed] {
                store.set_motion(target, Vec3::new(1.0, 0.0, 0.0));
            }

            // Moving emitter with an injected direction: every mode has a
            // non-degenerate direction available.
            let mut emitter = ContactDamageEmitter::new(owner).with_seed(13);
            emitter.profiles = vec![DamageProfile::new(DamageType::Fire, 0.0, 0.0)];
            emitter.set_script_direction(Vec3::Y);
            emitter.knockback_direction = mode;
            emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);
            emitter.begin_tick(Vec3::new(0.5, 0.0, 0.0), 1.0 / 60.0);

            // Zero force vector.
            emitter.knockback_force = Vec3::ZERO;
            let _ = emitter.evaluate_contact(&enemy_contact(&emitter, zero_force), &mut store);
            assert!(store.impulses.is_empty(), "zero force, mode {mode:?}");

            // Invulnerable target.
            emitter.knockback_force = Vec3::new(10.0, 0.0, 0.0);
            let _ = emitter.evaluate_contact(&enemy_contact(&emitter, invulnerable), &mut store);
            assert!(store.impulses.is_empty(), "invulnerable, mode {mode:?}");

            // Zero post-modifier output with knockback_requires_damage.
            let _ = emitter.evaluate_contact(&enemy_contact(&emitter, unharmed), &mut store);
            assert!(store.impulses.is_empty(), "zero output, mode {mode:?}");
        }
    }

    #[test]
    fn test_knockback_requires_damage_gate() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(
            target,
            Vitality::new(100.0)
                .with_knockback_requires_damage(true)
                .with_damage_modifier(DamageType::Fire, 0.0),
            Vec3::X,
            CategoryMask::ENEMY,
        );
        store.set_motion(target, Vec3::ZERO);

        let mut emitter = warmed_emitter(owner);
        emitter.base_damage = DamageRange::flat(10.0);
        emitter.profiles = vec![DamageProfile::new(DamageType::Fire, 0.0, 0.0)];
        emitter.knockback_force = Vec3::new(10.0, 0.0, 0.0);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let ContactOutcome::Hit(report) = outcome else {
            panic!("expected a hit");
        };
        assert!((report.output).abs() < f32::EPSILON);
        assert!(report.knockback.is_none());
        assert!(store.impulses.is_empty());
    }

    #[test]
    fn test_owner_position_knockback_end_to_end() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(owner, Vitality::new(50.0), Vec3::ZERO, CategoryMask::PLAYER);
        store.add_target(target, Vitality::new(50.0), Vec3::new(5.0, 0.0, 0.0), CategoryMask::ENEMY);
        store.set_motion(target, Vec3::ZERO);

        let force = Vec3::new(10.0, 10.0, 10.0);
        let mut emitter = ContactDamageEmitter::new(owner)
            .with_seed(5)
            .with_base_damage(10.0, 10.0)
            .with_knockback(KnockbackDirectionMode::OwnerPosition, force);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);
        emitter.begin_tick(Vec3::ZERO, 1.0 / 60.0);

        let event = ContactEvent::new(owner, target, ContactKind::Stay3d);
        let outcome = emitter.evaluate_contact(&event, &mut store);
        let ContactOutcome::Hit(report) = outcome else {
            panic!("expected a hit");
        };
        assert!((report.amount - 10.0).abs() < f32::EPSILON);

        let (hit, direction, magnitude) = store.impulses[0];
        assert_eq!(hit, target);
        assert!(direction.abs_diff_eq(Vec3::X, 1e-4));
        assert!((magnitude - force.length()).abs() < 1e-3);
    }

    #[test]
    fn test_dot_handoff_and_fallback() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let repeat = RepeatConfig::new(3, 1.0).with_damage_type(DamageType::Poison);
        let mut emitter = warmed_emitter(owner);
        emitter.base_damage = DamageRange::flat(5.0);
        emitter.invincibility_duration = 0.0;
        emitter.repeat = Some(repeat);

        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let ContactOutcome::Hit(report) = outcome else {
            panic!("expected a hit");
        };
        assert!(report.dot_started);
        assert!(store.dots.is_active(target));
        // First application landed immediately.
        assert!((store.vitality(target).expect("vitality").current - 95.0).abs() < f32::EPSILON);

        // Remaining repeats tick on the target side, without the emitter.
        store.tick_dots(1.0);
        assert!((store.vitality(target).expect("vitality").current - 90.0).abs() < f32::EPSILON);

        // Acceptor missing: silent fallback to a single application.
        let other = EntityId::new();
        store.add_target(other, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);
        store.accepts_dot = false;
        let outcome = emitter.evaluate_contact(&enemy_contact(&emitter, other), &mut store);
        let ContactOutcome::Hit(report) = outcome else {
            panic!("expected a hit");
        };
        assert!(!report.dot_started);
        assert!(!store.dots.is_active(other));
        assert!((store.vitality(other).expect("vitality").current - 95.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_signals_fire_per_branch() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let wall = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);
        store.add_prop(wall, Vec3::X, CategoryMask::ENEMY);

        let bus = SignalBus::default();
        let mut emitter = warmed_emitter(owner);
        emitter.connect_signals(&bus);

        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        let signals = bus.drain();
        assert!(signals.contains(&HitSignal::Damageable(target)));
        assert!(signals.contains(&HitSignal::Anything(target)));

        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, wall), &mut store);
        let signals = bus.drain();
        assert!(signals.contains(&HitSignal::NonDamageable(wall)));
        assert!(signals.contains(&HitSignal::Anything(wall)));
    }

    #[test]
    fn test_metrics_track_outcomes() {
        let owner = EntityId::new();
        let target = EntityId::new();
        let mut store = MockContactStore::new();
        store.add_target(target, Vitality::new(100.0), Vec3::X, CategoryMask::ENEMY);

        let mut emitter = warmed_emitter(owner);
        emitter.ignore(target);
        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);
        emitter.clear_ignored();
        let _ = emitter.evaluate_contact(&enemy_contact(&emitter, target), &mut store);

        assert_eq!(emitter.metrics().contacts_seen, 2);
        assert_eq!(emitter.metrics().contacts_gated, 1);
        assert_eq!(emitter.metrics().hits_damageable, 1);
    }

    #[test]
    fn test_velocity_snapshot() {
        let owner = EntityId::new();
        let mut emitter = ContactDamageEmitter::new(owner);
        emitter.begin_tick(Vec3::ZERO, 0.5);
        emitter.begin_tick(Vec3::new(2.0, 0.0, 0.0), 0.5);
        assert!(emitter.velocity().abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-5));
    }
}
