//! Emitter definition loading and management.
//!
//! This module provides:
//! - Loading emitter definitions from `assets/emitters/*.toml`
//! - Validation on load
//! - A registry with lookup by ID and name
//! - Building runtime emitters from definitions

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use skirmish_common::{CategoryMask, EntityId};

use crate::contact::{ContactKind, ContactKinds};
use crate::damageable::DamageType;
use crate::emitter::{ContactDamageEmitter, RepeatConfig};
use crate::knockback::{DamageDirectionMode, KnockbackDirectionMode};
use crate::profile::DamageProfile;

/// Default asset path for emitter definitions.
pub const DEFAULT_EMITTER_PATH: &str = "assets/emitters";

/// Errors that can occur during emitter loading.
#[derive(Debug, Error)]
pub enum EmitterLoadError {
    /// File not found.
    #[error("emitter file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("failed to read emitter file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse emitter TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error.
    #[error("emitter validation error: {0}")]
    ValidationError(String),

    /// Duplicate emitter ID.
    #[error("duplicate emitter ID: {0}")]
    DuplicateId(u32),
}

/// Result type for emitter loading operations.
pub type EmitterLoadResult<T> = Result<T, EmitterLoadError>;

/// A typed damage entry in an emitter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Damage type of this entry.
    pub damage_type: DamageType,
    /// Lower damage bound.
    pub min_damage: f32,
    /// Upper damage bound.
    pub max_damage: f32,
    /// Stun duration in seconds (0 = no stun).
    #[serde(default)]
    pub stun_duration: f32,
    /// Movement multiplier while slowed (1.0 = no slow).
    #[serde(default = "default_slow_multiplier")]
    pub slow_multiplier: f32,
    /// Slow duration in seconds.
    #[serde(default)]
    pub slow_duration: f32,
}

const fn default_slow_multiplier() -> f32 {
    1.0
}

impl ProfileDefinition {
    /// Builds the runtime profile.
    #[must_use]
    pub fn build(&self) -> DamageProfile {
        let mut profile = DamageProfile::new(self.damage_type, self.min_damage, self.max_damage);
        if self.stun_duration > 0.0 {
            profile = profile.with_stun(self.stun_duration);
        }
        if self.slow_multiplier < 1.0 && self.slow_duration > 0.0 {
            profile = profile.with_slow(self.slow_multiplier, self.slow_duration);
        }
        profile
    }
}

/// Damage-over-time configuration in an emitter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatDefinition {
    /// Total number of applications.
    pub count: u32,
    /// Seconds between applications.
    pub interval: f32,
    /// Whether the target may cancel the remaining repeats.
    #[serde(default)]
    pub interruptible: bool,
    /// Damage type carried by the repeats.
    #[serde(default)]
    pub damage_type: DamageType,
    /// Invincibility window opened by each repeat after the first.
    #[serde(default)]
    pub tick_invincibility: f32,
}

impl RepeatDefinition {
    /// Builds the runtime repeat configuration.
    #[must_use]
    pub fn build(&self) -> RepeatConfig {
        RepeatConfig::new(self.count, self.interval)
            .with_interruptible(self.interruptible)
            .with_damage_type(self.damage_type)
            .with_tick_invincibility(self.tick_invincibility)
    }
}

/// An emitter definition loaded from file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterDefinition {
    /// Unique emitter identifier.
    pub id: u32,
    /// Definition name (unique within a registry).
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Category names a candidate must intersect.
    pub target_categories: Vec<String>,
    /// Notification kinds to subscribe to.
    #[serde(default = "default_contacts")]
    pub contacts: Vec<ContactKind>,
    /// Lower base damage bound.
    pub min_damage: f32,
    /// Upper base damage bound.
    pub max_damage: f32,
    /// Typed damage entries.
    #[serde(default)]
    pub profiles: Vec<ProfileDefinition>,
    /// Damage-direction policy.
    #[serde(default)]
    pub damage_direction: DamageDirectionMode,
    /// Knockback policy.
    #[serde(default)]
    pub knockback_direction: KnockbackDirectionMode,
    /// Configured knockback force.
    #[serde(default)]
    pub knockback_force: [f32; 3],
    /// Invincibility window opened on targets.
    #[serde(default = "default_invincibility")]
    pub invincibility: f32,
    /// Flat recoil onto the owner for every hit.
    #[serde(default)]
    pub recoil_on_hit: f32,
    /// Additional flat recoil when hitting a non-damageable candidate.
    #[serde(default)]
    pub recoil_on_non_damageable: f32,
    /// Damage-over-time configuration.
    #[serde(default)]
    pub repeat: Option<RepeatDefinition>,
}

fn default_contacts() -> Vec<ContactKind> {
    vec![
        ContactKind::Enter2d,
        ContactKind::Stay2d,
        ContactKind::Enter3d,
        ContactKind::Stay3d,
    ]
}

const fn default_invincibility() -> f32 {
    0.5
}

impl EmitterDefinition {
    /// Validates the definition.
    ///
    /// Inverted base or profile damage bounds are tolerated (the runtime
    /// samples from the widened band) but reported with a warning; negative
    /// magnitudes, durations, and counts are rejected.
    pub fn validate(&self) -> EmitterLoadResult<()> {
        if self.name.is_empty() {
            return Err(EmitterLoadError::ValidationError(format!(
                "emitter {} has an empty name",
                self.id
            )));
        }
        if self.target_categories.is_empty() {
            return Err(EmitterLoadError::ValidationError(format!(
                "emitter '{}' filters no categories and can never hit",
                self.name
            )));
        }
        for category in &self.target_categories {
            if CategoryMask::from_name(category).is_none() {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' references unknown category '{category}'",
                    self.name
                )));
            }
        }
        if self.min_damage < 0.0 || self.max_damage < 0.0 {
            return Err(EmitterLoadError::ValidationError(format!(
                "emitter '{}' has a negative base damage bound",
                self.name
            )));
        }
        if self.min_damage > self.max_damage {
            warn!(
                emitter = %self.name,
                min = self.min_damage,
                max = self.max_damage,
                "inverted base damage bounds; sampling the widened band"
            );
        }
        if self.invincibility < 0.0 || self.recoil_on_hit < 0.0 || self.recoil_on_non_damageable < 0.0 {
            return Err(EmitterLoadError::ValidationError(format!(
                "emitter '{}' has a negative duration or recoil",
                self.name
            )));
        }
        for profile in &self.profiles {
            if profile.min_damage < 0.0 || profile.max_damage < 0.0 {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' has a profile with a negative damage bound",
                    self.name
                )));
            }
            if profile.min_damage > profile.max_damage {
                warn!(
                    emitter = %self.name,
                    ?profile.damage_type,
                    "inverted profile damage bounds; sampling the widened band"
                );
            }
            if profile.stun_duration < 0.0 || profile.slow_duration < 0.0 || profile.slow_multiplier < 0.0 {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' has a profile with a negative effect parameter",
                    self.name
                )));
            }
        }
        if let Some(repeat) = &self.repeat {
            if repeat.count == 0 {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' repeats zero times",
                    self.name
                )));
            }
            if repeat.count > 1 && repeat.interval <= 0.0 {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' repeats with a non-positive interval",
                    self.name
                )));
            }
            if repeat.tick_invincibility < 0.0 {
                return Err(EmitterLoadError::ValidationError(format!(
                    "emitter '{}' has a negative repeat invincibility",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Resolves the target filter mask.
    pub fn target_mask(&self) -> EmitterLoadResult<CategoryMask> {
        let mut mask = CategoryMask::empty();
        for category in &self.target_categories {
            let flag = CategoryMask::from_name(category).ok_or_else(|| {
                EmitterLoadError::ValidationError(format!("unknown category '{category}'"))
            })?;
            mask |= flag;
        }
        Ok(mask)
    }

    /// Resolves the subscription flags.
    #[must_use]
    pub fn subscriptions(&self) -> ContactKinds {
        self.contacts
            .iter()
            .fold(ContactKinds::empty(), |acc, kind| acc | kind.flag())
    }

    /// Builds a runtime emitter for the given owner.
    pub fn build(&self, owner: EntityId) -> EmitterLoadResult<ContactDamageEmitter> {
        self.validate()?;

        let mut emitter = ContactDamageEmitter::new(owner)
            .with_target_filter(self.target_mask()?)
            .with_subscriptions(self.subscriptions())
            .with_base_damage(self.min_damage, self.max_damage)
            .with_damage_direction(self.damage_direction)
            .with_knockback(self.knockback_direction, self.knockback_force.into())
            .with_invincibility(self.invincibility)
            .with_recoil(self.recoil_on_hit, self.recoil_on_non_damageable);

        for profile in &self.profiles {
            emitter = emitter.with_profile(profile.build());
        }
        if let Some(repeat) = &self.repeat {
            emitter = emitter.with_repeat(repeat.build());
        }

        Ok(emitter)
    }
}

/// Registry of emitter definitions with fast lookup.
#[derive(Debug, Clone, Default)]
pub struct EmitterRegistry {
    /// Definitions by ID.
    definitions: HashMap<u32, EmitterDefinition>,
    /// Name -> ID index.
    by_name: HashMap<String, u32>,
}

impl EmitterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, validating it first.
    pub fn register(&mut self, definition: EmitterDefinition) -> EmitterLoadResult<()> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            return Err(EmitterLoadError::DuplicateId(definition.id));
        }
        debug!(id = definition.id, name = %definition.name, "registered emitter definition");
        self.by_name.insert(definition.name.clone(), definition.id);
        self.definitions.insert(definition.id, definition);
        Ok(())
    }

    /// Loads a single definition file.
    pub fn load_file(&mut self, path: &Path) -> EmitterLoadResult<()> {
        if !path.exists() {
            return Err(EmitterLoadError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let definition: EmitterDefinition = toml::from_str(&contents)?;
        self.register(definition)
    }

    /// Loads every `*.toml` definition in a directory.
    ///
    /// Returns the number of definitions loaded. A missing directory loads
    /// nothing rather than erroring, so a project without emitter assets
    /// still boots.
    pub fn load_dir(&mut self, path: &Path) -> EmitterLoadResult<usize> {
        if !path.is_dir() {
            warn!(path = %path.display(), "emitter asset directory missing");
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            self.load_file(&file)?;
            loaded += 1;
        }

        info!(count = loaded, path = %path.display(), "loaded emitter definitions");
        Ok(loaded)
    }

    /// Gets a definition by ID.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&EmitterDefinition> {
        self.definitions.get(&id)
    }

    /// Gets a definition by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&EmitterDefinition> {
        self.by_name.get(name).and_then(|id| self.definitions.get(id))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates over all definitions.
    pub fn iter(&self) -> impl Iterator<Item = &EmitterDefinition> {
        self.definitions.values()
    }
}
