//! # Skirmish Combat
//!
//! Contact damage and knockback resolution for Project Skirmish.
//!
//! This crate decides what happens when an attack volume overlaps a
//! candidate entity:
//! - Collision gating (target filters, ignore lists, activation windows)
//! - Damage magnitude with typed profiles and per-tick stable sampling
//! - Damage direction and knockback impulses under configurable policies
//! - Per-target invincibility windows and defeat handling
//! - Damage-over-time sequences handed off to target-owned schedulers
//! - Kill volumes
//! - Hit signals for feedback layers
//! - Emitter definitions loaded from TOML assets
//!
//! Evaluation is single-threaded and tick-driven; collision detection
//! itself belongs to an external physics collaborator, consumed through
//! [`emitter::ContactStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod contact;
pub mod damageable;
pub mod dot;
pub mod emitter;
pub mod emitter_loader;
pub mod kill_volume;
pub mod knockback;
pub mod metrics;
pub mod profile;
pub mod signals;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::contact::*;
    pub use crate::damageable::*;
    pub use crate::dot::*;
    pub use crate::emitter::*;
    pub use crate::emitter_loader::*;
    pub use crate::kill_volume::*;
    pub use crate::knockback::*;
    pub use crate::metrics::*;
    pub use crate::profile::*;
    pub use crate::signals::*;
}

pub use prelude::*;
