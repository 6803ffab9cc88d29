//! Overlap notification types.
//!
//! Contact events are delivered synchronously by an external physics
//! collaborator, once per qualifying overlap per tick. This module only
//! defines the notification vocabulary; nothing here computes collisions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;

/// Kind of overlap notification delivered by the physics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// A planar overlap began this tick.
    Enter2d,
    /// A planar overlap persisted this tick.
    Stay2d,
    /// A volumetric overlap began this tick.
    Enter3d,
    /// A volumetric overlap persisted this tick.
    Stay3d,
}

impl ContactKind {
    /// Returns the space this notification was produced in.
    #[must_use]
    pub const fn space(self) -> ContactSpace {
        match self {
            Self::Enter2d | Self::Stay2d => ContactSpace::Planar,
            Self::Enter3d | Self::Stay3d => ContactSpace::Volumetric,
        }
    }

    /// Returns whether this is the first notification of an overlap.
    #[must_use]
    pub const fn is_enter(self) -> bool {
        matches!(self, Self::Enter2d | Self::Enter3d)
    }

    /// Returns the subscription flag for this kind.
    #[must_use]
    pub const fn flag(self) -> ContactKinds {
        match self {
            Self::Enter2d => ContactKinds::ENTER_2D,
            Self::Stay2d => ContactKinds::STAY_2D,
            Self::Enter3d => ContactKinds::ENTER_3D,
            Self::Stay3d => ContactKinds::STAY_3D,
        }
    }
}

/// Space an overlap was detected in.
///
/// Planar contacts resolve directions in the XY plane with the depth
/// component zeroed; volumetric contacts use all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSpace {
    /// 2D resolution (depth component zeroed).
    Planar,
    /// Full 3D resolution.
    Volumetric,
}

bitflags! {
    /// Subset of notification kinds an emitter subscribes to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ContactKinds: u8 {
        /// Planar overlap-begin notifications.
        const ENTER_2D = 1 << 0;
        /// Planar overlap-persist notifications.
        const STAY_2D  = 1 << 1;
        /// Volumetric overlap-begin notifications.
        const ENTER_3D = 1 << 2;
        /// Volumetric overlap-persist notifications.
        const STAY_3D  = 1 << 3;
    }
}

impl ContactKinds {
    /// Both planar notification kinds.
    #[must_use]
    pub const fn planar() -> Self {
        Self::ENTER_2D.union(Self::STAY_2D)
    }

    /// Both volumetric notification kinds.
    #[must_use]
    pub const fn volumetric() -> Self {
        Self::ENTER_3D.union(Self::STAY_3D)
    }
}

/// A single overlap notification between an emitter and a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Entity owning the emitting attack volume.
    pub emitter: EntityId,
    /// Entity the volume overlapped with.
    pub candidate: EntityId,
    /// Notification kind.
    pub kind: ContactKind,
}

impl ContactEvent {
    /// Creates a new contact event.
    #[must_use]
    pub const fn new(emitter: EntityId, candidate: EntityId, kind: ContactKind) -> Self {
        Self {
            emitter,
            candidate,
            kind,
        }
    }
}
