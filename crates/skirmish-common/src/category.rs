//! Category masks for target and collision filtering.

use bitflags::bitflags;

bitflags! {
    /// Set of gameplay categories an entity belongs to.
    ///
    /// Used by contact emitters and kill volumes to filter candidates: a
    /// candidate qualifies when its membership mask intersects the filter.
    /// An entity may belong to any number of categories.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CategoryMask: u32 {
        /// Player-controlled characters.
        const PLAYER       = 1 << 0;
        /// Hostile NPCs.
        const ENEMY        = 1 << 1;
        /// Friendly or neutral NPCs.
        const NPC          = 1 << 2;
        /// Projectiles in flight.
        const PROJECTILE   = 1 << 3;
        /// Environmental hazards (spikes, lava, crushers).
        const HAZARD       = 1 << 4;
        /// Breakable scenery.
        const DESTRUCTIBLE = 1 << 5;
        /// Inert props and level geometry.
        const PROP         = 1 << 6;
    }
}

impl CategoryMask {
    /// Parses a category from its config-file name.
    ///
    /// Returns `None` for unknown names so loaders can report the offending
    /// string instead of silently dropping it.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "player" => Some(Self::PLAYER),
            "enemy" => Some(Self::ENEMY),
            "npc" => Some(Self::NPC),
            "projectile" => Some(Self::PROJECTILE),
            "hazard" => Some(Self::HAZARD),
            "destructible" => Some(Self::DESTRUCTIBLE),
            "prop" => Some(Self::PROP),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trip() {
        assert_eq!(CategoryMask::from_name("enemy"), Some(CategoryMask::ENEMY));
        assert_eq!(CategoryMask::from_name("bogus"), None);
    }

    #[test]
    fn test_mask_union() {
        let mask = CategoryMask::ENEMY | CategoryMask::PROJECTILE;
        assert!(mask.contains(CategoryMask::ENEMY));
        assert!(!mask.contains(CategoryMask::HAZARD));
    }
}
