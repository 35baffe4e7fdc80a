//! Type-safe identifier wrappers.
//!
//! Regions and entities are numbered by the host game, so their ids wrap a
//! plain `u32` where `0` means "none". Actor ids are allocated by the
//! director from a disjoint range per [`ActorKind`], which lets any
//! component classify an actor without touching the registry. Packets use
//! UUID v7 (time-ordered) so logs sort by creation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around a host-assigned `u32` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// The "no such thing" sentinel (raw value `0`).
            pub const NONE: Self = Self(0);

            /// Wrap a raw host identifier.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the inner raw value.
            pub const fn into_inner(self) -> u32 {
                self.0
            }

            /// Whether this is the [`Self::NONE`] sentinel.
            pub const fn is_none(self) -> bool {
                self.0 == 0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a region (node in the adjacency graph).
    RegionId
}

define_id! {
    /// Identifier of a game entity: a realm (nation) or a character.
    EntityId
}

define_id! {
    /// Identifier of an actor tracked by the director.
    ActorId
}

/// Unique identifier for a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(pub Uuid);

impl PacketId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for PacketId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PacketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Actor kinds
// ---------------------------------------------------------------------------

/// The three kinds of actor the director manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// A realm-level strategic agent.
    Nation,
    /// An individual character agent.
    Character,
    /// A realm's advisory council.
    Council,
}

impl ActorKind {
    /// All kinds in allocation order.
    pub const ALL: [Self; 3] = [Self::Nation, Self::Character, Self::Council];

    /// First id of this kind's range (inclusive).
    pub const fn range_start(self) -> u32 {
        match self {
            Self::Nation => 1000,
            Self::Character => 5000,
            Self::Council => 9000,
        }
    }

    /// End of this kind's range (exclusive).
    pub const fn range_end(self) -> u32 {
        match self {
            Self::Nation => 5000,
            Self::Character => 9000,
            Self::Council => u32::MAX,
        }
    }

    /// Classify an actor id by its range.
    ///
    /// Returns `None` for ids below the first range (including `0`).
    pub const fn classify(id: ActorId) -> Option<Self> {
        let raw = id.0;
        if raw >= Self::Nation.range_start() && raw < Self::Nation.range_end() {
            Some(Self::Nation)
        } else if raw >= Self::Character.range_start() && raw < Self::Character.range_end() {
            Some(Self::Character)
        } else if raw >= Self::Council.range_start() && raw < Self::Council.range_end() {
            Some(Self::Council)
        } else {
            None
        }
    }
}

impl core::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Nation => "nation",
            Self::Character => "character",
            Self::Council => "council",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_respects_ranges() {
        assert_eq!(ActorKind::classify(ActorId(1000)), Some(ActorKind::Nation));
        assert_eq!(ActorKind::classify(ActorId(4999)), Some(ActorKind::Nation));
        assert_eq!(ActorKind::classify(ActorId(5000)), Some(ActorKind::Character));
        assert_eq!(ActorKind::classify(ActorId(9000)), Some(ActorKind::Council));
        assert_eq!(ActorKind::classify(ActorId(0)), None);
        assert_eq!(ActorKind::classify(ActorId(999)), None);
    }

    #[test]
    fn ranges_are_disjoint() {
        for pair in ActorKind::ALL.windows(2) {
            if let [a, b] = pair {
                assert_eq!(a.range_end(), b.range_start());
            }
        }
    }

    #[test]
    fn none_sentinel() {
        assert!(EntityId::NONE.is_none());
        assert!(!EntityId::new(3).is_none());
        assert_eq!(RegionId::from(7).to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&RegionId(12));
        assert!(json.is_ok());
        assert_eq!(json.unwrap_or_default(), "12");
    }

    #[test]
    fn packet_ids_are_unique() {
        assert_ne!(PacketId::new(), PacketId::new());
    }
}
