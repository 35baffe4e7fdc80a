//! Personality archetypes.
//!
//! An [`Archetype`] drives both the attention template an actor starts with
//! and the trait vector its decision agent uses. Nations additionally carry
//! a coarser [`NationPersonality`] that maps one-to-one onto an archetype.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown archetype name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archetype: {0}")]
pub struct ParseArchetypeError(pub String);

/// Personality template for a ruler or character.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Archetype {
    /// Martial ruler who leads from the front.
    WarriorKing,
    /// Expansionist who lives for conquest.
    Conqueror,
    /// Negotiator who wins with treaties.
    Diplomat,
    /// Steward of a well-run realm.
    Administrator,
    /// Trader chasing wealth.
    Merchant,
    /// Patron of learning.
    Scholar,
    /// Religious zealot.
    Zealot,
    /// Builder of works and institutions.
    Builder,
    /// Cruel autocrat.
    Tyrant,
    /// Agent of change.
    Reformer,
    /// No strong leanings.
    #[default]
    Balanced,
}

impl Archetype {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::WarriorKing,
        Self::Conqueror,
        Self::Diplomat,
        Self::Administrator,
        Self::Merchant,
        Self::Scholar,
        Self::Zealot,
        Self::Builder,
        Self::Tyrant,
        Self::Reformer,
        Self::Balanced,
    ];

    /// Human-readable name as used by the host game's character sheets.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::WarriorKing => "The Warrior King",
            Self::Conqueror => "The Conqueror",
            Self::Diplomat => "The Diplomat",
            Self::Administrator => "The Administrator",
            Self::Merchant => "The Merchant Prince",
            Self::Scholar => "The Scholar",
            Self::Zealot => "The Zealot",
            Self::Builder => "The Builder",
            Self::Tyrant => "The Tyrant",
            Self::Reformer => "The Reformer",
            Self::Balanced => "Balanced",
        }
    }

    /// The nation personality this archetype rules with.
    pub const fn nation_personality(self) -> NationPersonality {
        match self {
            Self::WarriorKing | Self::Conqueror => NationPersonality::Expansionist,
            Self::Diplomat => NationPersonality::Diplomatic,
            Self::Merchant => NationPersonality::Economic,
            Self::Scholar => NationPersonality::Technological,
            Self::Zealot => NationPersonality::Religious,
            Self::Administrator | Self::Builder => NationPersonality::Developmental,
            Self::Tyrant => NationPersonality::Aggressive,
            Self::Reformer => NationPersonality::Progressive,
            Self::Balanced => NationPersonality::Balanced,
        }
    }
}

impl core::fmt::Display for Archetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Archetype {
    type Err = ParseArchetypeError;

    /// Accepts display names ("The Conqueror") as well as bare lowercase
    /// names ("conqueror", "warrior_king").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix("The ")
            .or_else(|| trimmed.strip_prefix("the "))
            .unwrap_or(trimmed)
            .to_ascii_lowercase()
            .replace([' ', '-'], "_");
        let archetype = match bare.as_str() {
            "warrior_king" => Self::WarriorKing,
            "conqueror" => Self::Conqueror,
            "diplomat" => Self::Diplomat,
            "administrator" => Self::Administrator,
            "merchant" | "merchant_prince" => Self::Merchant,
            "scholar" => Self::Scholar,
            "zealot" => Self::Zealot,
            "builder" => Self::Builder,
            "tyrant" => Self::Tyrant,
            "reformer" => Self::Reformer,
            "balanced" => Self::Balanced,
            _ => return Err(ParseArchetypeError(s.to_owned())),
        };
        Ok(archetype)
    }
}

/// Coarse strategic personality of a nation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NationPersonality {
    /// Grows by conquest.
    Expansionist,
    /// Grows by treaty.
    Diplomatic,
    /// Grows by trade.
    Economic,
    /// Grows by learning.
    Technological,
    /// Driven by faith.
    Religious,
    /// Grows by building up its own lands.
    Developmental,
    /// Belligerent and unpredictable.
    Aggressive,
    /// Reform-minded.
    Progressive,
    /// No dominant drive.
    #[default]
    Balanced,
}

impl NationPersonality {
    /// The archetype whose attention template this personality uses.
    pub const fn archetype(self) -> Archetype {
        match self {
            Self::Expansionist => Archetype::Conqueror,
            Self::Diplomatic => Archetype::Diplomat,
            Self::Economic => Archetype::Merchant,
            Self::Technological => Archetype::Scholar,
            Self::Religious => Archetype::Zealot,
            Self::Developmental => Archetype::Builder,
            Self::Aggressive => Archetype::Tyrant,
            Self::Progressive => Archetype::Reformer,
            Self::Balanced => Archetype::Balanced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_and_bare_names() {
        assert_eq!("The Conqueror".parse::<Archetype>(), Ok(Archetype::Conqueror));
        assert_eq!("conqueror".parse::<Archetype>(), Ok(Archetype::Conqueror));
        assert_eq!("warrior king".parse::<Archetype>(), Ok(Archetype::WarriorKing));
        assert_eq!("The Merchant Prince".parse::<Archetype>(), Ok(Archetype::Merchant));
        assert!("pirate".parse::<Archetype>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for archetype in Archetype::ALL {
            assert_eq!(archetype.to_string().parse::<Archetype>(), Ok(archetype));
        }
    }

    #[test]
    fn personality_maps_back_to_its_archetype_family() {
        assert_eq!(
            Archetype::Conqueror.nation_personality().archetype(),
            Archetype::Conqueror
        );
        assert_eq!(
            Archetype::WarriorKing.nation_personality(),
            NationPersonality::Expansionist
        );
        assert_eq!(
            Archetype::Administrator.nation_personality().archetype(),
            Archetype::Builder
        );
    }
}
