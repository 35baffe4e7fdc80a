//! Read-only diplomacy and influence view.
//!
//! The propagation engine consults relations between nations to decide
//! whether news is blocked and how quickly it travels. The authoritative
//! data lives in the host's diplomacy system behind [`DiplomacyProvider`];
//! [`StaticDiplomacy`] is an in-memory implementation for the demo engine
//! and for tests.

use std::collections::{BTreeMap, BTreeSet};

use herald_types::EntityId;
use serde::{Deserialize, Serialize};

/// Diplomatic status between two nations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RelationStatus {
    /// Formal alliance.
    Allied,
    /// Warm relations.
    Friendly,
    /// No particular feeling.
    #[default]
    Neutral,
    /// Open hostility short of war.
    Hostile,
    /// At war.
    AtWar,
}

impl RelationStatus {
    /// Multiplier applied to propagation delay between the two nations.
    pub const fn delay_multiplier(self) -> f64 {
        match self {
            Self::Allied => 0.7,
            Self::Friendly => 0.85,
            Self::Neutral => 1.0,
            Self::Hostile => 1.4,
            Self::AtWar => 1.8,
        }
    }

    /// Whether the relation is hostile or at war.
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Hostile | Self::AtWar)
    }
}

/// Delay multiplier for news moving within a single nation.
pub const SAME_NATION_DELAY_MULTIPLIER: f64 = 0.8;

/// How far a nation is dominated by another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfluenceState {
    /// Independence in `[0, 1]`; low values mean a puppet.
    pub autonomy: f64,
    /// The nation exerting the most influence, or [`EntityId::NONE`].
    pub dominant_influencer: EntityId,
}

/// Read-only access to relations and influence networks.
pub trait DiplomacyProvider: Send + Sync {
    /// Relation between two distinct nations.
    fn relation(&self, a: EntityId, b: EntityId) -> RelationStatus;

    /// Whether two nations are direct diplomatic neighbours.
    fn are_neighbors(&self, a: EntityId, b: EntityId) -> bool;

    /// Influence state of a nation, if any is tracked.
    fn influence(&self, nation: EntityId) -> Option<InfluenceState>;
}

const fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a.0 <= b.0 { (a, b) } else { (b, a) }
}

/// In-memory symmetric diplomacy table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticDiplomacy {
    relations: BTreeMap<(EntityId, EntityId), RelationStatus>,
    neighbors: BTreeSet<(EntityId, EntityId)>,
    influence: BTreeMap<EntityId, InfluenceState>,
}

impl StaticDiplomacy {
    /// Create an empty table where every pair is neutral.
    pub const fn new() -> Self {
        Self {
            relations: BTreeMap::new(),
            neighbors: BTreeSet::new(),
            influence: BTreeMap::new(),
        }
    }

    /// Set the relation between `a` and `b` (both directions).
    pub fn set_relation(&mut self, a: EntityId, b: EntityId, status: RelationStatus) {
        if status == RelationStatus::Neutral {
            self.relations.remove(&pair_key(a, b));
        } else {
            self.relations.insert(pair_key(a, b), status);
        }
    }

    /// Mark `a` and `b` as diplomatic neighbours (or not).
    pub fn set_neighbors(&mut self, a: EntityId, b: EntityId, neighbors: bool) {
        if neighbors {
            self.neighbors.insert(pair_key(a, b));
        } else {
            self.neighbors.remove(&pair_key(a, b));
        }
    }

    /// Record the influence state of `nation`.
    pub fn set_influence(&mut self, nation: EntityId, state: InfluenceState) {
        self.influence.insert(
            nation,
            InfluenceState {
                autonomy: state.autonomy.clamp(0.0, 1.0),
                dominant_influencer: state.dominant_influencer,
            },
        );
    }

    /// Forget the influence state of `nation`.
    pub fn clear_influence(&mut self, nation: EntityId) {
        self.influence.remove(&nation);
    }
}

impl DiplomacyProvider for StaticDiplomacy {
    fn relation(&self, a: EntityId, b: EntityId) -> RelationStatus {
        self.relations
            .get(&pair_key(a, b))
            .copied()
            .unwrap_or_default()
    }

    fn are_neighbors(&self, a: EntityId, b: EntityId) -> bool {
        self.neighbors.contains(&pair_key(a, b))
    }

    fn influence(&self, nation: EntityId) -> Option<InfluenceState> {
        self.influence.get(&nation).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations_are_symmetric() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_relation(EntityId(1), EntityId(2), RelationStatus::AtWar);
        assert_eq!(
            diplomacy.relation(EntityId(2), EntityId(1)),
            RelationStatus::AtWar
        );
        assert_eq!(
            diplomacy.relation(EntityId(1), EntityId(3)),
            RelationStatus::Neutral
        );
        diplomacy.set_relation(EntityId(2), EntityId(1), RelationStatus::Neutral);
        assert_eq!(
            diplomacy.relation(EntityId(1), EntityId(2)),
            RelationStatus::Neutral
        );
    }

    #[test]
    fn neighbors_and_influence() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_neighbors(EntityId(5), EntityId(4), true);
        assert!(diplomacy.are_neighbors(EntityId(4), EntityId(5)));
        diplomacy.set_influence(
            EntityId(4),
            InfluenceState {
                autonomy: 1.5,
                dominant_influencer: EntityId(9),
            },
        );
        let state = diplomacy.influence(EntityId(4));
        assert!(state.is_some_and(|s| (s.autonomy - 1.0).abs() < f64::EPSILON));
        diplomacy.clear_influence(EntityId(4));
        assert!(diplomacy.influence(EntityId(4)).is_none());
    }

    #[test]
    fn hostility_slows_news() {
        assert!(RelationStatus::AtWar.is_hostile());
        assert!(!RelationStatus::Friendly.is_hostile());
        assert!(
            RelationStatus::AtWar.delay_multiplier() > RelationStatus::Neutral.delay_multiplier()
        );
        assert!(RelationStatus::Allied.delay_multiplier() < SAME_NATION_DELAY_MULTIPLIER);
    }
}
