//! Read-only world access for decision agents.
//!
//! Agents never hold references into authoritative realm storage. Each
//! dispatch step hands them an [`AgentContext`] that borrows a
//! [`RealmView`] for the duration of that step only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use herald_types::{EntityId, RegionId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Point-in-time view of a realm's economy and armies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RealmSnapshot {
    /// Gold on hand.
    pub treasury: f64,
    /// Gold earned per month.
    pub monthly_income: f64,
    /// Gold spent per month.
    pub monthly_expenses: f64,
    /// Raised levies.
    pub levy_size: f64,
    /// Professional soldiers.
    pub standing_army: f64,
    /// Internal stability in `[0, 1]`.
    pub stability: f64,
    /// Ruler legitimacy in `[0, 1]`.
    pub legitimacy: f64,
    /// Regions owned.
    pub region_count: u32,
}

impl RealmSnapshot {
    /// Levies plus twice the standing army, scaled by up to 2x for a rich
    /// treasury.
    pub fn military_strength(&self) -> f64 {
        let troops = self.levy_size.max(0.0) + self.standing_army.max(0.0) * 2.0;
        let funding = (self.treasury.max(0.0) / 1000.0).min(2.0);
        troops * funding
    }
}

/// How one realm stands with another.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RealmRelation {
    /// Opinion in `[-100, 100]`.
    pub opinion: f64,
    /// The realms are allied.
    pub allied: bool,
    /// The realms are at war.
    pub at_war: bool,
    /// The realms have a trade agreement.
    pub trade: bool,
}

// ---------------------------------------------------------------------------
// View trait
// ---------------------------------------------------------------------------

/// Read-only source of realm state.
pub trait RealmView: Send + Sync {
    /// Current snapshot of a realm, if it exists.
    fn realm(&self, entity: EntityId) -> Option<RealmSnapshot>;

    /// Relation from `entity` toward `other`, if any is recorded.
    fn relation(&self, entity: EntityId, other: EntityId) -> Option<RealmRelation>;

    /// Every recorded relation of `entity`.
    fn relations(&self, entity: EntityId) -> Vec<(EntityId, RealmRelation)>;

    /// Whether `entity` owns `region`.
    fn owns_region(&self, entity: EntityId, region: RegionId) -> bool;
}

/// Borrowed world access valid for one dispatch step.
#[derive(Clone, Copy)]
pub struct AgentContext<'a> {
    /// Current game time.
    pub now: NaiveDateTime,
    realms: &'a dyn RealmView,
}

impl<'a> AgentContext<'a> {
    /// Wrap a realm view for the current step.
    pub fn new(now: NaiveDateTime, realms: &'a dyn RealmView) -> Self {
        Self { now, realms }
    }

    /// Snapshot of a realm.
    pub fn realm(&self, entity: EntityId) -> Option<RealmSnapshot> {
        self.realms.realm(entity)
    }

    /// Relation from `entity` toward `other`.
    pub fn relation(&self, entity: EntityId, other: EntityId) -> Option<RealmRelation> {
        self.realms.relation(entity, other)
    }

    /// All relations of `entity`.
    pub fn relations(&self, entity: EntityId) -> Vec<(EntityId, RealmRelation)> {
        self.realms.relations(entity)
    }

    /// Whether `entity` owns `region`.
    pub fn owns_region(&self, entity: EntityId, region: RegionId) -> bool {
        self.realms.owns_region(entity, region)
    }
}

impl std::fmt::Debug for AgentContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext").field("now", &self.now).finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory [`RealmView`] used by the engine binary and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRealms {
    realms: BTreeMap<EntityId, RealmSnapshot>,
    relations: BTreeMap<(EntityId, EntityId), RealmRelation>,
    regions: BTreeMap<EntityId, BTreeSet<RegionId>>,
}

impl StaticRealms {
    /// An empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a realm snapshot.
    pub fn set_realm(&mut self, entity: EntityId, snapshot: RealmSnapshot) {
        self.realms.insert(entity, snapshot);
    }

    /// Mutable access to a stored snapshot.
    pub fn realm_mut(&mut self, entity: EntityId) -> Option<&mut RealmSnapshot> {
        self.realms.get_mut(&entity)
    }

    /// Record the relation from `entity` toward `other`. Relations are
    /// directional; call twice for a mutual relation.
    pub fn set_relation(&mut self, entity: EntityId, other: EntityId, relation: RealmRelation) {
        self.relations.insert((entity, other), relation);
    }

    /// Record the same relation in both directions.
    pub fn set_mutual_relation(&mut self, a: EntityId, b: EntityId, relation: RealmRelation) {
        self.set_relation(a, b, relation);
        self.set_relation(b, a, relation);
    }

    /// Give `region` to `entity`, removing it from any previous owner.
    pub fn assign_region(&mut self, entity: EntityId, region: RegionId) {
        for owned in self.regions.values_mut() {
            owned.remove(&region);
        }
        self.regions.entry(entity).or_default().insert(region);
    }

    /// Realms with a snapshot.
    pub fn entities(&self) -> Vec<EntityId> {
        self.realms.keys().copied().collect()
    }
}

impl RealmView for StaticRealms {
    fn realm(&self, entity: EntityId) -> Option<RealmSnapshot> {
        self.realms.get(&entity).copied()
    }

    fn relation(&self, entity: EntityId, other: EntityId) -> Option<RealmRelation> {
        self.relations.get(&(entity, other)).copied()
    }

    fn relations(&self, entity: EntityId) -> Vec<(EntityId, RealmRelation)> {
        self.relations
            .range((entity, EntityId(0))..=(entity, EntityId(u32::MAX)))
            .map(|(&(_, other), &relation)| (other, relation))
            .collect()
    }

    fn owns_region(&self, entity: EntityId, region: RegionId) -> bool {
        self.regions
            .get(&entity)
            .is_some_and(|owned| owned.contains(&region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn military_strength_scales_with_treasury() {
        let poor = RealmSnapshot {
            levy_size: 1000.0,
            standing_army: 500.0,
            treasury: 500.0,
            ..RealmSnapshot::default()
        };
        assert!((poor.military_strength() - 1000.0).abs() < 1e-9);

        let rich = RealmSnapshot {
            treasury: 50_000.0,
            ..poor
        };
        assert!((rich.military_strength() - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn relations_are_scoped_to_entity() {
        let mut realms = StaticRealms::new();
        let hostile = RealmRelation {
            opinion: -60.0,
            at_war: true,
            ..RealmRelation::default()
        };
        realms.set_mutual_relation(EntityId(1), EntityId(2), hostile);
        realms.set_relation(EntityId(3), EntityId(1), RealmRelation::default());

        let of_one = realms.relations(EntityId(1));
        assert_eq!(of_one.len(), 1);
        assert_eq!(of_one.first().map(|(e, _)| *e), Some(EntityId(2)));
        assert!(realms.relation(EntityId(2), EntityId(1)).is_some_and(|r| r.at_war));
        assert!(realms.relation(EntityId(2), EntityId(3)).is_none());
    }

    #[test]
    fn region_assignment_moves_ownership() {
        let mut realms = StaticRealms::new();
        realms.assign_region(EntityId(1), RegionId(10));
        assert!(realms.owns_region(EntityId(1), RegionId(10)));
        realms.assign_region(EntityId(2), RegionId(10));
        assert!(!realms.owns_region(EntityId(1), RegionId(10)));
        assert!(realms.owns_region(EntityId(2), RegionId(10)));
    }
}
