//! Per-actor attention filtering.
//!
//! Every actor has an [`AttentionProfile`] built from its archetype's
//! template. [`AttentionFilter::filter_information`] decides whether a
//! packet reaches the actor, how urgently, and at what relevance:
//!
//! 1. Special interest (a rival or ally originated it, or it came from a
//!    watched region) always passes at critical relevance.
//! 2. Packets estimated to come from beyond the actor's attention distance
//!    are dropped.
//! 3. Packet types the actor barely cares about are dropped.
//! 4. The remaining packets are scored by a weighted blend of type weight,
//!    severity, accuracy, and base relevance.
//! 5. Scores under the low threshold are dropped. The rest pick a
//!    processing delay band and may raise the delivered relevance.
//!
//! Filtering is a pure function of the packet and the profile. Only the
//! statistics counters change.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use herald_types::{
    ActorId, ActorKind, Archetype, EntityId, InformationType, Packet, RegionId, Relevance,
};
use serde::Serialize;
use tracing::debug;

use crate::config::AttentionConfig;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// What an actor pays attention to.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionProfile {
    /// Owning actor.
    pub actor: ActorId,
    /// Realm or character the actor speaks for.
    pub entity: EntityId,
    /// Display name.
    pub name: String,
    /// Archetype the template came from.
    pub archetype: Archetype,
    /// Interest per packet type. Missing types are ignored entirely.
    pub type_weights: BTreeMap<InformationType, f64>,
    /// Packets estimated beyond this many kilometres are dropped.
    pub max_attention_distance_km: f64,
    /// How quickly interest fades with distance.
    pub distance_falloff: f64,
    /// Score at or above which a packet is critical.
    pub critical_threshold: f64,
    /// Score at or above which a packet is high priority.
    pub high_threshold: f64,
    /// Score at or above which a packet is medium priority.
    pub medium_threshold: f64,
    /// Scores below this are dropped.
    pub low_threshold: f64,
    /// Entities the actor considers rivals.
    pub rivals: BTreeSet<EntityId>,
    /// Entities the actor considers allies.
    pub allies: BTreeSet<EntityId>,
    /// Regions the actor watches closely.
    pub watched_regions: BTreeSet<RegionId>,
}

impl AttentionProfile {
    /// Build an unattached profile from an archetype's template.
    pub fn from_template(archetype: Archetype) -> Self {
        use InformationType as T;

        let mut profile = Self {
            actor: ActorId::NONE,
            entity: EntityId::NONE,
            name: String::new(),
            archetype,
            type_weights: BTreeMap::new(),
            max_attention_distance_km: 3000.0,
            distance_falloff: 0.5,
            critical_threshold: 0.9,
            high_threshold: 0.7,
            medium_threshold: 0.4,
            low_threshold: 0.2,
            rivals: BTreeSet::new(),
            allies: BTreeSet::new(),
            watched_regions: BTreeSet::new(),
        };

        let weights: &[(InformationType, f64)] = match archetype {
            Archetype::Conqueror | Archetype::WarriorKing => {
                profile.max_attention_distance_km = 4000.0;
                profile.distance_falloff = 0.3;
                profile.critical_threshold = 0.8;
                profile.high_threshold = 0.6;
                profile.medium_threshold = 0.3;
                profile.low_threshold = 0.1;
                &[
                    (T::MilitaryAction, 1.0),
                    (T::Rebellion, 0.9),
                    (T::SuccessionCrisis, 0.8),
                    (T::AllianceFormation, 0.7),
                    (T::DiplomaticChange, 0.6),
                    (T::TechnologyAdvance, 0.4),
                    (T::EconomicCrisis, 0.3),
                    (T::ReligiousEvent, 0.2),
                ]
            }
            Archetype::Diplomat => {
                profile.distance_falloff = 0.4;
                &[
                    (T::DiplomaticChange, 1.0),
                    (T::AllianceFormation, 1.0),
                    (T::SuccessionCrisis, 0.8),
                    (T::TradeDisruption, 0.7),
                    (T::CulturalShift, 0.6),
                    (T::MilitaryAction, 0.5),
                    (T::Rebellion, 0.4),
                ]
            }
            Archetype::Merchant => {
                profile.max_attention_distance_km = 5000.0;
                &[
                    (T::EconomicCrisis, 1.0),
                    (T::TradeDisruption, 1.0),
                    (T::Plague, 0.8),
                    (T::NaturalDisaster, 0.7),
                    (T::TechnologyAdvance, 0.6),
                    (T::DiplomaticChange, 0.5),
                    (T::MilitaryAction, 0.3),
                ]
            }
            Archetype::Scholar => {
                profile.max_attention_distance_km = 2500.0;
                profile.distance_falloff = 0.6;
                &[
                    (T::TechnologyAdvance, 1.0),
                    (T::CulturalShift, 0.9),
                    (T::ReligiousEvent, 0.7),
                    (T::Plague, 0.6),
                    (T::NaturalDisaster, 0.5),
                    (T::MilitaryAction, 0.2),
                ]
            }
            Archetype::Builder | Archetype::Administrator => {
                profile.max_attention_distance_km = 2000.0;
                profile.distance_falloff = 0.7;
                &[
                    (T::NaturalDisaster, 0.9),
                    (T::Plague, 0.9),
                    (T::EconomicCrisis, 0.8),
                    (T::TechnologyAdvance, 0.7),
                    (T::Rebellion, 0.6),
                    (T::TradeDisruption, 0.5),
                    (T::MilitaryAction, 0.3),
                ]
            }
            Archetype::Zealot => &[
                (T::ReligiousEvent, 1.0),
                (T::CulturalShift, 0.8),
                (T::SuccessionCrisis, 0.6),
            ],
            Archetype::Tyrant => &[
                (T::Rebellion, 1.0),
                (T::MilitaryAction, 0.9),
                (T::SuccessionCrisis, 0.8),
            ],
            Archetype::Reformer => &[
                (T::TechnologyAdvance, 0.9),
                (T::CulturalShift, 0.8),
                (T::EconomicCrisis, 0.7),
            ],
            Archetype::Balanced => {
                for kind in InformationType::ALL {
                    profile.type_weights.insert(kind, 0.5);
                }
                &[]
            }
        };

        profile.type_weights.extend(weights.iter().copied());
        profile
    }

    /// Interest in a packet type, if the actor cares at all.
    pub fn type_weight(&self, kind: InformationType) -> Option<f64> {
        self.type_weights.get(&kind).copied()
    }

    /// Whether a rival, an ally, or a watched region is involved.
    pub fn is_special_interest(&self, packet: &Packet) -> bool {
        let by_originator = !packet.originator.is_none()
            && (self.rivals.contains(&packet.originator) || self.allies.contains(&packet.originator));
        by_originator || self.watched_regions.contains(&packet.source_region)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a packet was or was not passed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    /// A rival, ally, or watched region is involved.
    SpecialInterest,
    /// The packet came from too far away.
    TooDistant,
    /// The actor does not care about this packet type.
    TypeNotRelevant,
    /// The score fell under the low threshold.
    BelowThreshold,
    /// Passed on normal scoring.
    Passed,
    /// No profile is registered for the actor.
    UnknownActor,
}

/// Outcome of filtering one packet for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttentionResult {
    /// Whether the actor receives the packet.
    pub should_receive: bool,
    /// Relevance to deliver at. Never below the packet's base relevance.
    pub adjusted_relevance: Relevance,
    /// Blended attention score in `[0, 1]`.
    pub score: f64,
    /// Game days before the actor acts on it.
    pub processing_delay_days: f64,
    /// Why.
    pub reason: FilterReason,
}

impl AttentionResult {
    fn rejected(packet: &Packet, score: f64, reason: FilterReason) -> Self {
        Self {
            should_receive: false,
            adjusted_relevance: packet.base_relevance,
            score,
            processing_delay_days: 0.0,
            reason,
        }
    }
}

/// Filter counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttentionStats {
    /// Filter evaluations run.
    pub filtered: u64,
    /// Evaluations that passed.
    pub passed: u64,
    /// Evaluations that were rejected.
    pub blocked: u64,
    /// Passes through the special-interest rule.
    pub special_interest: u64,
}

#[derive(Debug, Default)]
struct Counters {
    filtered: AtomicU64,
    passed: AtomicU64,
    blocked: AtomicU64,
    special_interest: AtomicU64,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Registry of attention profiles.
#[derive(Debug, Default)]
pub struct AttentionFilter {
    config: AttentionConfig,
    profiles: BTreeMap<ActorId, AttentionProfile>,
    counters: Counters,
}

impl AttentionFilter {
    /// Create an empty filter.
    pub fn new(config: AttentionConfig) -> Self {
        Self {
            config,
            profiles: BTreeMap::new(),
            counters: Counters::default(),
        }
    }

    /// Register a nation actor with its archetype's template.
    pub fn register_nation(
        &mut self,
        actor: ActorId,
        entity: EntityId,
        name: &str,
        archetype: Archetype,
    ) {
        self.register(actor, entity, name, archetype);
    }

    /// Register a character actor with its archetype's template.
    pub fn register_character(
        &mut self,
        actor: ActorId,
        entity: EntityId,
        name: &str,
        archetype: Archetype,
    ) {
        self.register(actor, entity, name, archetype);
    }

    /// Register any actor with its archetype's template.
    pub fn register(&mut self, actor: ActorId, entity: EntityId, name: &str, archetype: Archetype) {
        let mut profile = AttentionProfile::from_template(archetype);
        profile.actor = actor;
        profile.entity = entity;
        profile.name = name.to_owned();
        debug!(actor = %actor, archetype = %archetype, "Attention profile registered");
        self.profiles.insert(actor, profile);
    }

    /// Remove an actor's profile.
    pub fn unregister(&mut self, actor: ActorId) -> bool {
        self.profiles.remove(&actor).is_some()
    }

    /// Replace an actor's profile. The actor and entity fields are kept.
    pub fn set_profile(&mut self, actor: ActorId, mut profile: AttentionProfile) -> bool {
        let Some(existing) = self.profiles.get_mut(&actor) else {
            return false;
        };
        profile.actor = existing.actor;
        profile.entity = existing.entity;
        *existing = profile;
        true
    }

    /// An actor's profile.
    pub fn profile(&self, actor: ActorId) -> Option<&AttentionProfile> {
        self.profiles.get(&actor)
    }

    /// Registered actors in id order.
    pub fn actor_list(&self) -> Vec<ActorId> {
        self.profiles.keys().copied().collect()
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profiles are registered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Mark `a` and `b` as rivals (or clear it). Every actor speaking for
    /// either entity is updated.
    pub fn set_rivalry(&mut self, a: EntityId, b: EntityId, rivals: bool) {
        self.update_pair(a, b, rivals, |profile| &mut profile.rivals);
    }

    /// Mark `a` and `b` as allies (or clear it).
    pub fn set_alliance(&mut self, a: EntityId, b: EntityId, allied: bool) {
        self.update_pair(a, b, allied, |profile| &mut profile.allies);
    }

    fn update_pair<F>(&mut self, a: EntityId, b: EntityId, on: bool, set: F)
    where
        F: Fn(&mut AttentionProfile) -> &mut BTreeSet<EntityId>,
    {
        for profile in self.profiles.values_mut() {
            let other = if profile.entity == a {
                b
            } else if profile.entity == b {
                a
            } else {
                continue;
            };
            let entries = set(profile);
            if on {
                entries.insert(other);
            } else {
                entries.remove(&other);
            }
        }
    }

    /// Start watching a region.
    pub fn watch_region(&mut self, actor: ActorId, region: RegionId) -> bool {
        self.profiles
            .get_mut(&actor)
            .is_some_and(|profile| profile.watched_regions.insert(region))
    }

    /// Stop watching a region.
    pub fn unwatch_region(&mut self, actor: ActorId, region: RegionId) -> bool {
        self.profiles
            .get_mut(&actor)
            .is_some_and(|profile| profile.watched_regions.remove(&region))
    }

    /// Set the multiplier applied to every score.
    pub fn set_global_multiplier(&mut self, multiplier: f64) {
        self.config.global_multiplier = multiplier.max(0.0);
    }

    /// Current configuration.
    pub const fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Filter a packet for a registered actor.
    pub fn filter_information(&self, packet: &Packet, actor: ActorId) -> AttentionResult {
        let result = self.profiles.get(&actor).map_or_else(
            || AttentionResult::rejected(packet, 0.0, FilterReason::UnknownActor),
            |profile| self.evaluate(packet, profile),
        );
        self.count(&result);
        debug!(
            actor = %actor,
            packet = %packet.id,
            receive = result.should_receive,
            score = result.score,
            reason = ?result.reason,
            "Attention filter"
        );
        result
    }

    /// Score a packet against a profile without touching statistics.
    pub fn evaluate(&self, packet: &Packet, profile: &AttentionProfile) -> AttentionResult {
        if profile.is_special_interest(packet) {
            return AttentionResult {
                should_receive: true,
                adjusted_relevance: Relevance::Critical,
                score: 1.0,
                processing_delay_days: self.config.critical_delay_days,
                reason: FilterReason::SpecialInterest,
            };
        }

        let distance = f64::from(packet.hop_count) * self.config.km_per_hop;
        if distance > profile.max_attention_distance_km {
            return AttentionResult::rejected(packet, 0.0, FilterReason::TooDistant);
        }

        let weight = match profile.type_weight(packet.kind) {
            Some(weight) if weight > self.config.type_weight_floor => weight,
            _ => return AttentionResult::rejected(packet, 0.0, FilterReason::TypeNotRelevant),
        };

        let blended = weight * self.config.type_weight
            + packet.severity * self.config.severity_weight
            + packet.accuracy * self.config.accuracy_weight
            + packet.base_relevance.weight() * self.config.relevance_weight;
        let score = (blended * self.config.global_multiplier).clamp(0.0, 1.0);

        if score < profile.low_threshold {
            return AttentionResult::rejected(packet, score, FilterReason::BelowThreshold);
        }

        let (bucket, delay) = if score >= profile.critical_threshold {
            (Relevance::Critical, self.config.critical_delay_days)
        } else if score >= profile.high_threshold {
            (Relevance::High, self.config.high_delay_days)
        } else if score >= profile.medium_threshold {
            (Relevance::Medium, self.config.medium_delay_days)
        } else {
            (Relevance::Low, self.config.low_delay_days)
        };

        AttentionResult {
            should_receive: true,
            adjusted_relevance: bucket.max(packet.base_relevance),
            score,
            processing_delay_days: delay,
            reason: FilterReason::Passed,
        }
    }

    /// Every registered actor that would receive the packet, in id order.
    pub fn get_interested_actors(
        &self,
        packet: &Packet,
        nations_only: bool,
    ) -> Vec<(ActorId, AttentionResult)> {
        self.profiles
            .keys()
            .filter(|actor| !nations_only || ActorKind::classify(**actor) == Some(ActorKind::Nation))
            .map(|actor| (*actor, self.filter_information(packet, *actor)))
            .filter(|(_, result)| result.should_receive)
            .collect()
    }

    fn count(&self, result: &AttentionResult) {
        self.counters.filtered.fetch_add(1, Ordering::Relaxed);
        if result.should_receive {
            self.counters.passed.fetch_add(1, Ordering::Relaxed);
            if result.reason == FilterReason::SpecialInterest {
                self.counters.special_interest.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.counters.blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of the counters.
    pub fn statistics(&self) -> AttentionStats {
        AttentionStats {
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            passed: self.counters.passed.load(Ordering::Relaxed),
            blocked: self.counters.blocked.load(Ordering::Relaxed),
            special_interest: self.counters.special_interest.load(Ordering::Relaxed),
        }
    }

    /// Zero the counters.
    pub fn reset_statistics(&self) {
        self.counters.filtered.store(0, Ordering::Relaxed);
        self.counters.passed.store(0, Ordering::Relaxed);
        self.counters.blocked.store(0, Ordering::Relaxed);
        self.counters.special_interest.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const NATION: ActorId = ActorId(1000);
    const CHARACTER: ActorId = ActorId(5000);

    fn packet(kind: InformationType, severity: f64) -> Packet {
        let at = NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Packet::new(kind, RegionId(1), EntityId(9), severity, at)
    }

    fn filter() -> AttentionFilter {
        let mut filter = AttentionFilter::new(AttentionConfig::default());
        filter.register_nation(NATION, EntityId(1), "Avaria", Archetype::Conqueror);
        filter.register_character(CHARACTER, EntityId(100), "Lady Mira", Archetype::Scholar);
        filter
    }

    #[test]
    fn unmapped_types_are_not_relevant() {
        let filter = filter();
        let result = filter.filter_information(&packet(InformationType::Plague, 0.9), NATION);
        assert!(!result.should_receive);
        assert_eq!(result.reason, FilterReason::TypeNotRelevant);
    }

    #[test]
    fn weight_at_the_floor_is_not_enough() {
        let filter = filter();
        let mut profile = AttentionProfile::from_template(Archetype::Zealot);
        profile.type_weights.insert(InformationType::Plague, 0.1);
        let at_floor = filter.evaluate(&packet(InformationType::Plague, 0.9), &profile);
        assert_eq!(at_floor.reason, FilterReason::TypeNotRelevant);

        profile.type_weights.insert(InformationType::Plague, 0.11);
        let above = filter.evaluate(&packet(InformationType::Plague, 0.9), &profile);
        assert_ne!(above.reason, FilterReason::TypeNotRelevant);
    }

    #[test]
    fn severe_military_news_is_critical_for_conquerors() {
        let filter = filter();
        let result =
            filter.filter_information(&packet(InformationType::MilitaryAction, 0.9), NATION);
        assert!(result.should_receive);
        assert_eq!(result.adjusted_relevance, Relevance::Critical);
        assert!(result.processing_delay_days.abs() < f64::EPSILON);
        assert!(result.score > 0.9);
    }

    #[test]
    fn relevance_is_never_downgraded() {
        let filter = filter();
        // Scholars barely care about war: the score buckets low but the
        // base relevance of a severe battle survives.
        let result =
            filter.filter_information(&packet(InformationType::MilitaryAction, 0.9), CHARACTER);
        assert!(result.should_receive);
        assert_eq!(result.adjusted_relevance, Relevance::Critical);
        assert!(result.processing_delay_days > 0.0);
    }

    #[test]
    fn distance_proxy_rejects_far_packets() {
        let filter = filter();
        let mut far = packet(InformationType::TechnologyAdvance, 0.9);
        far.hop_count = 13;
        let result = filter.filter_information(&far, CHARACTER);
        assert_eq!(result.reason, FilterReason::TooDistant);
    }

    #[test]
    fn special_interest_bypasses_every_filter() {
        let mut filter = filter();
        filter.set_rivalry(EntityId(100), EntityId(9), true);
        let mut far = packet(InformationType::Plague, 0.0);
        far.hop_count = 50;
        let result = filter.filter_information(&far, CHARACTER);
        assert!(result.should_receive);
        assert_eq!(result.reason, FilterReason::SpecialInterest);
        assert_eq!(result.adjusted_relevance, Relevance::Critical);

        filter.set_rivalry(EntityId(100), EntityId(9), false);
        assert!(!filter.filter_information(&far, CHARACTER).should_receive);
    }

    #[test]
    fn watched_regions_are_special() {
        let mut filter = filter();
        assert!(filter.watch_region(NATION, RegionId(1)));
        let result = filter.filter_information(&packet(InformationType::CulturalShift, 0.1), NATION);
        assert_eq!(result.reason, FilterReason::SpecialInterest);
        assert!(filter.unwatch_region(NATION, RegionId(1)));
        assert!(!filter.watch_region(ActorId(4242), RegionId(1)));
    }

    #[test]
    fn filtering_is_deterministic() {
        let filter = filter();
        let p = packet(InformationType::DiplomaticChange, 0.4);
        let first = filter.filter_information(&p, NATION);
        let second = filter.filter_information(&p, NATION);
        assert_eq!(first, second);
    }

    #[test]
    fn low_scores_are_blocked() {
        let mut filter = filter();
        filter.set_global_multiplier(0.1);
        let result = filter.filter_information(&packet(InformationType::MilitaryAction, 0.1), CHARACTER);
        assert_eq!(result.reason, FilterReason::BelowThreshold);
    }

    #[test]
    fn unknown_actor_is_rejected() {
        let filter = filter();
        let result = filter.filter_information(&packet(InformationType::MilitaryAction, 1.0), ActorId(7));
        assert_eq!(result.reason, FilterReason::UnknownActor);
    }

    #[test]
    fn interested_actors_can_be_limited_to_nations() {
        let filter = filter();
        let p = packet(InformationType::MilitaryAction, 0.9);
        let all = filter.get_interested_actors(&p, false);
        assert_eq!(all.len(), 2);
        let nations = filter.get_interested_actors(&p, true);
        assert_eq!(nations.len(), 1);
        assert_eq!(nations.first().map(|(a, _)| *a), Some(NATION));
    }

    #[test]
    fn balanced_template_covers_every_type() {
        let profile = AttentionProfile::from_template(Archetype::Balanced);
        assert_eq!(profile.type_weights.len(), InformationType::ALL.len());
    }

    #[test]
    fn statistics_count_outcomes() {
        let filter = filter();
        filter.filter_information(&packet(InformationType::MilitaryAction, 0.9), NATION);
        filter.filter_information(&packet(InformationType::Plague, 0.9), NATION);
        let stats = filter.statistics();
        assert_eq!(stats.filtered, 2);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.blocked, 1);
        filter.reset_statistics();
        assert_eq!(filter.statistics(), AttentionStats::default());
    }
}
