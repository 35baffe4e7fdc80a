//! Nation-level strategic agent.
//!
//! A [`NationAgent`] speaks for one realm. It keeps a threat map and a
//! relationship score for every realm it has relations with, remembers
//! recent events, and queues four kinds of decisions: war declarations,
//! military posture changes, diplomatic proposals, and economic policy.
//!
//! Traits come from the archetype. Aggressive, risk-tolerant nations
//! declare war at a lower desirability threshold; long stretches of
//! military or economic trouble slowly make any nation more cautious.

use std::collections::{BTreeMap, VecDeque};

use chrono::{NaiveDateTime, TimeDelta};
use herald_types::{
    ActorId, Archetype, DiplomaticAction, EconomicPolicy, EntityId, InformationType, Intent,
    MilitaryPosture, NationPersonality, Packet, RegionId,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::agent::DecisionAgent;
use crate::config::AgentConfig;
use crate::context::{AgentContext, RealmRelation, RealmSnapshot};
use crate::error::AgentError;
use crate::memory::{MemoryEntry, MemoryStore, impact_of};

/// Military news above this severity triggers a review of military needs.
const SEVERE_MILITARY_NEWS: f64 = 0.7;

/// Economic news above this severity triggers an economic policy review.
const SEVERE_ECONOMIC_NEWS: f64 = 0.6;

/// Relative strength assumed when the other realm's armies are unknown.
const RELATIVE_STRENGTH_FALLBACK: f64 = 1.25;

/// Minimum expected success before a war is declared.
const MIN_WAR_SUCCESS: f64 = 0.4;

/// Soldiers each region should be able to field.
const TROOPS_PER_REGION: f64 = 200.0;

// ---------------------------------------------------------------------------
// Traits and goals
// ---------------------------------------------------------------------------

/// Long-term aims of a nation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategicGoal {
    /// Take land.
    Expansion,
    /// Hold and stabilize what is owned.
    Consolidation,
    /// Grow the treasury.
    EconomicGrowth,
    /// Lead the web of alliances.
    DiplomaticDominance,
    /// Out-invent the neighbours.
    TechnologicalAdvancement,
    /// Spread culture and faith.
    CulturalSupremacy,
    /// Avoid collapse.
    Survival,
}

/// How dangerous another realm is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    /// No real danger.
    #[default]
    Minimal,
    /// Worth watching.
    Low,
    /// A genuine rival.
    Moderate,
    /// Could take significant land.
    Severe,
    /// Could end the realm.
    Existential,
}

impl ThreatLevel {
    /// Bucket a raw threat score.
    pub fn from_score(score: f64) -> Self {
        if score > 2.0 {
            Self::Existential
        } else if score > 1.5 {
            Self::Severe
        } else if score > 1.0 {
            Self::Moderate
        } else if score > 0.5 {
            Self::Low
        } else {
            Self::Minimal
        }
    }

    /// Position on the scale, 0 for minimal to 4 for existential.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Minimal => 0,
            Self::Low => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
            Self::Existential => 4,
        }
    }
}

/// Personality parameters of a nation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NationTraits {
    /// Appetite for war, in `[0.1, 0.9]` once drift applies.
    pub aggressiveness: f64,
    /// Willingness to gamble, in `[0.1, 0.9]` once drift applies.
    pub risk_tolerance: f64,
    /// Main aim.
    pub primary_goal: StrategicGoal,
    /// Fallback aim.
    pub secondary_goal: StrategicGoal,
}

impl NationTraits {
    /// Starting traits for an archetype.
    pub const fn for_archetype(archetype: Archetype) -> Self {
        let (aggressiveness, risk_tolerance, primary_goal, secondary_goal) = match archetype {
            Archetype::Conqueror | Archetype::WarriorKing => {
                (0.8, 0.7, StrategicGoal::Expansion, StrategicGoal::Consolidation)
            }
            Archetype::Diplomat => (
                0.3,
                0.4,
                StrategicGoal::DiplomaticDominance,
                StrategicGoal::EconomicGrowth,
            ),
            Archetype::Merchant => (
                0.2,
                0.5,
                StrategicGoal::EconomicGrowth,
                StrategicGoal::TechnologicalAdvancement,
            ),
            Archetype::Scholar => (
                0.1,
                0.3,
                StrategicGoal::TechnologicalAdvancement,
                StrategicGoal::CulturalSupremacy,
            ),
            Archetype::Builder | Archetype::Administrator => (
                0.3,
                0.4,
                StrategicGoal::Consolidation,
                StrategicGoal::EconomicGrowth,
            ),
            Archetype::Tyrant => (0.9, 0.8, StrategicGoal::Expansion, StrategicGoal::Consolidation),
            Archetype::Zealot | Archetype::Reformer | Archetype::Balanced => (
                0.5,
                0.5,
                StrategicGoal::Consolidation,
                StrategicGoal::EconomicGrowth,
            ),
        };
        Self {
            aggressiveness,
            risk_tolerance,
            primary_goal,
            secondary_goal,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Evaluation of a war against one realm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WarDecision {
    /// Realm to attack.
    pub target: EntityId,
    /// Chance of winning.
    pub expected_success: f64,
    /// A year of military upkeep.
    pub expected_cost: f64,
    /// How much the nation wants the war.
    pub desirability: f64,
    /// Whether every gate passed.
    pub should_declare: bool,
}

/// Queued military posture change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MilitaryDecision {
    /// Posture to adopt.
    pub posture: MilitaryPosture,
    /// Region concerned, if any.
    pub region: Option<RegionId>,
    /// Troops or gold.
    pub amount: f64,
}

/// Queued diplomatic proposal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiplomaticDecision {
    /// Proposal kind.
    pub action: DiplomaticAction,
    /// Realm addressed.
    pub target: EntityId,
    /// Value to the proposer.
    pub value: f64,
}

/// Queued economic policy change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EconomicDecision {
    /// Policy to enact.
    pub policy: EconomicPolicy,
    /// Rate change or gold.
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Strategic AI for one realm.
#[derive(Debug, Clone)]
pub struct NationAgent {
    actor: ActorId,
    entity: EntityId,
    name: String,
    archetype: Archetype,
    personality: NationPersonality,
    traits: NationTraits,
    threats: BTreeMap<EntityId, ThreatLevel>,
    relationships: BTreeMap<EntityId, f64>,
    memory: MemoryStore,
    war_queue: VecDeque<WarDecision>,
    military_queue: VecDeque<MilitaryDecision>,
    diplomatic_queue: VecDeque<DiplomaticDecision>,
    economic_queue: VecDeque<EconomicDecision>,
    review_interval: TimeDelta,
    last_review: Option<NaiveDateTime>,
}

impl NationAgent {
    /// Create a nation agent with its archetype's starting traits.
    pub fn new(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        archetype: Archetype,
        config: &AgentConfig,
    ) -> Self {
        Self {
            actor,
            entity,
            name: name.into(),
            archetype,
            personality: archetype.nation_personality(),
            traits: NationTraits::for_archetype(archetype),
            threats: BTreeMap::new(),
            relationships: BTreeMap::new(),
            memory: MemoryStore::new(config.nation_memory_capacity, config.memory_lifetime_hours),
            war_queue: VecDeque::new(),
            military_queue: VecDeque::new(),
            diplomatic_queue: VecDeque::new(),
            economic_queue: VecDeque::new(),
            review_interval: TimeDelta::try_hours(config.strategy_review_hours)
                .unwrap_or(TimeDelta::MAX),
            last_review: None,
        }
    }

    /// Current traits.
    pub const fn traits(&self) -> &NationTraits {
        &self.traits
    }

    /// Strategic personality.
    pub const fn personality(&self) -> NationPersonality {
        self.personality
    }

    /// Assessed threat from another realm.
    pub fn threat_level(&self, other: EntityId) -> ThreatLevel {
        self.threats.get(&other).copied().unwrap_or_default()
    }

    /// Cached relationship score with another realm.
    pub fn relationship_score(&self, other: EntityId) -> Option<f64> {
        self.relationships.get(&other).copied()
    }

    /// Remembered events.
    pub const fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Queued war declarations, oldest first.
    pub fn queued_wars(&self) -> impl Iterator<Item = &WarDecision> {
        self.war_queue.iter()
    }

    /// Queued military decisions, oldest first.
    pub fn queued_military(&self) -> impl Iterator<Item = &MilitaryDecision> {
        self.military_queue.iter()
    }

    /// Queued diplomatic decisions, oldest first.
    pub fn queued_diplomacy(&self) -> impl Iterator<Item = &DiplomaticDecision> {
        self.diplomatic_queue.iter()
    }

    /// Queued economic decisions, oldest first.
    pub fn queued_economy(&self) -> impl Iterator<Item = &EconomicDecision> {
        self.economic_queue.iter()
    }

    // -- Evaluation ----------------------------------------------------------

    fn own_realm(&self, ctx: &AgentContext<'_>) -> Result<RealmSnapshot, AgentError> {
        ctx.realm(self.entity)
            .ok_or(AgentError::RealmUnavailable(self.entity))
    }

    fn relation_score(relation: &RealmRelation) -> f64 {
        let mut score = relation.opinion / 100.0;
        if relation.allied {
            score += 0.5;
        }
        if relation.at_war {
            score -= 1.0;
        }
        if relation.trade {
            score += 0.2;
        }
        score
    }

    fn relationship(&self, ctx: &AgentContext<'_>, other: EntityId) -> f64 {
        self.relationships.get(&other).copied().unwrap_or_else(|| {
            ctx.relation(self.entity, other)
                .map_or(0.0, |relation| Self::relation_score(&relation))
        })
    }

    /// Our military strength divided by theirs.
    pub fn relative_strength(
        &self,
        ctx: &AgentContext<'_>,
        other: EntityId,
    ) -> Result<f64, AgentError> {
        let ours = self.own_realm(ctx)?.military_strength();
        Ok(ctx
            .realm(other)
            .map_or(RELATIVE_STRENGTH_FALLBACK, |theirs| {
                ours / theirs.military_strength().max(1.0)
            }))
    }

    /// How much this nation wants a war with `target`, in `[0, 1]`.
    pub fn war_desirability(&self, ctx: &AgentContext<'_>, target: EntityId) -> f64 {
        let mut desirability = self.traits.aggressiveness;
        match self.traits.primary_goal {
            StrategicGoal::Expansion => desirability += 0.3,
            StrategicGoal::Survival => desirability -= 0.5,
            _ => {}
        }
        desirability += f64::from(self.threat_level(target).rank()) * 0.1;
        desirability -= self.relationship(ctx, target) * 0.3;
        desirability.clamp(0.0, 1.0)
    }

    /// Decide whether a war against `target` is worth declaring.
    pub fn evaluate_war(
        &self,
        ctx: &AgentContext<'_>,
        target: EntityId,
    ) -> Result<WarDecision, AgentError> {
        let own = self.own_realm(ctx)?;
        let expected_success = (self.relative_strength(ctx, target)? * 0.7).min(1.0);
        let expected_cost = own.monthly_expenses * 12.0;
        let desirability = self.war_desirability(ctx, target);
        let threshold = 0.5 - self.traits.aggressiveness * 0.3;

        let should_declare = desirability > threshold
            && expected_success > MIN_WAR_SUCCESS
            && expected_cost < own.treasury * 0.5;

        Ok(WarDecision {
            target,
            expected_success,
            expected_cost,
            desirability,
            should_declare,
        })
    }

    fn alliance_value(&self, ctx: &AgentContext<'_>, target: EntityId) -> f64 {
        let ours = ctx
            .realm(self.entity)
            .map_or(0.0, |realm| realm.military_strength());
        let theirs = ctx
            .realm(target)
            .map_or(0.0, |realm| realm.military_strength());
        let strength = (theirs / ours.max(1.0)).min(1.0);
        let goodwill = self.relationship(ctx, target).clamp(0.0, 1.0);
        (strength * 0.5 + goodwill * 0.5).clamp(0.0, 1.0)
    }

    fn trade_value(&self, ctx: &AgentContext<'_>, target: EntityId) -> f64 {
        let ours = ctx.realm(self.entity).map_or(0.0, |realm| realm.monthly_income);
        let theirs = ctx.realm(target).map_or(0.0, |realm| realm.monthly_income);
        ((theirs / ours.max(1.0)) * 0.5).clamp(0.0, 1.0)
    }

    /// Pick a diplomatic stance toward `target`.
    pub fn evaluate_diplomacy(&self, ctx: &AgentContext<'_>, target: EntityId) -> DiplomaticDecision {
        let score = self.relationship(ctx, target);
        let (action, value) = if score > 0.5 {
            (DiplomaticAction::ProposeAlliance, self.alliance_value(ctx, target))
        } else if score > 0.0 {
            (DiplomaticAction::OfferTrade, self.trade_value(ctx, target))
        } else if score < -0.5 && self.traits.aggressiveness > 0.6 {
            (DiplomaticAction::Denounce, score.abs().min(1.0))
        } else {
            (DiplomaticAction::ImproveRelations, 0.1)
        };
        DiplomaticDecision {
            action,
            target,
            value,
        }
    }

    /// Pick an economic policy for the current balance sheet.
    pub fn evaluate_economic_policy(
        &self,
        ctx: &AgentContext<'_>,
    ) -> Result<EconomicDecision, AgentError> {
        let own = self.own_realm(ctx)?;
        let pressure = own.monthly_expenses / own.monthly_income.max(1.0);
        let decision = if pressure > 1.2 {
            EconomicDecision {
                policy: EconomicPolicy::AdjustTaxes,
                amount: 0.02,
            }
        } else if pressure < 0.5 && own.treasury > 5000.0 {
            EconomicDecision {
                policy: EconomicPolicy::InvestInfrastructure,
                amount: 1000.0,
            }
        } else {
            EconomicDecision {
                policy: EconomicPolicy::PromoteTrade,
                amount: 100.0,
            }
        };
        Ok(decision)
    }

    /// Compare current armies against the combined threat.
    pub fn evaluate_military_needs(
        &self,
        ctx: &AgentContext<'_>,
    ) -> Result<MilitaryDecision, AgentError> {
        let current = self.own_realm(ctx)?.military_strength();
        let total_threat: f64 = self
            .threats
            .values()
            .map(|level| f64::from(level.rank()) / 4.0)
            .sum();
        let needed = total_threat * 1000.0;

        let decision = if current < needed * 0.7 {
            MilitaryDecision {
                posture: MilitaryPosture::RaiseLevies,
                region: None,
                amount: needed - current,
            }
        } else if current > needed * 1.5 {
            MilitaryDecision {
                posture: MilitaryPosture::DisbandLevies,
                region: None,
                amount: current - needed,
            }
        } else {
            MilitaryDecision {
                posture: MilitaryPosture::Fortify,
                region: None,
                amount: 0.0,
            }
        };
        Ok(decision)
    }

    // -- State updates -------------------------------------------------------

    /// Reassess every realm this nation has relations with.
    ///
    /// A severe threat the nation is not already fighting either earns a
    /// pre-emptive war (aggressive, risk-tolerant nations) or fortification.
    pub fn update_threat_assessment(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        for (other, relation) in ctx.relations(self.entity) {
            if other == self.entity {
                continue;
            }
            let strength = self.relative_strength(ctx, other)?;
            let goodwill = Self::relation_score(&relation);
            let score = (1.0 / strength.max(0.1)) * (1.0 - goodwill);
            let level = ThreatLevel::from_score(score);
            self.threats.insert(other, level);

            if level >= ThreatLevel::Severe && !relation.at_war {
                if self.traits.aggressiveness > 0.6 && self.traits.risk_tolerance > 0.5 {
                    let war = self.evaluate_war(ctx, other)?;
                    if war.should_declare {
                        self.queue_war(war);
                    }
                } else {
                    self.queue_military(MilitaryDecision {
                        posture: MilitaryPosture::Fortify,
                        region: None,
                        amount: 0.0,
                    });
                }
            }
        }
        Ok(())
    }

    /// Refresh relationship scores and look for allies against threats.
    pub fn update_diplomatic_stance(&mut self, ctx: &AgentContext<'_>) {
        let relations = ctx.relations(self.entity);
        for (other, relation) in &relations {
            self.relationships
                .insert(*other, Self::relation_score(relation));
        }

        for (other, relation) in &relations {
            let score = self.relationship(ctx, *other);
            if score < -0.5 && self.threat_level(*other) >= ThreatLevel::Moderate {
                let ally = relations
                    .iter()
                    .filter(|(candidate, r)| candidate != other && !r.allied)
                    .map(|(candidate, _)| (*candidate, self.relationship(ctx, *candidate)))
                    .filter(|(_, s)| *s > 0.3)
                    .max_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((ally, _)) = ally {
                    let value = self.alliance_value(ctx, ally);
                    self.queue_diplomacy(DiplomaticDecision {
                        action: DiplomaticAction::ProposeAlliance,
                        target: ally,
                        value,
                    });
                }
            } else if score > 0.7 && !relation.allied {
                let value = self.alliance_value(ctx, *other);
                self.queue_diplomacy(DiplomaticDecision {
                    action: DiplomaticAction::ProposeAlliance,
                    target: *other,
                    value,
                });
            }
        }
    }

    /// Queue tax or investment changes when the books call for them.
    pub fn update_economy(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        let own = self.own_realm(ctx)?;
        let health = own.monthly_income / own.monthly_expenses.max(1.0);
        if health < 0.5 && own.treasury < own.monthly_expenses * 3.0 {
            self.queue_economy(EconomicDecision {
                policy: EconomicPolicy::AdjustTaxes,
                amount: 0.15,
            });
        } else if health > 2.0 && self.traits.primary_goal == StrategicGoal::EconomicGrowth {
            self.queue_economy(EconomicDecision {
                policy: EconomicPolicy::InvestInfrastructure,
                amount: own.treasury * 0.1,
            });
        }
        Ok(())
    }

    /// Keep armies in line with the nation's goals.
    pub fn update_military(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        let own = self.own_realm(ctx)?;
        let troops = own.levy_size.max(0.0) + own.standing_army.max(0.0);
        let capacity = f64::from(own.region_count) * TROOPS_PER_REGION;
        let readiness = if capacity > 0.0 { troops / capacity } else { 1.0 };

        match self.traits.primary_goal {
            StrategicGoal::Expansion if readiness < 0.7 => {
                self.queue_military(MilitaryDecision {
                    posture: MilitaryPosture::RaiseLevies,
                    region: None,
                    amount: (capacity * 0.7 - troops).max(0.0),
                });
            }
            StrategicGoal::Survival if readiness < 0.5 => {
                self.queue_military(MilitaryDecision {
                    posture: MilitaryPosture::HireMercenaries,
                    region: None,
                    amount: 500.0,
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Re-derive goals from the realm's situation.
    pub fn set_strategic_goals(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        let own = self.own_realm(ctx)?;
        let (primary, secondary) = if own.stability < 0.3 {
            (StrategicGoal::Survival, StrategicGoal::Consolidation)
        } else {
            match self.personality {
                NationPersonality::Expansionist | NationPersonality::Aggressive => {
                    if own.military_strength() > own.monthly_income * 12.0 {
                        (StrategicGoal::Expansion, StrategicGoal::Consolidation)
                    } else {
                        (StrategicGoal::EconomicGrowth, StrategicGoal::Consolidation)
                    }
                }
                NationPersonality::Diplomatic => (
                    StrategicGoal::DiplomaticDominance,
                    StrategicGoal::EconomicGrowth,
                ),
                NationPersonality::Economic => (
                    StrategicGoal::EconomicGrowth,
                    StrategicGoal::TechnologicalAdvancement,
                ),
                NationPersonality::Technological => (
                    StrategicGoal::TechnologicalAdvancement,
                    StrategicGoal::CulturalSupremacy,
                ),
                NationPersonality::Religious => {
                    (StrategicGoal::CulturalSupremacy, StrategicGoal::Consolidation)
                }
                NationPersonality::Developmental if own.stability < 0.6 => {
                    (StrategicGoal::Consolidation, StrategicGoal::EconomicGrowth)
                }
                NationPersonality::Developmental => {
                    (StrategicGoal::EconomicGrowth, StrategicGoal::Consolidation)
                }
                NationPersonality::Progressive => (
                    StrategicGoal::TechnologicalAdvancement,
                    StrategicGoal::EconomicGrowth,
                ),
                NationPersonality::Balanced => {
                    (StrategicGoal::Consolidation, StrategicGoal::EconomicGrowth)
                }
            }
        };
        self.traits.primary_goal = primary;
        self.traits.secondary_goal = secondary;
        Ok(())
    }

    /// Repeated bad news makes a nation more careful.
    pub fn adjust_personality_weights(&mut self) {
        if self.memory.count_of(InformationType::MilitaryAction) > 5 {
            self.traits.aggressiveness *= 0.95;
            self.traits.risk_tolerance *= 0.95;
        }
        if self.memory.count_of(InformationType::EconomicCrisis) > 3 {
            self.traits.risk_tolerance *= 0.9;
        }
        self.traits.aggressiveness = self.traits.aggressiveness.clamp(0.1, 0.9);
        self.traits.risk_tolerance = self.traits.risk_tolerance.clamp(0.1, 0.9);
    }

    fn review_strategy(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        self.set_strategic_goals(ctx)?;
        self.update_threat_assessment(ctx)?;
        self.adjust_personality_weights();
        self.last_review = Some(ctx.now);
        debug!(
            nation = %self.entity,
            goal = ?self.traits.primary_goal,
            aggressiveness = self.traits.aggressiveness,
            "Strategy reviewed"
        );
        Ok(())
    }

    fn review_due(&self, now: NaiveDateTime) -> bool {
        self.last_review
            .is_none_or(|last| now.signed_duration_since(last) >= self.review_interval)
    }

    // -- Queues --------------------------------------------------------------

    fn queue_war(&mut self, war: WarDecision) {
        if self.war_queue.iter().any(|w| w.target == war.target) {
            return;
        }
        info!(
            nation = %self.entity,
            target = %war.target,
            success = war.expected_success,
            desirability = war.desirability,
            "War decision queued"
        );
        self.war_queue.push_back(war);
    }

    fn queue_military(&mut self, decision: MilitaryDecision) {
        if self
            .military_queue
            .iter()
            .any(|m| m.posture == decision.posture && m.region == decision.region)
        {
            return;
        }
        self.military_queue.push_back(decision);
    }

    fn queue_diplomacy(&mut self, decision: DiplomaticDecision) {
        if self
            .diplomatic_queue
            .iter()
            .any(|d| d.action == decision.action && d.target == decision.target)
        {
            return;
        }
        self.diplomatic_queue.push_back(decision);
    }

    fn queue_economy(&mut self, decision: EconomicDecision) {
        if self.economic_queue.iter().any(|e| e.policy == decision.policy) {
            return;
        }
        self.economic_queue.push_back(decision);
    }

    fn remember(&mut self, packet: &Packet, now: NaiveDateTime) {
        self.memory.record(MemoryEntry {
            subject: packet.originator,
            kind: packet.kind,
            description: packet.description.clone(),
            impact: impact_of(packet.kind, packet.severity),
            when: now,
        });
    }
}

impl DecisionAgent for NationAgent {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn entity(&self) -> EntityId {
        self.entity
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn archetype(&self) -> Archetype {
        self.archetype
    }

    fn process_information(
        &mut self,
        packet: &Packet,
        ctx: &AgentContext<'_>,
    ) -> Result<(), AgentError> {
        let foreign = !packet.originator.is_none() && packet.originator != self.entity;

        match packet.kind {
            InformationType::MilitaryAction => {
                self.update_threat_assessment(ctx)?;
                if packet.severity > SEVERE_MILITARY_NEWS {
                    let needs = self.evaluate_military_needs(ctx)?;
                    if needs.posture == MilitaryPosture::RaiseLevies {
                        self.queue_military(needs);
                    }
                }
            }
            InformationType::DiplomaticChange | InformationType::AllianceFormation => {
                self.update_diplomatic_stance(ctx);
                if foreign {
                    let decision = self.evaluate_diplomacy(ctx, packet.originator);
                    self.queue_diplomacy(decision);
                }
            }
            InformationType::EconomicCrisis if packet.severity > SEVERE_ECONOMIC_NEWS => {
                let policy = self.evaluate_economic_policy(ctx)?;
                self.queue_economy(policy);
            }
            InformationType::SuccessionCrisis if foreign => {
                let war = self.evaluate_war(ctx, packet.originator)?;
                if war.should_declare {
                    self.queue_war(war);
                }
            }
            InformationType::Rebellion if ctx.owns_region(self.entity, packet.source_region) => {
                self.queue_military(MilitaryDecision {
                    posture: MilitaryPosture::MoveArmies,
                    region: Some(packet.source_region),
                    amount: packet.severity * 1000.0,
                });
            }
            _ => {}
        }
        self.remember(packet, ctx.now);
        Ok(())
    }

    fn background_update(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        if self.review_due(ctx.now) {
            self.review_strategy(ctx)?;
        }
        self.update_economy(ctx)?;
        self.update_diplomatic_stance(ctx);
        self.update_military(ctx)?;
        self.memory.prune(ctx.now);
        Ok(())
    }

    fn execute_decisions(&mut self, _ctx: &AgentContext<'_>) -> Vec<Intent> {
        let mut intents = Vec::new();

        if let Some(war) = self.war_queue.pop_front() {
            info!(
                nation = %self.entity,
                target = %war.target,
                success = war.expected_success,
                "War declared"
            );
            intents.push(Intent::DeclareWar {
                target: war.target,
                expected_success: war.expected_success,
                desirability: war.desirability,
                expected_cost: war.expected_cost,
            });
        }
        if let Some(military) = self.military_queue.pop_front() {
            intents.push(Intent::Military {
                posture: military.posture,
                region: military.region,
                amount: military.amount,
            });
        }
        if let Some(diplomacy) = self.diplomatic_queue.pop_front() {
            intents.push(Intent::Diplomatic {
                action: diplomacy.action,
                target: diplomacy.target,
                value: diplomacy.value,
            });
        }
        if let Some(economy) = self.economic_queue.pop_front() {
            intents.push(Intent::Economic {
                policy: economy.policy,
                amount: economy.amount,
            });
        }

        intents
    }

    fn pending_decisions(&self) -> usize {
        self.war_queue
            .len()
            .saturating_add(self.military_queue.len())
            .saturating_add(self.diplomatic_queue.len())
            .saturating_add(self.economic_queue.len())
    }
}
