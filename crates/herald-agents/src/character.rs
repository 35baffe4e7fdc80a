//! Character-level personal agent.
//!
//! A [`CharacterAgent`] is a courtier, vassal, or schemer serving a realm.
//! Six personality traits, a mood, and a pair of ambitions drive four kinds
//! of decisions: plots, proposals to the liege, relationship actions, and
//! personal actions.
//!
//! Mood scales the traits the agent acts on: fear saps boldness and
//! ambition, anger and desperation sharpen them and erode loyalty.

use std::collections::{BTreeSet, VecDeque};

use chrono::{NaiveDateTime, TimeDelta};
use herald_types::{
    ActorId, Archetype, EntityId, InformationType, Intent, Packet, PersonalAction, PlotKind,
    ProposalKind, RelationshipAction,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::agent::DecisionAgent;
use crate::config::AgentConfig;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::memory::{MemoryEntry, MemoryStore, impact_of};
use crate::social::{FRIEND_THRESHOLD, OpinionGraph, RIVAL_THRESHOLD};

/// Plot desirability needed before a plot is worth executing.
const PLOT_DESIRABILITY_THRESHOLD: f64 = 0.6;

/// Minimum success chance for any plot.
const PLOT_SUCCESS_THRESHOLD: f64 = 0.3;

/// Success chance a crisis-driven plot needs before it is started.
const PLOT_VIABLE_SUCCESS: f64 = 0.4;

/// Plots kept in flight at once. The oldest is dropped beyond this.
const MAX_ACTIVE_PLOTS: usize = 5;

// ---------------------------------------------------------------------------
// Traits, moods, ambitions
// ---------------------------------------------------------------------------

/// Six personality traits, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CharacterTraits {
    /// Drive to rise.
    pub ambition: f64,
    /// Attachment to the liege.
    pub loyalty: f64,
    /// Reluctance to use dishonourable means.
    pub honor: f64,
    /// Love of gold.
    pub greed: f64,
    /// Willingness to take risks.
    pub boldness: f64,
    /// Care for others.
    pub compassion: f64,
}

impl CharacterTraits {
    /// Starting traits for an archetype.
    pub const fn for_archetype(archetype: Archetype) -> Self {
        let (ambition, loyalty, honor, greed, boldness, compassion) = match archetype {
            Archetype::Conqueror | Archetype::WarriorKing => (0.9, 0.4, 0.6, 0.5, 0.9, 0.3),
            Archetype::Diplomat => (0.6, 0.7, 0.7, 0.3, 0.4, 0.6),
            Archetype::Merchant => (0.7, 0.5, 0.5, 0.9, 0.6, 0.4),
            Archetype::Scholar => (0.5, 0.6, 0.8, 0.2, 0.3, 0.7),
            Archetype::Zealot => (0.8, 0.9, 0.9, 0.1, 0.8, 0.3),
            Archetype::Builder | Archetype::Administrator => (0.6, 0.8, 0.7, 0.4, 0.5, 0.6),
            Archetype::Tyrant => (0.9, 0.2, 0.2, 0.8, 0.9, 0.1),
            Archetype::Reformer => (0.7, 0.6, 0.8, 0.3, 0.7, 0.8),
            Archetype::Balanced => (0.5, 0.5, 0.5, 0.5, 0.5, 0.5),
        };
        Self {
            ambition,
            loyalty,
            honor,
            greed,
            boldness,
            compassion,
        }
    }
}

/// Current emotional state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Things are going well.
    Happy,
    /// Nothing to complain about.
    #[default]
    Content,
    /// Under pressure.
    Stressed,
    /// Wronged and resentful.
    Angry,
    /// Fearing for life or position.
    Afraid,
    /// Out of options.
    Desperate,
    /// Hungry for advancement.
    Ambitious,
}

/// What a character wants out of life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ambition {
    /// Nothing in particular.
    #[default]
    None,
    /// A title from the liege.
    GainTitle,
    /// Gold.
    AccumulateWealth,
    /// Land of their own.
    GainLand,
    /// A spouse or lover.
    FindLove,
    /// A seat of power.
    Power,
    /// Learning.
    Knowledge,
    /// Holiness.
    Piety,
    /// Something that outlives them.
    Legacy,
    /// Getting even with a rival.
    Revenge,
    /// Renown.
    IncreasePrestige,
}

impl Ambition {
    /// Starting primary and secondary ambitions for an archetype.
    pub const fn for_archetype(archetype: Archetype) -> (Self, Self) {
        match archetype {
            Archetype::Conqueror | Archetype::WarriorKing => {
                (Self::GainLand, Self::IncreasePrestige)
            }
            Archetype::Diplomat => (Self::Power, Self::GainTitle),
            Archetype::Merchant => (Self::AccumulateWealth, Self::Power),
            Archetype::Scholar => (Self::Knowledge, Self::Legacy),
            Archetype::Zealot => (Self::Piety, Self::Power),
            Archetype::Builder | Archetype::Administrator => (Self::Legacy, Self::GainTitle),
            Archetype::Tyrant => (Self::Power, Self::Revenge),
            Archetype::Reformer => (Self::Legacy, Self::Power),
            Archetype::Balanced => (Self::None, Self::None),
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Evaluation of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotDecision {
    /// Plot kind.
    pub kind: PlotKind,
    /// Who the plot is against.
    pub target: EntityId,
    /// Chance the plot succeeds.
    pub success_chance: f64,
    /// Chance of discovery.
    pub risk: f64,
    /// How much the character wants it.
    pub desirability: f64,
    /// Whether every gate passed.
    pub should_execute: bool,
}

/// A proposal to put to someone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProposalDecision {
    /// Proposal kind.
    pub kind: ProposalKind,
    /// Recipient.
    pub target: EntityId,
    /// Base chance the recipient says yes.
    pub acceptance_chance: f64,
}

/// A relationship action toward one character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelationshipDecision {
    /// Action.
    pub action: RelationshipAction,
    /// Other party.
    pub target: EntityId,
    /// How much the character wants it.
    pub desirability: f64,
}

/// Something a character does for themself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonalDecision {
    /// Action.
    pub action: PersonalAction,
    /// Expected benefit in `[0, 1]`.
    pub expected_benefit: f64,
    /// Gold spent.
    pub cost: f64,
}

impl PersonalDecision {
    /// Whether the benefit outweighs the cost counted in thousands of gold.
    pub fn is_worthwhile(&self) -> bool {
        self.expected_benefit > self.cost / 1000.0
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Personal AI for one character.
#[derive(Debug, Clone)]
pub struct CharacterAgent {
    actor: ActorId,
    entity: EntityId,
    name: String,
    archetype: Archetype,
    liege: EntityId,
    traits: CharacterTraits,
    mood: Mood,
    primary_ambition: Ambition,
    secondary_ambition: Ambition,
    ambition_since: Option<NaiveDateTime>,
    opinions: OpinionGraph,
    memory: MemoryStore,
    rivals: BTreeSet<EntityId>,
    friends: BTreeSet<EntityId>,
    lover: Option<EntityId>,
    mentor: Option<EntityId>,
    active_plots: Vec<PlotDecision>,
    plot_queue: VecDeque<PlotDecision>,
    proposal_queue: VecDeque<ProposalDecision>,
    relationship_queue: VecDeque<RelationshipDecision>,
    personal_queue: VecDeque<PersonalDecision>,
    review_interval: TimeDelta,
    achievement_time: TimeDelta,
    last_review: Option<NaiveDateTime>,
    rng: StdRng,
}

impl CharacterAgent {
    /// Create a character serving `liege`, with its archetype's traits.
    pub fn new(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        archetype: Archetype,
        liege: EntityId,
        config: &AgentConfig,
    ) -> Self {
        let (primary_ambition, secondary_ambition) = Ambition::for_archetype(archetype);
        Self {
            actor,
            entity,
            name: name.into(),
            archetype,
            liege,
            traits: CharacterTraits::for_archetype(archetype),
            mood: Mood::default(),
            primary_ambition,
            secondary_ambition,
            ambition_since: None,
            opinions: OpinionGraph::new(),
            memory: MemoryStore::new(
                config.character_memory_capacity,
                config.memory_lifetime_hours,
            ),
            rivals: BTreeSet::new(),
            friends: BTreeSet::new(),
            lover: None,
            mentor: None,
            active_plots: Vec::new(),
            plot_queue: VecDeque::new(),
            proposal_queue: VecDeque::new(),
            relationship_queue: VecDeque::new(),
            personal_queue: VecDeque::new(),
            review_interval: TimeDelta::try_hours(config.ambition_review_hours)
                .unwrap_or(TimeDelta::MAX),
            achievement_time: TimeDelta::try_hours(config.ambition_achieved_hours)
                .unwrap_or(TimeDelta::MAX),
            last_review: None,
            rng: StdRng::seed_from_u64(config.rng_seed ^ u64::from(actor.0)),
        }
    }

    /// A grasping noble after a title.
    pub fn ambitious_noble(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        liege: EntityId,
        config: &AgentConfig,
    ) -> Self {
        let mut agent = Self::new(actor, entity, name, Archetype::Conqueror, liege, config);
        agent.traits.ambition = 0.9;
        agent.traits.loyalty = 0.4;
        agent.traits.honor = 0.5;
        agent.primary_ambition = Ambition::GainTitle;
        agent
    }

    /// A dependable vassal.
    pub fn loyal_vassal(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        liege: EntityId,
        config: &AgentConfig,
    ) -> Self {
        let mut agent = Self::new(actor, entity, name, Archetype::Administrator, liege, config);
        agent.traits.ambition = 0.4;
        agent.traits.loyalty = 0.9;
        agent.traits.honor = 0.8;
        agent.primary_ambition = Ambition::Legacy;
        agent
    }

    /// A disloyal plotter.
    pub fn cunning_schemer(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        liege: EntityId,
        config: &AgentConfig,
    ) -> Self {
        let mut agent = Self::new(actor, entity, name, Archetype::Tyrant, liege, config);
        agent.traits.ambition = 0.8;
        agent.traits.loyalty = 0.2;
        agent.traits.honor = 0.3;
        agent.traits.boldness = 0.8;
        agent.primary_ambition = Ambition::Power;
        agent
    }

    /// A devout and gentle priest.
    pub fn pious_priest(
        actor: ActorId,
        entity: EntityId,
        name: impl Into<String>,
        liege: EntityId,
        config: &AgentConfig,
    ) -> Self {
        let mut agent = Self::new(actor, entity, name, Archetype::Zealot, liege, config);
        agent.traits.ambition = 0.5;
        agent.traits.loyalty = 0.8;
        agent.traits.honor = 0.9;
        agent.traits.greed = 0.1;
        agent.traits.compassion = 0.7;
        agent.primary_ambition = Ambition::Piety;
        agent
    }

    // -- Accessors -----------------------------------------------------------

    /// Personality traits.
    pub const fn traits(&self) -> &CharacterTraits {
        &self.traits
    }

    /// The realm this character serves.
    pub const fn liege(&self) -> EntityId {
        self.liege
    }

    /// Current mood.
    pub const fn mood(&self) -> Mood {
        self.mood
    }

    /// Force a mood, e.g. from an external event.
    pub const fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
    }

    /// Main ambition.
    pub const fn primary_ambition(&self) -> Ambition {
        self.primary_ambition
    }

    /// Fallback ambition.
    pub const fn secondary_ambition(&self) -> Ambition {
        self.secondary_ambition
    }

    /// Replace the main ambition.
    pub const fn set_primary_ambition(&mut self, ambition: Ambition) {
        self.primary_ambition = ambition;
        self.ambition_since = None;
    }

    /// Opinion of someone, in `[-100, 100]`.
    pub fn opinion(&self, other: EntityId) -> f64 {
        self.opinions.get(other)
    }

    /// Remembered interactions.
    pub const fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Whether `other` is a rival.
    pub fn is_rival(&self, other: EntityId) -> bool {
        self.rivals.contains(&other)
    }

    /// Whether `other` is a friend.
    pub fn is_friend(&self, other: EntityId) -> bool {
        self.friends.contains(&other)
    }

    /// Current lover, if any.
    pub const fn lover(&self) -> Option<EntityId> {
        self.lover
    }

    /// Current mentor or protege, if any.
    pub const fn mentor(&self) -> Option<EntityId> {
        self.mentor
    }

    /// Plots in flight.
    pub fn active_plots(&self) -> &[PlotDecision] {
        &self.active_plots
    }

    /// Whether any plot in flight or queued targets `other`.
    pub fn is_plotting_against(&self, other: EntityId) -> bool {
        self.active_plots
            .iter()
            .chain(self.plot_queue.iter())
            .any(|plot| plot.target == other)
    }

    /// Drop a plot in flight.
    pub fn abandon_plot(&mut self, index: usize) -> Option<PlotDecision> {
        (index < self.active_plots.len()).then(|| self.active_plots.remove(index))
    }

    /// Queued plots, oldest first.
    pub fn queued_plots(&self) -> impl Iterator<Item = &PlotDecision> {
        self.plot_queue.iter()
    }

    /// Queued proposals, oldest first.
    pub fn queued_proposals(&self) -> impl Iterator<Item = &ProposalDecision> {
        self.proposal_queue.iter()
    }

    /// Queued relationship actions, oldest first.
    pub fn queued_relationships(&self) -> impl Iterator<Item = &RelationshipDecision> {
        self.relationship_queue.iter()
    }

    /// Queued personal actions, oldest first.
    pub fn queued_personal(&self) -> impl Iterator<Item = &PersonalDecision> {
        self.personal_queue.iter()
    }

    // -- Mood-adjusted traits --------------------------------------------------

    /// Ambition as the current mood colours it.
    pub fn ambition_modifier(&self) -> f64 {
        let factor = match self.mood {
            Mood::Ambitious => 1.3,
            Mood::Afraid => 0.6,
            Mood::Desperate => 1.5,
            _ => 1.0,
        };
        (self.traits.ambition * factor).clamp(0.0, 1.0)
    }

    /// Loyalty as the current mood colours it.
    pub fn loyalty_modifier(&self) -> f64 {
        let factor = match self.mood {
            Mood::Angry => 0.7,
            Mood::Desperate => 0.5,
            Mood::Content => 1.1,
            _ => 1.0,
        };
        (self.traits.loyalty * factor).clamp(0.0, 1.0)
    }

    /// Boldness as the current mood colours it.
    pub fn boldness_modifier(&self) -> f64 {
        let factor = match self.mood {
            Mood::Afraid => 0.5,
            Mood::Angry => 1.3,
            Mood::Desperate => 1.5,
            _ => 1.0,
        };
        (self.traits.boldness * factor).clamp(0.0, 1.0)
    }

    // -- Evaluation ----------------------------------------------------------

    /// Work out what kind of plot this character would run against `target`.
    pub fn evaluate_plot(&self, target: EntityId) -> PlotDecision {
        let t = &self.traits;
        let (kind, risk, success_chance) = if t.ambition > 0.8 && t.honor < 0.4 {
            (PlotKind::Assassination, 0.9, 0.3 * (1.0 - t.honor) * t.boldness)
        } else if t.ambition > 0.7 && t.loyalty < 0.3 {
            (PlotKind::Coup, 0.95, 0.2 * t.boldness * (1.0 - t.loyalty))
        } else if t.greed > 0.7 {
            (PlotKind::Blackmail, 0.6, 0.5 * t.boldness)
        } else {
            (PlotKind::FabricateClaim, 0.4, 0.6)
        };

        let desirability = self.plot_desirability(kind, risk, success_chance);
        let should_execute = desirability > PLOT_DESIRABILITY_THRESHOLD
            && success_chance > PLOT_SUCCESS_THRESHOLD
            && self.boldness_modifier() > risk * 0.5;

        PlotDecision {
            kind,
            target,
            success_chance,
            risk,
            desirability,
            should_execute,
        }
    }

    fn plot_desirability(&self, kind: PlotKind, risk: f64, success_chance: f64) -> f64 {
        let t = &self.traits;
        let mut desirability = t.ambition * 0.4;
        match kind {
            PlotKind::Assassination | PlotKind::Blackmail => desirability -= t.honor * 0.5,
            PlotKind::Coup => desirability -= t.loyalty * 0.6,
            PlotKind::FabricateClaim => {}
        }
        desirability += t.boldness * risk * 0.3;
        desirability += success_chance * 0.4;
        desirability += match self.mood {
            Mood::Desperate => 0.3,
            Mood::Angry => 0.2,
            Mood::Ambitious => 0.25,
            Mood::Afraid => -0.2,
            _ => 0.0,
        };
        desirability.clamp(0.0, 1.0)
    }

    /// Pick a proposal to put to the liege, driven by the main ambition.
    pub fn evaluate_proposal(&self) -> ProposalDecision {
        let loyalty = self.traits.loyalty;
        let (kind, base) = match self.primary_ambition {
            Ambition::GainTitle => (ProposalKind::RequestTitle, 0.3 + loyalty * 0.4),
            Ambition::AccumulateWealth => (ProposalKind::RequestGold, 0.4 + loyalty * 0.3),
            Ambition::FindLove => (ProposalKind::ProposeMarriage, 0.5),
            Ambition::Power => (ProposalKind::RequestCouncilSeat, 0.2 + loyalty * 0.5),
            _ => (ProposalKind::SuggestWar, 0.3),
        };
        ProposalDecision {
            kind,
            target: self.liege,
            acceptance_chance: (base * (1.0 + self.traits.compassion * 0.2)).clamp(0.0, 1.0),
        }
    }

    /// Chance a proposal actually succeeds once made.
    pub fn proposal_success(&self, proposal: &ProposalDecision) -> f64 {
        let mut success = proposal.acceptance_chance;
        match proposal.kind {
            ProposalKind::RequestTitle | ProposalKind::RequestCouncilSeat => {
                success += self.traits.loyalty * 0.3;
            }
            ProposalKind::RequestGold => success += self.traits.compassion * 0.2,
            ProposalKind::ProposeMarriage | ProposalKind::SuggestWar => {}
        }
        success += self.traits.honor * 0.15;
        success.clamp(0.0, 1.0)
    }

    /// Decide how to treat `target` given the current opinion.
    pub fn evaluate_relationship(&self, target: EntityId) -> RelationshipDecision {
        let opinion = self.opinion(target);
        let (action, base) = if opinion > FRIEND_THRESHOLD {
            if self.primary_ambition == Ambition::FindLove && self.lover.is_none() {
                (RelationshipAction::Seduce, 0.8)
            } else {
                (RelationshipAction::Befriend, 0.6)
            }
        } else if opinion < RIVAL_THRESHOLD {
            if self.traits.boldness > 0.7 && self.traits.honor < 0.4 {
                (RelationshipAction::Blackmail, 0.7)
            } else {
                (RelationshipAction::Rival, 0.5)
            }
        } else if opinion > 30.0 {
            (RelationshipAction::Mentor, 0.4)
        } else {
            (RelationshipAction::Befriend, 0.3)
        };
        RelationshipDecision {
            action,
            target,
            desirability: base * self.relationship_value(target),
        }
    }

    fn relationship_value(&self, target: EntityId) -> f64 {
        let mut value = 0.5 + self.opinion(target) * 0.005 + self.traits.compassion * 0.2;
        if self.is_rival(target) {
            value -= 0.5;
        }
        if self.is_friend(target) {
            value += 0.3;
        }
        value.clamp(0.0, 1.0)
    }

    /// The personal action this archetype favours.
    pub fn evaluate_personal_action(&self) -> PersonalDecision {
        let (action, expected_benefit, cost) = match self.archetype {
            Archetype::Scholar => (PersonalAction::ImproveSkill, 0.8, 50.0),
            Archetype::Merchant => (PersonalAction::BuildEstate, 0.7, 100.0),
            Archetype::Zealot => (PersonalAction::Pilgrimage, 0.6, 200.0),
            Archetype::Builder => (PersonalAction::CommissionArtifact, 0.5, 500.0),
            _ => (PersonalAction::HoldFeast, 0.4, 150.0),
        };
        PersonalDecision {
            action,
            expected_benefit,
            cost,
        }
    }

    // -- Mood ----------------------------------------------------------------

    fn ambition_achieved(&self, now: NaiveDateTime) -> bool {
        self.ambition_since
            .is_some_and(|since| now.signed_duration_since(since) >= self.achievement_time)
    }

    /// Derive mood from opinions, ambition progress, bad memories, plots,
    /// and rivals.
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_mood(&self, now: NaiveDateTime) -> Mood {
        let mut score = self.opinions.average() * 0.01;
        if self.ambition_achieved(now) {
            score += 0.5;
        } else {
            score -= 0.2 * self.traits.ambition;
        }
        score -= self.memory.count_negative() as f64 * 0.1;
        score -= self.active_plots.len() as f64 * 0.15;
        if !self.rivals.is_empty() {
            score -= 0.3;
        }

        if score > 0.7 {
            Mood::Happy
        } else if score > 0.3 {
            Mood::Content
        } else if score > -0.3 {
            Mood::Stressed
        } else if score > -0.7 {
            Mood::Angry
        } else {
            Mood::Afraid
        }
    }

    fn update_mood(&mut self, now: NaiveDateTime) {
        self.mood = self.calculate_mood(now);
    }

    const fn add_stress(&mut self) {
        self.mood = match self.mood {
            Mood::Content => Mood::Stressed,
            Mood::Happy => Mood::Content,
            other => other,
        };
    }

    const fn reduce_stress(&mut self) {
        self.mood = match self.mood {
            Mood::Stressed => Mood::Content,
            Mood::Content => Mood::Happy,
            other => other,
        };
    }

    // -- Ambitions -----------------------------------------------------------

    fn choose_new_ambition(&self) -> Ambition {
        let t = &self.traits;
        if t.greed > 0.7 {
            Ambition::AccumulateWealth
        } else if t.ambition > 0.8 {
            Ambition::GainTitle
        } else if t.boldness > 0.7 {
            Ambition::GainLand
        } else if t.compassion > 0.7 {
            Ambition::FindLove
        } else {
            Ambition::Legacy
        }
    }

    /// Replace an achieved ambition and act on the current one.
    pub fn update_ambitions(&mut self, now: NaiveDateTime) {
        if self.ambition_achieved(now) {
            let next = self.choose_new_ambition();
            if next != Ambition::None {
                debug!(
                    character = %self.entity,
                    achieved = ?self.primary_ambition,
                    next = ?next,
                    "Ambition achieved"
                );
                self.secondary_ambition = self.primary_ambition;
                self.primary_ambition = next;
            }
            self.ambition_since = Some(now);
        } else if self.ambition_since.is_none() {
            self.ambition_since = Some(now);
        }
        self.pursue_ambition();
        self.last_review = Some(now);
    }

    fn pursue_ambition(&mut self) {
        match self.primary_ambition {
            Ambition::GainTitle | Ambition::Power => {
                let proposal = self.evaluate_proposal();
                self.queue_proposal(proposal);
            }
            Ambition::AccumulateWealth => {
                let action = self.evaluate_personal_action();
                if action.action == PersonalAction::BuildEstate {
                    self.queue_personal(action);
                }
            }
            Ambition::GainLand if self.traits.boldness > 0.6 => {
                let target = self.rivals.iter().next().copied().unwrap_or(self.liege);
                let plot = self.evaluate_plot(target);
                if plot.kind == PlotKind::FabricateClaim {
                    self.start_plot(plot);
                }
            }
            Ambition::Knowledge => self.queue_personal(PersonalDecision {
                action: PersonalAction::ImproveSkill,
                expected_benefit: 1.0,
                cost: 50.0,
            }),
            Ambition::Revenge => {
                if let Some(&rival) = self.rivals.iter().next() {
                    let plot = self.evaluate_plot(rival);
                    if plot.should_execute {
                        self.start_plot(plot);
                    }
                }
            }
            _ => {}
        }
    }

    fn review_due(&self, now: NaiveDateTime) -> bool {
        self.last_review
            .is_none_or(|last| now.signed_duration_since(last) >= self.review_interval)
    }

    // -- Relationships -------------------------------------------------------

    fn update_opinion(&mut self, other: EntityId, change: f64, reason: &str, now: NaiveDateTime) {
        if other.is_none() {
            return;
        }
        self.opinions.adjust(other, change);
        self.memory.record(MemoryEntry {
            subject: other,
            kind: InformationType::DiplomaticChange,
            description: reason.to_owned(),
            impact: change / 100.0,
            when: now,
        });
    }

    /// Mark new rivals and friends from current opinions and queue a
    /// relationship action for each newcomer.
    fn refresh_relationships(&mut self) {
        let new_rivals: Vec<EntityId> = self
            .opinions
            .rivals()
            .into_iter()
            .filter(|e| !self.rivals.contains(e))
            .collect();
        let new_friends: Vec<EntityId> = self
            .opinions
            .friends()
            .into_iter()
            .filter(|e| !self.friends.contains(e))
            .collect();

        for rival in new_rivals {
            self.rivals.insert(rival);
            let decision = self.evaluate_relationship(rival);
            self.queue_relationship(decision);
        }
        for friend in new_friends {
            self.friends.insert(friend);
            let decision = self.evaluate_relationship(friend);
            self.queue_relationship(decision);
        }
        self.friends
            .retain(|friend| self.opinions.get(*friend) > FRIEND_THRESHOLD);
    }

    // -- Queues --------------------------------------------------------------

    /// Queue a plot unless the same plot is already queued or running.
    pub fn start_plot(&mut self, plot: PlotDecision) {
        let duplicate = self
            .active_plots
            .iter()
            .chain(self.plot_queue.iter())
            .any(|p| p.kind == plot.kind && p.target == plot.target);
        if duplicate {
            return;
        }
        info!(
            character = %self.entity,
            plot = ?plot.kind,
            target = %plot.target,
            success = plot.success_chance,
            "Plot started"
        );
        self.plot_queue.push_back(plot);
    }

    fn queue_proposal(&mut self, proposal: ProposalDecision) {
        if self.proposal_queue.iter().any(|p| p.kind == proposal.kind) {
            return;
        }
        self.proposal_queue.push_back(proposal);
    }

    fn queue_relationship(&mut self, decision: RelationshipDecision) {
        if self
            .relationship_queue
            .iter()
            .any(|d| d.target == decision.target)
        {
            return;
        }
        self.relationship_queue.push_back(decision);
    }

    fn queue_personal(&mut self, decision: PersonalDecision) {
        if self.personal_queue.iter().any(|d| d.action == decision.action) {
            return;
        }
        self.personal_queue.push_back(decision);
    }

    // -- Execution -----------------------------------------------------------

    fn execute_plot(&mut self, plot: PlotDecision, now: NaiveDateTime) -> Intent {
        self.update_opinion(plot.target, -30.0, "Plotting", now);
        if self.active_plots.len() >= MAX_ACTIVE_PLOTS {
            self.active_plots.remove(0);
        }
        self.active_plots.push(plot);
        Intent::Plot {
            kind: plot.kind,
            target: plot.target,
            success_chance: plot.success_chance,
            risk: plot.risk,
        }
    }

    fn execute_proposal(&mut self, proposal: ProposalDecision, now: NaiveDateTime) -> Intent {
        let success = self.proposal_success(&proposal);
        let roll: f64 = self.rng.random();
        let accepted = roll < success;
        if accepted {
            if self.mood == Mood::Stressed {
                self.mood = Mood::Content;
            }
            self.update_opinion(proposal.target, 10.0, "Proposal granted", now);
        } else {
            self.add_stress();
            self.update_opinion(proposal.target, -5.0, "Proposal denied", now);
        }
        debug!(
            character = %self.entity,
            proposal = ?proposal.kind,
            accepted,
            "Proposal made"
        );
        Intent::Proposal {
            kind: proposal.kind,
            target: proposal.target,
            accepted,
        }
    }

    fn execute_relationship(&mut self, decision: RelationshipDecision, now: NaiveDateTime) -> Intent {
        let target = decision.target;
        match decision.action {
            RelationshipAction::Befriend => self.update_opinion(target, 15.0, "Befriending", now),
            RelationshipAction::Seduce => {
                if decision.desirability > 0.7 {
                    self.lover = Some(target);
                    self.update_opinion(target, 30.0, "Romance", now);
                }
            }
            RelationshipAction::Rival => {
                self.rivals.insert(target);
                self.update_opinion(target, -40.0, "Declared rival", now);
                self.primary_ambition = Ambition::Revenge;
                self.ambition_since = None;
            }
            RelationshipAction::Mentor => {
                self.mentor = Some(target);
                self.update_opinion(target, 20.0, "Mentoring", now);
            }
            RelationshipAction::Blackmail => self.update_opinion(target, -50.0, "Blackmail", now),
            RelationshipAction::Marry => {
                self.lover = Some(target);
                self.update_opinion(target, 50.0, "Marriage", now);
            }
            RelationshipAction::Divorce => {
                if self.lover == Some(target) {
                    self.lover = None;
                    self.update_opinion(target, -30.0, "Divorce", now);
                }
            }
        }
        Intent::Relationship {
            action: decision.action,
            target,
        }
    }

    fn execute_personal(&mut self, decision: PersonalDecision) -> Intent {
        match decision.action {
            PersonalAction::ImproveSkill | PersonalAction::BuildEstate => self.reduce_stress(),
            PersonalAction::HoldFeast => {
                self.reduce_stress();
                self.opinions.adjust_all(5.0);
            }
            PersonalAction::Pilgrimage => self.mood = Mood::Content,
            PersonalAction::CommissionArtifact => {}
        }
        Intent::Personal {
            action: decision.action,
            cost: decision.cost,
        }
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

impl DecisionAgent for CharacterAgent {
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
        self.remember(packet, ctx.now);
        let foreign = !packet.originator.is_none() && packet.originator != self.entity;

        match packet.kind {
            InformationType::SuccessionCrisis if foreign && self.ambition_modifier() > 0.6 => {
                let plot = self.evaluate_plot(packet.originator);
                if plot.should_execute && plot.success_chance > PLOT_VIABLE_SUCCESS {
                    self.start_plot(plot);
                }
            }
            InformationType::DiplomaticChange | InformationType::AllianceFormation => {
                self.refresh_relationships();
            }
            InformationType::MilitaryAction if packet.severity > 0.7 => {
                self.update_mood(ctx.now);
                if self.mood == Mood::Afraid {
                    let proposal = self.evaluate_proposal();
                    if proposal.acceptance_chance > 0.5 {
                        self.queue_proposal(proposal);
                    }
                }
            }
            InformationType::EconomicCrisis
                if self.archetype == Archetype::Merchant && packet.severity > 0.5 =>
            {
                let action = self.evaluate_personal_action();
                if action.is_worthwhile() {
                    self.queue_personal(action);
                }
            }
            InformationType::Rebellion => {
                if self.loyalty_modifier() < 0.5 {
                    let plot = self.evaluate_plot(self.liege);
                    if plot.kind == PlotKind::Coup {
                        self.start_plot(plot);
                    }
                } else if foreign {
                    self.update_opinion(packet.originator, -20.0, "Rebellion", ctx.now);
                }
            }
            _ => {}
        }

        self.update_mood(ctx.now);
        Ok(())
    }

    fn background_update(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        self.opinions.decay();
        self.memory.prune(ctx.now);
        self.refresh_relationships();
        if self.review_due(ctx.now) {
            self.update_ambitions(ctx.now);
        }
        self.update_mood(ctx.now);
        Ok(())
    }

    fn execute_decisions(&mut self, ctx: &AgentContext<'_>) -> Vec<Intent> {
        let mut intents = Vec::new();
        if let Some(plot) = self.plot_queue.pop_front() {
            intents.push(self.execute_plot(plot, ctx.now));
        }
        if let Some(decision) = self.relationship_queue.pop_front() {
            intents.push(self.execute_relationship(decision, ctx.now));
        }
        if let Some(proposal) = self.proposal_queue.pop_front() {
            intents.push(self.execute_proposal(proposal, ctx.now));
        }
        if let Some(decision) = self.personal_queue.pop_front() {
            intents.push(self.execute_personal(decision));
        }
        intents
    }

    fn pending_decisions(&self) -> usize {
        self.plot_queue
            .len()
            .saturating_add(self.proposal_queue.len())
            .saturating_add(self.relationship_queue.len())
            .saturating_add(self.personal_queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticRealms;
    use chrono::NaiveDate;
    use herald_types::RegionId;

    const LIEGE: EntityId = EntityId(1);
    const ME: EntityId = EntityId(500);

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn packet(kind: InformationType, originator: EntityId, severity: f64) -> Packet {
        Packet::new(kind, RegionId(3), originator, severity, epoch())
    }

    fn config() -> AgentConfig {
        AgentConfig::default()
    }

    #[test]
    fn schemer_plots_a_coup_on_rebellion() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::cunning_schemer(ActorId(5000), ME, "Vex", LIEGE, &config());

        let rebellion = packet(InformationType::Rebellion, EntityId::NONE, 0.7);
        assert!(agent.process_information(&rebellion, &ctx).is_ok());
        let plot = agent.queued_plots().next().copied();
        assert!(plot.is_some_and(|p| p.kind == PlotKind::Coup && p.target == LIEGE));

        let intents = agent.execute_decisions(&ctx);
        assert!(matches!(intents.first(), Some(Intent::Plot { kind: PlotKind::Coup, .. })));
        assert_eq!(agent.active_plots().len(), 1);
        assert!(agent.opinion(LIEGE) < 0.0);
    }

    #[test]
    fn loyal_vassal_condemns_rebels() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::loyal_vassal(ActorId(5001), ME, "Oda", LIEGE, &config());
        let rebel = EntityId(66);
        assert!(agent
            .process_information(&packet(InformationType::Rebellion, rebel, 0.7), &ctx)
            .is_ok());
        assert_eq!(agent.queued_plots().count(), 0);
        assert!((agent.opinion(rebel) + 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ambitious_noble_exploits_succession_crisis() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::ambitious_noble(ActorId(5002), ME, "Brand", LIEGE, &config());
        let other = EntityId(2);
        assert!(agent
            .process_information(&packet(InformationType::SuccessionCrisis, other, 0.8), &ctx)
            .is_ok());
        let plot = agent.queued_plots().next().copied();
        assert!(plot.is_some_and(|p| p.kind == PlotKind::FabricateClaim && p.target == other));
        assert!(agent.is_plotting_against(other));
    }

    #[test]
    fn pious_priest_never_plots() {
        let agent = CharacterAgent::pious_priest(ActorId(5003), ME, "Anselm", LIEGE, &config());
        let plot = agent.evaluate_plot(LIEGE);
        assert_eq!(plot.kind, PlotKind::FabricateClaim);
        assert!(!plot.should_execute);
    }

    #[test]
    fn fear_dampens_boldness() {
        let mut agent = CharacterAgent::cunning_schemer(ActorId(5004), ME, "Vex", LIEGE, &config());
        let bold = agent.boldness_modifier();
        agent.set_mood(Mood::Afraid);
        assert!(agent.boldness_modifier() < bold);
        agent.set_mood(Mood::Desperate);
        assert!(agent.loyalty_modifier() < 0.2);
    }

    #[test]
    fn afraid_characters_seek_protection() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::loyal_vassal(ActorId(5005), ME, "Oda", LIEGE, &config());
        agent.set_primary_ambition(Ambition::GainTitle);
        // Weigh the character down with grim memories so the battle report
        // tips them into fear.
        for _ in 0..8 {
            assert!(agent
                .process_information(&packet(InformationType::Plague, EntityId::NONE, 0.5), &ctx)
                .is_ok());
        }
        assert!(agent
            .process_information(&packet(InformationType::MilitaryAction, EntityId(9), 0.9), &ctx)
            .is_ok());
        assert_eq!(agent.mood(), Mood::Afraid);
        let proposal = agent.queued_proposals().next().copied();
        assert!(proposal.is_some_and(|p| p.kind == ProposalKind::RequestTitle && p.target == LIEGE));
    }

    #[test]
    fn merchants_invest_during_crises() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::new(
            ActorId(5006),
            ME,
            "Silas",
            Archetype::Merchant,
            LIEGE,
            &config(),
        );
        assert!(agent
            .process_information(&packet(InformationType::EconomicCrisis, EntityId(3), 0.7), &ctx)
            .is_ok());
        assert!(agent
            .queued_personal()
            .any(|p| p.action == PersonalAction::BuildEstate));
    }

    #[test]
    fn background_decay_and_rivalry() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let mut agent = CharacterAgent::loyal_vassal(ActorId(5007), ME, "Oda", LIEGE, &config());
        let enemy = EntityId(77);
        agent.update_opinion(enemy, -80.0, "Insult", epoch());

        assert!(agent.background_update(&ctx).is_ok());
        assert!((agent.opinion(enemy) + 79.7).abs() < 1e-9);
        assert!(agent.is_rival(enemy));
        let decision = agent.queued_relationships().next().copied();
        assert!(decision.is_some_and(|d| d.action == RelationshipAction::Rival));

        let intents = agent.execute_decisions(&ctx);
        assert!(intents
            .iter()
            .any(|i| matches!(i, Intent::Relationship { action: RelationshipAction::Rival, .. })));
        assert_eq!(agent.primary_ambition(), Ambition::Revenge);
    }

    #[test]
    fn ambitions_turn_over_after_a_month() {
        let realms = StaticRealms::new();
        let mut agent = CharacterAgent::new(
            ActorId(5008),
            ME,
            "Silas",
            Archetype::Merchant,
            LIEGE,
            &config(),
        );
        agent.set_primary_ambition(Ambition::Knowledge);
        let ctx = AgentContext::new(epoch(), &realms);
        assert!(agent.background_update(&ctx).is_ok());
        assert_eq!(agent.primary_ambition(), Ambition::Knowledge);

        let later = epoch() + TimeDelta::days(31);
        let ctx = AgentContext::new(later, &realms);
        assert!(agent.background_update(&ctx).is_ok());
        assert_eq!(agent.primary_ambition(), Ambition::AccumulateWealth);
        assert_eq!(agent.secondary_ambition(), Ambition::Knowledge);
    }

    #[test]
    fn proposal_rolls_are_reproducible() {
        let realms = StaticRealms::new();
        let ctx = AgentContext::new(epoch(), &realms);
        let run = || {
            let mut agent =
                CharacterAgent::ambitious_noble(ActorId(5009), ME, "Brand", LIEGE, &config());
            let proposal = agent.evaluate_proposal();
            agent.queue_proposal(proposal);
            agent.execute_decisions(&ctx)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn feasts_warm_every_relationship() {
        let mut agent = CharacterAgent::new(
            ActorId(5010),
            ME,
            "Hal",
            Archetype::Balanced,
            LIEGE,
            &config(),
        );
        agent.opinions.set(EntityId(2), 10.0);
        agent.opinions.set(EntityId(3), -10.0);
        let feast = agent.evaluate_personal_action();
        assert_eq!(feast.action, PersonalAction::HoldFeast);
        agent.execute_personal(feast);
        assert!((agent.opinion(EntityId(2)) - 15.0).abs() < f64::EPSILON);
        assert!((agent.opinion(EntityId(3)) + 5.0).abs() < f64::EPSILON);
        assert_eq!(agent.mood(), Mood::Happy);
    }
}
