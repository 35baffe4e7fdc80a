//! Typed decision records.
//!
//! Decision agents never touch authoritative game state. Executing a queued
//! decision produces a [`DecisionRecord`] that external systems poll and
//! apply on their own terms.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, EntityId, RegionId};

/// A decision emitted by an actor for the host game to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Actor that made the decision.
    pub actor: ActorId,
    /// Game entity the actor speaks for.
    pub entity: EntityId,
    /// Game date the decision was executed.
    pub issued_at: NaiveDateTime,
    /// What the actor wants done.
    pub intent: Intent,
}

/// The outward-facing content of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Declare war on another realm.
    DeclareWar {
        /// Realm to attack.
        target: EntityId,
        /// Estimated chance of winning, in `[0, 1]`.
        expected_success: f64,
        /// How much the realm wants this war, in `[0, 1]`.
        desirability: f64,
        /// Estimated cost in gold.
        expected_cost: f64,
    },
    /// Change military posture.
    Military {
        /// Posture change requested.
        posture: MilitaryPosture,
        /// Region the posture applies to, if any.
        region: Option<RegionId>,
        /// Troop count or gold involved.
        amount: f64,
    },
    /// Diplomatic proposal toward another realm.
    Diplomatic {
        /// Kind of proposal.
        action: DiplomaticAction,
        /// Realm addressed.
        target: EntityId,
        /// Estimated value of the proposal to the proposer.
        value: f64,
    },
    /// Economic policy change.
    Economic {
        /// Policy to enact.
        policy: EconomicPolicy,
        /// Rate change or gold invested.
        amount: f64,
    },
    /// A character starts a plot.
    Plot {
        /// Plot kind.
        kind: PlotKind,
        /// Target of the plot.
        target: EntityId,
        /// Estimated chance of success.
        success_chance: f64,
        /// Risk of discovery.
        risk: f64,
    },
    /// A character makes a proposal to their liege or a peer.
    Proposal {
        /// Proposal kind.
        kind: ProposalKind,
        /// Recipient.
        target: EntityId,
        /// Whether the proposal was accepted.
        accepted: bool,
    },
    /// A character acts on a relationship.
    Relationship {
        /// Relationship action.
        action: RelationshipAction,
        /// Other party.
        target: EntityId,
    },
    /// A character does something for themself.
    Personal {
        /// Personal action.
        action: PersonalAction,
        /// Gold spent.
        cost: f64,
    },
}

impl Intent {
    /// Short machine-friendly label for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DeclareWar { .. } => "declare_war",
            Self::Military { .. } => "military",
            Self::Diplomatic { .. } => "diplomatic",
            Self::Economic { .. } => "economic",
            Self::Plot { .. } => "plot",
            Self::Proposal { .. } => "proposal",
            Self::Relationship { .. } => "relationship",
            Self::Personal { .. } => "personal",
        }
    }
}

/// Military posture changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilitaryPosture {
    /// Raise feudal levies.
    RaiseLevies,
    /// Send levies home.
    DisbandLevies,
    /// Strengthen fortifications.
    Fortify,
    /// Move armies to a region.
    MoveArmies,
    /// Hire mercenary companies.
    HireMercenaries,
}

/// Diplomatic proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiplomaticAction {
    /// Offer an alliance.
    ProposeAlliance,
    /// Offer a trade agreement.
    OfferTrade,
    /// Publicly denounce.
    Denounce,
    /// Send gifts and envoys.
    ImproveRelations,
}

/// Economic policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicPolicy {
    /// Change the tax rate.
    AdjustTaxes,
    /// Spend on roads, ports, and buildings.
    InvestInfrastructure,
    /// Encourage commerce.
    PromoteTrade,
}

/// Character plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    /// Murder the target.
    Assassination,
    /// Overthrow the target.
    Coup,
    /// Extort the target.
    Blackmail,
    /// Forge a claim on the target's lands.
    FabricateClaim,
}

/// Character proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// Ask for a title.
    RequestTitle,
    /// Ask for gold.
    RequestGold,
    /// Propose marriage.
    ProposeMarriage,
    /// Ask for a council seat.
    RequestCouncilSeat,
    /// Urge the liege to war.
    SuggestWar,
}

/// Character relationship actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipAction {
    /// Seek friendship.
    Befriend,
    /// Seek a lover.
    Seduce,
    /// Declare a rivalry.
    Rival,
    /// Take on a student.
    Mentor,
    /// Use leverage.
    Blackmail,
    /// Marry.
    Marry,
    /// Divorce.
    Divorce,
}

/// Character personal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalAction {
    /// Study or train.
    ImproveSkill,
    /// Improve one's estate.
    BuildEstate,
    /// Throw a feast.
    HoldFeast,
    /// Go on pilgrimage.
    Pilgrimage,
    /// Commission a work of art.
    CommissionArtifact,
}
