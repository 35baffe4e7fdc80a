//! Realm council.
//!
//! The council votes on every packet that reaches it and keeps a rolling
//! record of its votes. It issues no intents of its own; the host asks it
//! whether a war, tax increase, alliance, or succession should go ahead
//! and reads its standing advice.

use std::collections::VecDeque;

use chrono::{NaiveDateTime, TimeDelta};
use herald_types::{ActorId, Archetype, EntityId, InformationType, Intent, Packet};
use serde::Serialize;
use tracing::debug;

use crate::agent::DecisionAgent;
use crate::config::AgentConfig;
use crate::context::AgentContext;
use crate::error::AgentError;

/// Window in which approvals count toward the limits below.
const RECENT_WINDOW_HOURS: i64 = 720;

/// Approved wars allowed within the window.
const MAX_RECENT_WARS: usize = 2;

/// Approved tax increases allowed within the window.
const MAX_RECENT_TAX_INCREASES: usize = 2;

const ECONOMIC_ADVICE: [&str; 3] = [
    "Consider investing in infrastructure",
    "Monitor trade agreements",
    "Build treasury reserves",
];

const MILITARY_ADVICE: [&str; 3] = [
    "Maintain standing army",
    "Fortify border provinces",
    "Train levy forces",
];

const DIPLOMATIC_ADVICE: [&str; 3] = [
    "Seek alliances with neighbors",
    "Improve relations with rivals",
    "Negotiate trade agreements",
];

/// What a vote was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    /// Going to war.
    War,
    /// Raising taxes.
    TaxIncrease,
    /// A diplomatic overture.
    Diplomacy,
    /// Entering an alliance.
    Alliance,
    /// Recognizing an heir.
    Succession,
    /// Anything else brought before the council.
    Other,
}

impl Motion {
    /// The motion a kind of news puts before the council.
    pub const fn for_information(kind: InformationType) -> Self {
        match kind {
            InformationType::MilitaryAction => Self::War,
            InformationType::EconomicCrisis => Self::TaxIncrease,
            InformationType::DiplomaticChange => Self::Diplomacy,
            InformationType::AllianceFormation => Self::Alliance,
            InformationType::SuccessionCrisis => Self::Succession,
            _ => Self::Other,
        }
    }
}

/// One recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteRecord {
    /// Motion voted on.
    pub motion: Motion,
    /// Who the motion concerned.
    pub subject: EntityId,
    /// Description of the news that prompted it.
    pub description: String,
    /// Whether the council voted in favour.
    pub voted_for: bool,
    /// Game date of the vote.
    pub when: NaiveDateTime,
}

/// Advisory council attached to one realm.
#[derive(Debug, Clone)]
pub struct CouncilAgent {
    actor: ActorId,
    realm: EntityId,
    name: String,
    archetype: Archetype,
    history: VecDeque<VoteRecord>,
    history_capacity: usize,
}

impl CouncilAgent {
    /// Create a council for `realm`. The archetype shapes what it pays
    /// attention to.
    pub fn new(
        actor: ActorId,
        realm: EntityId,
        name: impl Into<String>,
        archetype: Archetype,
        config: &AgentConfig,
    ) -> Self {
        Self {
            actor,
            realm,
            name: name.into(),
            archetype,
            history: VecDeque::new(),
            history_capacity: config.council_history_capacity,
        }
    }

    /// Votes cast, oldest first.
    pub fn voting_history(&self) -> impl Iterator<Item = &VoteRecord> {
        self.history.iter()
    }

    /// Number of recorded votes.
    pub fn vote_count(&self) -> usize {
        self.history.len()
    }

    fn recent_approvals(&self, motion: Motion, now: NaiveDateTime) -> usize {
        let window = TimeDelta::try_hours(RECENT_WINDOW_HOURS).unwrap_or(TimeDelta::MAX);
        self.history
            .iter()
            .filter(|vote| vote.motion == motion && vote.voted_for)
            .filter(|vote| now.signed_duration_since(vote.when) < window)
            .count()
    }

    /// Approve a war unless two have already been approved this month, or
    /// the target is an ally.
    pub fn should_approve_war(&self, target: EntityId, ctx: &AgentContext<'_>) -> bool {
        if ctx
            .relation(self.realm, target)
            .is_some_and(|relation| relation.allied)
        {
            return false;
        }
        self.recent_approvals(Motion::War, ctx.now) < MAX_RECENT_WARS
    }

    /// Approve a tax increase unless two have already been approved this
    /// month.
    pub fn should_approve_tax_increase(&self, now: NaiveDateTime) -> bool {
        self.recent_approvals(Motion::TaxIncrease, now) < MAX_RECENT_TAX_INCREASES
    }

    /// Approve an alliance with anyone the realm is not at war with.
    pub fn should_approve_alliance(&self, ally: EntityId, ctx: &AgentContext<'_>) -> bool {
        !ctx.relation(self.realm, ally)
            .is_some_and(|relation| relation.at_war)
    }

    /// Approve any named heir.
    pub const fn should_approve_succession(&self, heir: EntityId) -> bool {
        !heir.is_none()
    }

    /// Standing economic advice.
    pub const fn economic_advice(&self) -> &'static [&'static str] {
        &ECONOMIC_ADVICE
    }

    /// Standing military advice.
    pub const fn military_advice(&self) -> &'static [&'static str] {
        &MILITARY_ADVICE
    }

    /// Standing diplomatic advice.
    pub const fn diplomatic_advice(&self) -> &'static [&'static str] {
        &DIPLOMATIC_ADVICE
    }

    fn record(&mut self, vote: VoteRecord) {
        self.history.push_back(vote);
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }
}

impl DecisionAgent for CouncilAgent {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn entity(&self) -> EntityId {
        self.realm
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
        let motion = Motion::for_information(packet.kind);
        let voted_for = match motion {
            Motion::War => self.should_approve_war(packet.originator, ctx),
            Motion::TaxIncrease => self.should_approve_tax_increase(ctx.now),
            Motion::Alliance => self.should_approve_alliance(packet.originator, ctx),
            Motion::Succession => self.should_approve_succession(packet.originator),
            Motion::Diplomacy | Motion::Other => true,
        };
        debug!(
            council = %self.actor,
            realm = %self.realm,
            motion = ?motion,
            voted_for,
            "Council vote"
        );
        self.record(VoteRecord {
            motion,
            subject: packet.originator,
            description: packet.description.clone(),
            voted_for,
            when: ctx.now,
        });
        Ok(())
    }

    fn background_update(&mut self, _ctx: &AgentContext<'_>) -> Result<(), AgentError> {
        Ok(())
    }

    fn execute_decisions(&mut self, _ctx: &AgentContext<'_>) -> Vec<Intent> {
        Vec::new()
    }

    fn pending_decisions(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RealmRelation, StaticRealms};
    use chrono::NaiveDate;
    use herald_types::RegionId;

    const REALM: EntityId = EntityId(1);
    const ENEMY: EntityId = EntityId(2);

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 3, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn council() -> CouncilAgent {
        CouncilAgent::new(
            ActorId(9000),
            REALM,
            "Small Council",
            Archetype::Balanced,
            &AgentConfig::default(),
        )
    }

    fn vote(agent: &mut CouncilAgent, kind: InformationType, day: u32, realms: &StaticRealms) {
        let ctx = AgentContext::new(at(day), realms);
        let packet = Packet::new(kind, RegionId(4), ENEMY, 0.7, at(day));
        assert!(agent.process_information(&packet, &ctx).is_ok());
    }

    #[test]
    fn war_approvals_are_rationed() {
        let realms = StaticRealms::new();
        let mut agent = council();
        vote(&mut agent, InformationType::MilitaryAction, 1, &realms);
        vote(&mut agent, InformationType::MilitaryAction, 2, &realms);
        vote(&mut agent, InformationType::MilitaryAction, 3, &realms);
        let votes: Vec<bool> = agent.voting_history().map(|v| v.voted_for).collect();
        assert_eq!(votes, vec![true, true, false]);
    }

    #[test]
    fn tax_limit_resets_after_a_month() {
        let realms = StaticRealms::new();
        let mut agent = council();
        vote(&mut agent, InformationType::EconomicCrisis, 1, &realms);
        vote(&mut agent, InformationType::EconomicCrisis, 2, &realms);
        assert!(!agent.should_approve_tax_increase(at(3)));
        let next_month = at(2) + TimeDelta::days(31);
        assert!(agent.should_approve_tax_increase(next_month));
    }

    #[test]
    fn refuses_war_on_allies_and_alliance_with_enemies() {
        let mut realms = StaticRealms::new();
        realms.set_relation(
            REALM,
            ENEMY,
            RealmRelation {
                allied: true,
                ..RealmRelation::default()
            },
        );
        let agent = council();
        let ctx = AgentContext::new(at(1), &realms);
        assert!(!agent.should_approve_war(ENEMY, &ctx));

        realms.set_relation(
            REALM,
            ENEMY,
            RealmRelation {
                at_war: true,
                ..RealmRelation::default()
            },
        );
        let ctx = AgentContext::new(at(1), &realms);
        assert!(!agent.should_approve_alliance(ENEMY, &ctx));
        assert!(agent.should_approve_succession(EntityId(7)));
    }

    #[test]
    fn history_is_capped() {
        let realms = StaticRealms::new();
        let mut agent = council();
        for day in 1..=28 {
            for _ in 0..5 {
                vote(&mut agent, InformationType::CulturalShift, day, &realms);
            }
        }
        assert_eq!(agent.vote_count(), 100);
        assert_eq!(agent.pending_decisions(), 0);
    }

    #[test]
    fn advice_lists() {
        let agent = council();
        assert_eq!(agent.economic_advice().len(), 3);
        assert_eq!(agent.military_advice().len(), 3);
        assert_eq!(agent.diplomatic_advice().len(), 3);
    }
}
