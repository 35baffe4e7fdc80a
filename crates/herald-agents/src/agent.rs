//! The seam between the director and the decision agents.

use herald_types::{ActorId, ActorKind, Archetype, DecisionRecord, EntityId, Intent, Packet};

use crate::context::AgentContext;
use crate::error::AgentError;

/// An autonomous decision maker the director can dispatch to.
///
/// Agents turn delivered packets and periodic background ticks into queued
/// decisions, then hand them out as [`Intent`]s when executed. They never
/// write to authoritative game state.
pub trait DecisionAgent: Send {
    /// The actor id this agent was registered under.
    fn actor(&self) -> ActorId;

    /// The realm or character this agent speaks for.
    fn entity(&self) -> EntityId;

    /// Display name.
    fn name(&self) -> &str;

    /// Personality template.
    fn archetype(&self) -> Archetype;

    /// React to one delivered packet.
    fn process_information(
        &mut self,
        packet: &Packet,
        ctx: &AgentContext<'_>,
    ) -> Result<(), AgentError>;

    /// Periodic housekeeping: goal review, decay, pruning.
    fn background_update(&mut self, ctx: &AgentContext<'_>) -> Result<(), AgentError>;

    /// Execute at most one queued decision per category.
    fn execute_decisions(&mut self, ctx: &AgentContext<'_>) -> Vec<Intent>;

    /// Decisions waiting to be executed.
    fn pending_decisions(&self) -> usize;

    /// Kind of actor, derived from the id range.
    fn kind(&self) -> Option<ActorKind> {
        ActorKind::classify(self.actor())
    }

    /// Execute queued decisions and stamp them as records.
    fn execute_records(&mut self, ctx: &AgentContext<'_>) -> Vec<DecisionRecord> {
        let actor = self.actor();
        let entity = self.entity();
        self.execute_decisions(ctx)
            .into_iter()
            .map(|intent| DecisionRecord {
                actor,
                entity,
                issued_at: ctx.now,
                intent,
            })
            .collect()
    }
}
