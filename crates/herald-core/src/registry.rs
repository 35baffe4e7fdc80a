//! Actor and mailbox registries.
//!
//! The director keeps its actors in two owning structures, each behind its
//! own lock:
//!
//! - [`ActorRegistry`] owns every decision agent, the attention filter, and
//!   the realm index used to route deliveries.
//! - [`MailboxRegistry`] owns the per-actor mailboxes. Mailboxes are handed
//!   out as `Arc`s so a frame can pop messages without holding the registry
//!   lock.
//!
//! Lock order is registry, then mailbox registry, then an individual
//! mailbox, then the background queue. No code path takes them in any
//! other order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use herald_agents::{AttentionConfig, AttentionFilter, DecisionAgent};
use herald_types::{ActorId, ActorKind, EntityId};

use crate::mailbox::{Mailbox, TierCounts};

struct RegisteredActor {
    agent: Box<dyn DecisionAgent>,
    realm: EntityId,
}

/// Every live decision agent plus the attention filter.
pub struct ActorRegistry {
    actors: BTreeMap<ActorId, RegisteredActor>,
    attention: AttentionFilter,
    by_realm: BTreeMap<EntityId, BTreeSet<ActorId>>,
}

impl core::fmt::Debug for ActorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActorRegistry")
            .field("actors", &self.actors.len())
            .field("realms", &self.by_realm.len())
            .finish_non_exhaustive()
    }
}

impl ActorRegistry {
    /// An empty registry.
    pub fn new(attention: AttentionConfig) -> Self {
        Self {
            actors: BTreeMap::new(),
            attention: AttentionFilter::new(attention),
            by_realm: BTreeMap::new(),
        }
    }

    /// Register an agent as serving `realm` and give it the attention
    /// profile of its archetype. Replaces any agent with the same id.
    pub fn insert(&mut self, agent: Box<dyn DecisionAgent>, realm: EntityId) {
        let actor = agent.actor();
        self.remove(actor);
        self.attention
            .register(actor, agent.entity(), agent.name(), agent.archetype());
        self.by_realm.entry(realm).or_default().insert(actor);
        self.actors.insert(actor, RegisteredActor { agent, realm });
    }

    /// Unregister an agent and its attention profile.
    pub fn remove(&mut self, actor: ActorId) -> Option<Box<dyn DecisionAgent>> {
        let entry = self.actors.remove(&actor)?;
        self.attention.unregister(actor);
        if let Some(members) = self.by_realm.get_mut(&entry.realm) {
            members.remove(&actor);
            if members.is_empty() {
                self.by_realm.remove(&entry.realm);
            }
        }
        Some(entry.agent)
    }

    /// Mutable access to one agent for a single dispatch step.
    pub fn agent_mut(&mut self, actor: ActorId) -> Option<&mut dyn DecisionAgent> {
        self.actors
            .get_mut(&actor)
            .map(|entry| entry.agent.as_mut() as &mut dyn DecisionAgent)
    }

    /// Shared access to one agent.
    pub fn agent(&self, actor: ActorId) -> Option<&dyn DecisionAgent> {
        self.actors
            .get(&actor)
            .map(|entry| entry.agent.as_ref() as &dyn DecisionAgent)
    }

    /// Whether `actor` is registered.
    pub fn contains(&self, actor: ActorId) -> bool {
        self.actors.contains_key(&actor)
    }

    /// Realm an actor serves.
    pub fn realm_of(&self, actor: ActorId) -> Option<EntityId> {
        self.actors.get(&actor).map(|entry| entry.realm)
    }

    /// Every actor serving `realm`, nation first, then characters, then
    /// councils.
    pub fn actors_for_realm(&self, realm: EntityId) -> Vec<ActorId> {
        let mut actors: Vec<ActorId> = self
            .by_realm
            .get(&realm)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        actors.sort_by_key(|actor| (ActorKind::classify(*actor), *actor));
        actors
    }

    /// The nation actor speaking for `realm`.
    pub fn nation_for_realm(&self, realm: EntityId) -> Option<ActorId> {
        self.by_realm.get(&realm).and_then(|members| {
            members
                .iter()
                .copied()
                .find(|actor| ActorKind::classify(*actor) == Some(ActorKind::Nation))
        })
    }

    /// Registered actors of one kind, in id order.
    pub fn ids_of_kind(&self, kind: ActorKind) -> Vec<ActorId> {
        self.actors
            .keys()
            .copied()
            .filter(|actor| ActorKind::classify(*actor) == Some(kind))
            .collect()
    }

    /// Every registered actor id, in id order.
    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    /// Decisions queued across every agent.
    pub fn pending_decisions(&self) -> usize {
        self.actors
            .values()
            .map(|entry| entry.agent.pending_decisions())
            .fold(0, usize::saturating_add)
    }

    /// The attention filter.
    pub const fn attention(&self) -> &AttentionFilter {
        &self.attention
    }

    /// Mutable attention filter, for rivalry, alliance, and watch setters.
    pub const fn attention_mut(&mut self) -> &mut AttentionFilter {
        &mut self.attention
    }

    /// Registered actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether no actor is registered.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Drop every actor and profile. Returns how many actors were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.actors.len();
        for actor in self.ids() {
            self.attention.unregister(actor);
        }
        self.actors.clear();
        self.by_realm.clear();
        dropped
    }
}

/// Per-actor mailboxes.
#[derive(Debug, Default)]
pub struct MailboxRegistry {
    mailboxes: BTreeMap<ActorId, Arc<Mailbox>>,
}

impl MailboxRegistry {
    /// No mailboxes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mailbox for `actor`, replacing any existing one.
    pub fn create(&mut self, actor: ActorId) -> Arc<Mailbox> {
        let mailbox = Arc::new(Mailbox::new());
        self.mailboxes.insert(actor, Arc::clone(&mailbox));
        mailbox
    }

    /// Remove and return an actor's mailbox.
    pub fn remove(&mut self, actor: ActorId) -> Option<Arc<Mailbox>> {
        self.mailboxes.remove(&actor)
    }

    /// An actor's mailbox.
    pub fn get(&self, actor: ActorId) -> Option<Arc<Mailbox>> {
        self.mailboxes.get(&actor).map(Arc::clone)
    }

    /// Every mailbox, in actor id order.
    pub fn snapshot(&self) -> Vec<(ActorId, Arc<Mailbox>)> {
        self.mailboxes
            .iter()
            .map(|(actor, mailbox)| (*actor, Arc::clone(mailbox)))
            .collect()
    }

    /// Messages queued across every mailbox, per tier.
    pub fn queued_by_priority(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for mailbox in self.mailboxes.values() {
            counts.accumulate(&mailbox.len_by_priority());
        }
        counts
    }

    /// Messages queued across every mailbox.
    pub fn total_queued(&self) -> usize {
        self.queued_by_priority().total()
    }

    /// Number of mailboxes.
    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    /// Whether there are no mailboxes.
    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    /// Drop every mailbox and its messages.
    pub fn clear(&mut self) {
        self.mailboxes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_agents::{AgentConfig, CharacterAgent, CouncilAgent, NationAgent};
    use herald_types::Archetype;

    const REALM: EntityId = EntityId(3);

    fn populated() -> ActorRegistry {
        let config = AgentConfig::default();
        let mut registry = ActorRegistry::new(AttentionConfig::default());
        registry.insert(
            Box::new(CouncilAgent::new(
                ActorId(9000),
                REALM,
                "Council",
                Archetype::Diplomat,
                &config,
            )),
            REALM,
        );
        registry.insert(
            Box::new(CharacterAgent::new(
                ActorId(5000),
                EntityId(300),
                "Ser Aldric",
                Archetype::Conqueror,
                REALM,
                &config,
            )),
            REALM,
        );
        registry.insert(
            Box::new(NationAgent::new(
                ActorId(1000),
                REALM,
                "Aragon",
                Archetype::Diplomat,
                &config,
            )),
            REALM,
        );
        registry
    }

    #[test]
    fn realm_index_orders_nation_first() {
        let registry = populated();
        assert_eq!(
            registry.actors_for_realm(REALM),
            vec![ActorId(1000), ActorId(5000), ActorId(9000)]
        );
        assert_eq!(registry.nation_for_realm(REALM), Some(ActorId(1000)));
        assert_eq!(registry.attention().len(), 3);
        assert_eq!(registry.ids_of_kind(ActorKind::Character), vec![ActorId(5000)]);
    }

    #[test]
    fn removal_unregisters_everything() {
        let mut registry = populated();
        assert!(registry.remove(ActorId(1000)).is_some());
        assert!(registry.remove(ActorId(1000)).is_none());
        assert_eq!(registry.nation_for_realm(REALM), None);
        assert!(registry.attention().profile(ActorId(1000)).is_none());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.clear(), 2);
        assert!(registry.actors_for_realm(REALM).is_empty());
        assert!(registry.attention().is_empty());
    }

    #[test]
    fn mailbox_snapshot_shares_mailboxes() {
        let mut mailboxes = MailboxRegistry::new();
        let created = mailboxes.create(ActorId(1000));
        let snapshot = mailboxes.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot
            .first()
            .is_some_and(|(_, mailbox)| Arc::ptr_eq(mailbox, &created)));
        assert!(mailboxes.remove(ActorId(1000)).is_some());
        assert!(mailboxes.get(ActorId(1000)).is_none());
        assert_eq!(mailboxes.total_queued(), 0);
    }
}
