//! The actor director.
//!
//! The [`Director`] owns every decision agent and its mailbox, turns
//! filtered packets into scheduled messages, and dispatches them within a
//! bounded per-frame budget. It is driven once per simulation tick from the
//! host's main loop; no decision logic runs on a thread of its own.
//!
//! # Frame
//!
//! 1. One due critical message per actor, unconditionally.
//! 2. Candidates in order: actors with pending high-priority messages, then
//!    nations, characters, and councils. Up to `max_actors_per_frame` actors
//!    with due work are served, each for up to `max_messages_per_actor`
//!    messages. Messages that are not yet due stay queued.
//! 3. If the frame was light, a bounded batch of background updates.
//! 4. Every `load_balance_interval_frames` frames, the actor budget is
//!    nudged up or down within `[actors_per_frame_floor, actors_per_frame_ceiling]`.
//!
//! After every dispatched message and every background update the agent
//! executes one queued decision per category. The resulting records go to
//! the [`DecisionSink`]; the director never applies them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{NaiveDateTime, TimeDelta};
use herald_agents::{
    AgentConfig, AgentContext, AttentionConfig, AttentionResult, AttentionStats, CharacterAgent,
    CouncilAgent, DecisionAgent, NationAgent, RealmView,
};
use herald_types::{ActorId, ActorKind, Archetype, DecisionRecord, EntityId, Packet, RegionId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DirectorConfig;
use crate::control::{DirectorState, Transition};
use crate::error::DirectorError;
use crate::ids::IdAllocator;
use crate::mailbox::{Mailbox, Message, Priority, TierCounts};
use crate::registry::{ActorRegistry, MailboxRegistry};
use crate::sink::DecisionSink;

/// Smoothing factor for the running averages.
const EMA_ALPHA: f64 = 0.1;

/// Load balancer step when many mailboxes are overloaded.
const LOAD_BALANCE_STEP_UP: usize = 2;

/// Load balancer step when the queues are nearly empty.
const LOAD_BALANCE_STEP_DOWN: usize = 1;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Exponential moving average stored as `f64` bits.
#[derive(Debug, Default)]
struct Ema(AtomicU64);

impl Ema {
    fn record(&self, sample: f64) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            let next = if bits == 0 {
                sample
            } else {
                sample.mul_add(EMA_ALPHA, f64::from_bits(bits) * (1.0 - EMA_ALPHA))
            };
            Some(next.to_bits())
        });
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct DirectorMetrics {
    frames: AtomicU64,
    decisions: AtomicU64,
    messages: AtomicU64,
    critical: AtomicU64,
    failed: AtomicU64,
    background: AtomicU64,
    over_budget: AtomicU64,
    load_balances: AtomicU64,
    frame_ms: Ema,
    decision_us: Ema,
}

impl DirectorMetrics {
    fn add(counter: &AtomicU64, amount: usize) {
        counter.fetch_add(u64::try_from(amount).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.frames,
            &self.decisions,
            &self.messages,
            &self.critical,
            &self.failed,
            &self.background,
            &self.over_budget,
            &self.load_balances,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.frame_ms.reset();
        self.decision_us.reset();
    }
}

/// Point-in-time copy of the director counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Frames dispatched.
    pub total_frames: u64,
    /// Decision records submitted to the sink.
    pub total_decisions: u64,
    /// Messages handed to agents, critical ones included.
    pub messages_processed: u64,
    /// Messages handled in the critical pass.
    pub critical_processed: u64,
    /// Messages or background updates an agent failed on.
    pub failed_messages: u64,
    /// Background updates run.
    pub background_tasks: u64,
    /// Frames slower than `target_frame_ms`.
    pub frames_over_budget: u64,
    /// Load balancing passes.
    pub load_balance_runs: u64,
    /// Running average frame time in milliseconds.
    pub avg_frame_ms: f64,
    /// Running average per-message decision time in microseconds.
    pub avg_decision_us: f64,
}

/// What one frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// Messages handled in the critical pass.
    pub critical_processed: usize,
    /// Messages handled in the candidate pass.
    pub messages_processed: usize,
    /// Actors that had at least one due message in the candidate pass.
    pub actors_processed: usize,
    /// Background updates run.
    pub background_tasks_run: usize,
    /// Decision records submitted.
    pub decisions_emitted: usize,
    /// Whether the load balancer ran this frame.
    pub load_balanced: bool,
}

// ---------------------------------------------------------------------------
// Background queue
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BackgroundQueue {
    tasks: VecDeque<ActorId>,
    nation_cursor: usize,
    character_cursor: usize,
}

impl BackgroundQueue {
    fn enqueue(&mut self, actors: impl IntoIterator<Item = ActorId>) {
        for actor in actors {
            if !self.tasks.contains(&actor) {
                self.tasks.push_back(actor);
            }
        }
    }
}

/// Up to `count` ids starting at `cursor`, wrapping around. Advances the
/// cursor past what was taken.
fn take_round_robin(ids: &[ActorId], cursor: &mut usize, count: usize) -> Vec<ActorId> {
    let take = count.min(ids.len());
    let start = cursor.checked_rem(ids.len()).unwrap_or(0);
    let picked = ids.iter().cycle().skip(start).take(take).copied().collect();
    *cursor = start.saturating_add(take);
    picked
}

// ---------------------------------------------------------------------------
// Director
// ---------------------------------------------------------------------------

/// Actor registry, mailboxes, and the per-frame dispatcher.
pub struct Director {
    config: DirectorConfig,
    agent_config: AgentConfig,
    realms: Arc<dyn RealmView>,
    sink: Arc<dyn DecisionSink>,
    state: Mutex<DirectorState>,
    ids: Mutex<IdAllocator>,
    registry: Mutex<ActorRegistry>,
    mailboxes: Mutex<MailboxRegistry>,
    background: Mutex<BackgroundQueue>,
    metrics: DirectorMetrics,
    max_actors_per_frame: AtomicUsize,
    frame_counter: AtomicU64,
}

impl core::fmt::Debug for Director {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Director")
            .field("state", &self.state())
            .field("actors", &self.active_actor_count())
            .field("max_actors_per_frame", &self.max_actors_per_frame())
            .finish_non_exhaustive()
    }
}

impl Director {
    /// Create a director in the `Initializing` state.
    pub fn new(
        config: DirectorConfig,
        attention: AttentionConfig,
        agent_config: AgentConfig,
        realms: Arc<dyn RealmView>,
        sink: Arc<dyn DecisionSink>,
    ) -> Self {
        let director = Self {
            registry: Mutex::new(ActorRegistry::new(attention)),
            max_actors_per_frame: AtomicUsize::new(config.max_actors_per_frame),
            config,
            agent_config,
            realms,
            sink,
            state: Mutex::new(DirectorState::Initializing),
            ids: Mutex::new(IdAllocator::new()),
            mailboxes: Mutex::new(MailboxRegistry::new()),
            background: Mutex::new(BackgroundQueue::default()),
            metrics: DirectorMetrics::default(),
            frame_counter: AtomicU64::new(0),
        };
        let budget = director.clamp_budget(director.config.max_actors_per_frame);
        director.max_actors_per_frame.store(budget, Ordering::Relaxed);
        director
    }

    fn lock_state(&self) -> MutexGuard<'_, DirectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> MutexGuard<'_, ActorRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mailboxes(&self) -> MutexGuard<'_, MailboxRegistry> {
        self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_background(&self) -> MutexGuard<'_, BackgroundQueue> {
        self.background.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Current lifecycle state.
    pub fn state(&self) -> DirectorState {
        *self.lock_state()
    }

    fn transition(&self, transition: Transition) -> Result<DirectorState, DirectorError> {
        let mut state = self.lock_state();
        let next = state
            .apply(transition)
            .ok_or(DirectorError::InvalidTransition {
                state: *state,
                transition,
            })?;
        info!(from = %*state, to = %next, "Director state changed");
        *state = next;
        Ok(next)
    }

    /// Finish setup. `Initializing` to `Stopped`.
    pub fn initialize(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Initialize)
    }

    /// Begin dispatching frames.
    pub fn start(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Start)
    }

    /// Suspend dispatching. Mailboxes keep filling.
    pub fn pause(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Pause)
    }

    /// Continue after a pause.
    pub fn resume(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Resume)
    }

    /// Stop dispatching.
    pub fn stop(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Stop)
    }

    /// Drop every actor, mailbox, and background task, ending `Stopped`.
    pub fn shutdown(&self) -> Result<DirectorState, DirectorError> {
        self.transition(Transition::Shutdown)?;
        let actors = {
            let mut registry = self.lock_registry();
            let dropped = registry.clear();
            self.lock_mailboxes().clear();
            dropped
        };
        *self.lock_background() = BackgroundQueue::default();
        info!(actors, "Director shut down");
        self.transition(Transition::Finish)
    }

    // -- actors -------------------------------------------------------------

    /// Register an agent built by `factory` for a freshly allocated id of
    /// `kind`, serving `realm`. The factory must build the agent under the
    /// id it is given.
    pub fn create_actor_with<F>(
        &self,
        kind: ActorKind,
        realm: EntityId,
        factory: F,
    ) -> Result<ActorId, DirectorError>
    where
        F: FnOnce(ActorId) -> Box<dyn DecisionAgent>,
    {
        let allocated = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocate(kind)?;
        let agent = factory(allocated);
        let actor = agent.actor();
        let name = agent.name().to_owned();
        {
            let mut registry = self.lock_registry();
            registry.insert(agent, realm);
            self.lock_mailboxes().create(actor);
        }
        info!(actor = %actor, kind = %kind, realm = %realm, name = %name, "Actor created");
        Ok(actor)
    }

    /// Create the nation agent speaking for `realm`.
    pub fn create_nation(
        &self,
        realm: EntityId,
        name: &str,
        archetype: Archetype,
    ) -> Result<ActorId, DirectorError> {
        self.create_actor_with(ActorKind::Nation, realm, |actor| {
            Box::new(NationAgent::new(actor, realm, name, archetype, &self.agent_config))
        })
    }

    /// Create a character agent serving `liege`.
    pub fn create_character(
        &self,
        character: EntityId,
        liege: EntityId,
        name: &str,
        archetype: Archetype,
    ) -> Result<ActorId, DirectorError> {
        self.create_actor_with(ActorKind::Character, liege, |actor| {
            Box::new(CharacterAgent::new(
                actor,
                character,
                name,
                archetype,
                liege,
                &self.agent_config,
            ))
        })
    }

    /// Create the council of `realm`, named after it.
    pub fn create_council(
        &self,
        realm: EntityId,
        realm_name: &str,
        archetype: Archetype,
    ) -> Result<ActorId, DirectorError> {
        self.create_actor_with(ActorKind::Council, realm, |actor| {
            Box::new(CouncilAgent::new(
                actor,
                realm,
                format!("{realm_name} Council"),
                archetype,
                &self.agent_config,
            ))
        })
    }

    /// Remove an actor with its attention profile and mailbox. Queued
    /// messages are discarded. Returns whether anything was removed.
    pub fn destroy_actor(&self, actor: ActorId) -> bool {
        let (agent, mailbox) = {
            let mut registry = self.lock_registry();
            let agent = registry.remove(actor);
            let mailbox = self.lock_mailboxes().remove(actor);
            (agent, mailbox)
        };
        self.lock_background().tasks.retain(|queued| *queued != actor);

        if agent.is_none() && mailbox.is_none() {
            return false;
        }
        let discarded = mailbox.map_or(0, |mailbox| mailbox.clear());
        info!(actor = %actor, discarded, "Actor destroyed");
        true
    }

    /// Whether `actor` is registered.
    pub fn has_actor(&self, actor: ActorId) -> bool {
        self.lock_registry().contains(actor)
    }

    /// Registered actors.
    pub fn active_actor_count(&self) -> usize {
        self.lock_registry().len()
    }

    /// Registered actors of one kind.
    pub fn actors_of_kind(&self, kind: ActorKind) -> Vec<ActorId> {
        self.lock_registry().ids_of_kind(kind)
    }

    /// Every actor serving `realm`, nation first.
    pub fn actors_for_realm(&self, realm: EntityId) -> Vec<ActorId> {
        self.lock_registry().actors_for_realm(realm)
    }

    /// The nation actor of `realm`.
    pub fn nation_for_realm(&self, realm: EntityId) -> Option<ActorId> {
        self.lock_registry().nation_for_realm(realm)
    }

    /// Decisions queued across every agent and not yet executed.
    pub fn pending_decisions(&self) -> usize {
        self.lock_registry().pending_decisions()
    }

    // -- attention ----------------------------------------------------------

    /// Mark two entities as rivals, or clear it.
    pub fn set_rivalry(&self, a: EntityId, b: EntityId, rivals: bool) {
        self.lock_registry().attention_mut().set_rivalry(a, b, rivals);
    }

    /// Mark two entities as allies, or clear it.
    pub fn set_alliance(&self, a: EntityId, b: EntityId, allied: bool) {
        self.lock_registry().attention_mut().set_alliance(a, b, allied);
    }

    /// Make `region` a special interest of `actor`.
    pub fn watch_region(&self, actor: ActorId, region: RegionId) -> bool {
        self.lock_registry().attention_mut().watch_region(actor, region)
    }

    /// Run the attention filter for one actor without delivering anything.
    pub fn filter_for(&self, packet: &Packet, actor: ActorId) -> AttentionResult {
        self.lock_registry().attention().filter_information(packet, actor)
    }

    /// Attention filter counters.
    pub fn attention_statistics(&self) -> AttentionStats {
        self.lock_registry().attention().statistics()
    }

    // -- delivery -----------------------------------------------------------

    fn delay_for(&self, priority: Priority) -> TimeDelta {
        let delays = &self.config.priority_delay_hours;
        let hours = match priority {
            Priority::Critical => delays.critical_hours,
            Priority::High => delays.high_hours,
            Priority::Medium => delays.medium_hours,
            Priority::Low => delays.low_hours,
        };
        TimeDelta::try_hours(hours.max(0)).unwrap_or(TimeDelta::MAX)
    }

    /// Queue `packet` for `actor` in the `priority` tier, due after that
    /// tier's delay. Returns `false` if the actor has no mailbox.
    pub fn deliver(
        &self,
        packet: Packet,
        actor: ActorId,
        priority: Priority,
        now: NaiveDateTime,
    ) -> bool {
        let mailbox = self.lock_mailboxes().get(actor);
        let Some(mailbox) = mailbox else {
            debug!(actor = %actor, packet = %packet.id, "No mailbox, delivery dropped");
            return false;
        };
        let scheduled_at = now
            .checked_add_signed(self.delay_for(priority))
            .unwrap_or(NaiveDateTime::MAX);
        mailbox.push(Message {
            packet,
            actor,
            priority,
            received_at: now,
            scheduled_at,
        });
        true
    }

    fn deliver_result(
        &self,
        packet: &Packet,
        actor: ActorId,
        result: &AttentionResult,
        now: NaiveDateTime,
    ) -> bool {
        let mut delivered = packet.clone();
        delivered.base_relevance = result.adjusted_relevance;
        let priority = Priority::from_relevance(result.adjusted_relevance);
        self.deliver(delivered, actor, priority, now)
    }

    /// Filter `packet` for one actor and queue it at the filtered
    /// relevance if it passes. Returns the filter outcome either way.
    pub fn deliver_filtered(
        &self,
        packet: &Packet,
        actor: ActorId,
        now: NaiveDateTime,
    ) -> AttentionResult {
        let result = self.filter_for(packet, actor);
        if result.should_receive {
            self.deliver_result(packet, actor, &result, now);
        } else {
            debug!(
                actor = %actor,
                packet = %packet.id,
                reason = ?result.reason,
                "Packet filtered out"
            );
        }
        result
    }

    /// Deliver `packet` to every actor whose filter passes, each at its
    /// own relevance. Returns how many actors it was queued for.
    pub fn broadcast(&self, packet: &Packet, now: NaiveDateTime) -> usize {
        let interested = self
            .lock_registry()
            .attention()
            .get_interested_actors(packet, false);
        interested
            .iter()
            .filter(|(actor, result)| self.deliver_result(packet, *actor, result, now))
            .count()
    }

    // -- queues -------------------------------------------------------------

    /// Messages queued across every mailbox.
    pub fn total_queued(&self) -> usize {
        self.lock_mailboxes().total_queued()
    }

    /// Messages queued across every mailbox, per tier.
    pub fn queued_by_priority(&self) -> TierCounts {
        self.lock_mailboxes().queued_by_priority()
    }

    /// Messages queued for one actor.
    pub fn queued_for(&self, actor: ActorId) -> Option<usize> {
        let mailbox = self.lock_mailboxes().get(actor);
        mailbox.map(|mailbox| mailbox.len())
    }

    /// Current actor budget per frame.
    pub fn max_actors_per_frame(&self) -> usize {
        self.max_actors_per_frame.load(Ordering::Relaxed)
    }

    /// Frames dispatched since creation.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    // -- frames -------------------------------------------------------------

    /// Dispatch one frame if the director is running.
    pub fn update(&self, now: NaiveDateTime) -> Option<FrameReport> {
        if !self.state().is_running() {
            return None;
        }
        Some(self.process_frame(now))
    }

    /// Dispatch one frame regardless of state.
    pub fn process_frame(&self, now: NaiveDateTime) -> FrameReport {
        let started = Instant::now();
        let mut report = FrameReport::default();
        let mailboxes: BTreeMap<ActorId, Arc<Mailbox>> =
            self.lock_mailboxes().snapshot().into_iter().collect();

        self.critical_pass(&mailboxes, now, &mut report);
        self.candidate_pass(&mailboxes, now, &mut report);

        let budget = self.max_actors_per_frame();
        let handled = report
            .critical_processed
            .saturating_add(report.messages_processed);
        if handled < budget.saturating_div(2) {
            self.background_pass(now, &mut report);
        }

        let frame = self.frame_counter.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if frame.checked_rem(self.config.load_balance_interval_frames) == Some(0) {
            self.balance_load();
            report.load_balanced = true;
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.frames.fetch_add(1, Ordering::Relaxed);
        self.metrics.frame_ms.record(elapsed_ms);
        if elapsed_ms > self.config.target_frame_ms {
            self.metrics.over_budget.fetch_add(1, Ordering::Relaxed);
            warn!(
                frame,
                elapsed_ms,
                target_ms = self.config.target_frame_ms,
                "Frame over budget"
            );
        }
        report
    }

    fn critical_pass(
        &self,
        mailboxes: &BTreeMap<ActorId, Arc<Mailbox>>,
        now: NaiveDateTime,
        report: &mut FrameReport,
    ) {
        for mailbox in mailboxes.values() {
            if let Some(message) = mailbox.pop_due_from(Priority::Critical, now) {
                report.critical_processed = report.critical_processed.saturating_add(1);
                let emitted = self.dispatch(&message, now);
                report.decisions_emitted = report.decisions_emitted.saturating_add(emitted);
            }
        }
        DirectorMetrics::add(&self.metrics.critical, report.critical_processed);
    }

    /// Actors with pending high-priority mail first, then nations,
    /// characters, and councils, each in id order.
    fn candidates(mailboxes: &BTreeMap<ActorId, Arc<Mailbox>>) -> Vec<ActorId> {
        let mut seen = BTreeSet::new();
        let high = mailboxes
            .iter()
            .filter(|(_, mailbox)| mailbox.has_pending(Priority::High))
            .map(|(actor, _)| *actor);
        let by_kind = ActorKind::ALL.iter().flat_map(|kind| {
            mailboxes
                .keys()
                .copied()
                .filter(move |actor| ActorKind::classify(*actor) == Some(*kind))
        });
        high.chain(by_kind)
            .filter(|actor| {
                mailboxes.get(actor).is_some_and(|mailbox| !mailbox.is_empty())
                    && seen.insert(*actor)
            })
            .collect()
    }

    fn candidate_pass(
        &self,
        mailboxes: &BTreeMap<ActorId, Arc<Mailbox>>,
        now: NaiveDateTime,
        report: &mut FrameReport,
    ) {
        let budget = self.max_actors_per_frame();
        for actor in Self::candidates(mailboxes) {
            if report.actors_processed >= budget {
                break;
            }
            let Some(mailbox) = mailboxes.get(&actor) else {
                continue;
            };
            let mut handled = 0_usize;
            while handled < self.config.max_messages_per_actor {
                let Some(message) = mailbox.pop_due(now) else {
                    break;
                };
                handled = handled.saturating_add(1);
                let emitted = self.dispatch(&message, now);
                report.decisions_emitted = report.decisions_emitted.saturating_add(emitted);
            }
            if handled > 0 {
                report.actors_processed = report.actors_processed.saturating_add(1);
                report.messages_processed = report.messages_processed.saturating_add(handled);
            }
        }
    }

    /// Hand one message to its agent, then execute its queued decisions.
    /// Returns the number of records submitted.
    fn dispatch(&self, message: &Message, now: NaiveDateTime) -> usize {
        let started = Instant::now();
        self.metrics.messages.fetch_add(1, Ordering::Relaxed);
        let records = {
            let mut registry = self.lock_registry();
            let Some(agent) = registry.agent_mut(message.actor) else {
                debug!(actor = %message.actor, "Actor gone, message dropped");
                return 0;
            };
            let ctx = AgentContext::new(now, self.realms.as_ref());
            if let Err(error) = agent.process_information(&message.packet, &ctx) {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    actor = %message.actor,
                    packet = %message.packet.id,
                    error = %error,
                    "Agent failed to process packet"
                );
                return 0;
            }
            agent.execute_records(&ctx)
        };
        let emitted = self.submit(records);
        self.metrics
            .decision_us
            .record(started.elapsed().as_secs_f64() * 1_000_000.0);
        emitted
    }

    fn submit(&self, records: Vec<DecisionRecord>) -> usize {
        let emitted = records.len();
        for record in records {
            debug!(
                actor = %record.actor,
                intent = record.intent.label(),
                "Decision submitted"
            );
            self.sink.submit(record);
        }
        DirectorMetrics::add(&self.metrics.decisions, emitted);
        emitted
    }

    fn background_pass(&self, now: NaiveDateTime, report: &mut FrameReport) {
        let tasks: Vec<ActorId> = {
            let mut background = self.lock_background();
            let take = self
                .config
                .background_tasks_per_frame
                .min(background.tasks.len());
            background.tasks.drain(..take).collect()
        };

        for actor in tasks {
            let records = {
                let mut registry = self.lock_registry();
                let Some(agent) = registry.agent_mut(actor) else {
                    continue;
                };
                let ctx = AgentContext::new(now, self.realms.as_ref());
                if let Err(error) = agent.background_update(&ctx) {
                    self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(actor = %actor, error = %error, "Background update failed");
                }
                agent.execute_records(&ctx)
            };
            report.background_tasks_run = report.background_tasks_run.saturating_add(1);
            let emitted = self.submit(records);
            report.decisions_emitted = report.decisions_emitted.saturating_add(emitted);
        }
        DirectorMetrics::add(&self.metrics.background, report.background_tasks_run);

        self.schedule_background();
    }

    /// Queue the next few nations and characters, rotating through them.
    fn schedule_background(&self) {
        let (nations, characters) = {
            let registry = self.lock_registry();
            (
                registry.ids_of_kind(ActorKind::Nation),
                registry.ids_of_kind(ActorKind::Character),
            )
        };
        let mut background = self.lock_background();
        let mut cursor = background.nation_cursor;
        let picked = take_round_robin(
            &nations,
            &mut cursor,
            self.config.background_nations_per_pass,
        );
        background.nation_cursor = cursor;
        background.enqueue(picked);

        let mut cursor = background.character_cursor;
        let picked = take_round_robin(
            &characters,
            &mut cursor,
            self.config.background_characters_per_pass,
        );
        background.character_cursor = cursor;
        background.enqueue(picked);
    }

    /// Background updates waiting to run.
    pub fn background_backlog(&self) -> usize {
        self.lock_background().tasks.len()
    }

    // -- load balancing -----------------------------------------------------

    fn clamp_budget(&self, budget: usize) -> usize {
        let floor = self
            .config
            .actors_per_frame_floor
            .min(self.config.actors_per_frame_ceiling);
        let ceiling = self
            .config
            .actors_per_frame_floor
            .max(self.config.actors_per_frame_ceiling);
        budget.max(floor).min(ceiling)
    }

    /// Adjust the actor budget from current mailbox depths and return it.
    ///
    /// Raised when more than `overload_actor_count` mailboxes hold over
    /// `overload_queue_depth` messages. Lowered when none do and fewer than
    /// `low_total_queued` messages are waiting overall.
    pub fn balance_load(&self) -> usize {
        let depths: Vec<usize> = self
            .lock_mailboxes()
            .snapshot()
            .iter()
            .map(|(_, mailbox)| mailbox.len())
            .collect();
        let overloaded = depths
            .iter()
            .filter(|depth| **depth > self.config.overload_queue_depth)
            .count();
        let total = depths.iter().copied().fold(0, usize::saturating_add);

        let current = self.max_actors_per_frame();
        let next = if overloaded > self.config.overload_actor_count {
            current.saturating_add(LOAD_BALANCE_STEP_UP)
        } else if overloaded == 0 && total < self.config.low_total_queued {
            current.saturating_sub(LOAD_BALANCE_STEP_DOWN)
        } else {
            current
        };
        let next = self.clamp_budget(next);
        self.max_actors_per_frame.store(next, Ordering::Relaxed);
        self.metrics.load_balances.fetch_add(1, Ordering::Relaxed);
        if next != current {
            info!(from = current, to = next, overloaded, total, "Actor budget adjusted");
        }
        next
    }

    // -- metrics ------------------------------------------------------------

    /// Copy of the counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        let m = &self.metrics;
        MetricsSnapshot {
            total_frames: m.frames.load(Ordering::Relaxed),
            total_decisions: m.decisions.load(Ordering::Relaxed),
            messages_processed: m.messages.load(Ordering::Relaxed),
            critical_processed: m.critical.load(Ordering::Relaxed),
            failed_messages: m.failed.load(Ordering::Relaxed),
            background_tasks: m.background.load(Ordering::Relaxed),
            frames_over_budget: m.over_budget.load(Ordering::Relaxed),
            load_balance_runs: m.load_balances.load(Ordering::Relaxed),
            avg_frame_ms: m.frame_ms.get(),
            avg_decision_us: m.decision_us.get(),
        }
    }

    /// Zero every counter and running average.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Human-readable summary, one line per entry.
    pub fn performance_report(&self) -> Vec<String> {
        let metrics = self.metrics();
        let queued = self.queued_by_priority();
        vec![
            "=== Herald Director Performance ===".to_owned(),
            format!("State: {}", self.state()),
            format!("Active Actors: {}", self.active_actor_count()),
            format!("Total Frames: {}", metrics.total_frames),
            format!("Total Decisions: {}", metrics.total_decisions),
            format!("Messages Processed: {}", metrics.messages_processed),
            format!("Failed Messages: {}", metrics.failed_messages),
            format!(
                "Queued Messages: {} (critical {}, high {}, medium {}, low {})",
                queued.total(),
                queued.critical,
                queued.high,
                queued.medium,
                queued.low
            ),
            format!("Average Frame Time: {:.3} ms", metrics.avg_frame_ms),
            format!("Average Decision Time: {:.1} us", metrics.avg_decision_us),
            format!("Frames Over Budget: {}", metrics.frames_over_budget),
            format!("Max Actors/Frame: {}", self.max_actors_per_frame()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DecisionLog;
    use chrono::NaiveDate;
    use herald_agents::{AgentError, RealmSnapshot, StaticRealms};
    use herald_types::{InformationType, Intent};

    const REALM: EntityId = EntityId(1);

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn packet(kind: InformationType, severity: f64) -> Packet {
        Packet::new(kind, RegionId(1), EntityId(2), severity, epoch())
    }

    fn director_with(config: DirectorConfig, realms: StaticRealms) -> (Director, DecisionLog) {
        let log = DecisionLog::new(1000);
        let director = Director::new(
            config,
            AttentionConfig::default(),
            AgentConfig::default(),
            Arc::new(realms),
            Arc::new(log.clone()),
        );
        (director, log)
    }

    fn running(config: DirectorConfig) -> (Director, DecisionLog) {
        let mut realms = StaticRealms::new();
        realms.set_realm(REALM, RealmSnapshot::default());
        let (director, log) = director_with(config, realms);
        assert!(director.initialize().is_ok());
        assert!(director.start().is_ok());
        (director, log)
    }

    /// Queues one economic decision per message and fails on rebellions.
    struct Scripted {
        actor: ActorId,
        queued: usize,
        background_runs: usize,
    }

    impl DecisionAgent for Scripted {
        fn actor(&self) -> ActorId {
            self.actor
        }

        fn entity(&self) -> EntityId {
            REALM
        }

        fn name(&self) -> &str {
            "Scripted"
        }

        fn archetype(&self) -> Archetype {
            Archetype::Balanced
        }

        fn process_information(
            &mut self,
            packet: &Packet,
            _ctx: &AgentContext<'_>,
        ) -> Result<(), AgentError> {
            if packet.kind == InformationType::Rebellion {
                return Err(AgentError::RealmUnavailable(REALM));
            }
            self.queued += 1;
            Ok(())
        }

        fn background_update(&mut self, _ctx: &AgentContext<'_>) -> Result<(), AgentError> {
            self.background_runs += 1;
            Ok(())
        }

        fn execute_decisions(&mut self, _ctx: &AgentContext<'_>) -> Vec<Intent> {
            if self.queued == 0 {
                return Vec::new();
            }
            self.queued -= 1;
            vec![Intent::Economic {
                policy: herald_types::EconomicPolicy::AdjustTaxes,
                amount: 0.1,
            }]
        }

        fn pending_decisions(&self) -> usize {
            self.queued
        }
    }

    fn scripted(director: &Director) -> ActorId {
        director
            .create_actor_with(ActorKind::Nation, REALM, |actor| {
                Box::new(Scripted {
                    actor,
                    queued: 0,
                    background_runs: 0,
                })
            })
            .unwrap_or_default()
    }

    #[test]
    fn update_is_a_no_op_unless_running() {
        let (director, _) = director_with(DirectorConfig::default(), StaticRealms::new());
        assert!(director.update(epoch()).is_none());
        assert!(director.initialize().is_ok());
        assert!(director.update(epoch()).is_none());
        assert!(director.start().is_ok());
        assert!(director.update(epoch()).is_some());
        assert!(director.pause().is_ok());
        assert!(director.update(epoch()).is_none());
    }

    #[test]
    fn illegal_transition_leaves_state_alone() {
        let (director, _) = director_with(DirectorConfig::default(), StaticRealms::new());
        assert!(matches!(
            director.start(),
            Err(DirectorError::InvalidTransition {
                state: DirectorState::Initializing,
                transition: Transition::Start,
            })
        ));
        assert_eq!(director.state(), DirectorState::Initializing);
    }

    #[test]
    fn critical_messages_are_handled_in_the_same_frame() {
        let (director, log) = running(DirectorConfig::default());
        let actor = scripted(&director);
        assert!(director.deliver(
            packet(InformationType::MilitaryAction, 0.9),
            actor,
            Priority::Critical,
            epoch(),
        ));
        let report = director.update(epoch()).unwrap_or_default();
        assert_eq!(report.critical_processed, 1);
        assert_eq!(report.decisions_emitted, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(director.total_queued(), 0);
    }

    #[test]
    fn messages_wait_for_their_scheduled_date() {
        let (director, _) = running(DirectorConfig::default());
        let actor = scripted(&director);
        director.deliver(
            packet(InformationType::EconomicCrisis, 0.5),
            actor,
            Priority::High,
            epoch(),
        );
        let report = director.update(epoch()).unwrap_or_default();
        assert_eq!(report.messages_processed, 0);
        assert_eq!(director.queued_for(actor), Some(1));

        let next_day = epoch() + TimeDelta::hours(24);
        let report = director.update(next_day).unwrap_or_default();
        assert_eq!(report.messages_processed, 1);
        assert_eq!(report.actors_processed, 1);
        assert_eq!(director.queued_for(actor), Some(0));
    }

    #[test]
    fn overflowing_delay_defers_instead_of_firing() {
        let config = DirectorConfig {
            priority_delay_hours: crate::config::PriorityDelays {
                low_hours: i64::MAX,
                ..crate::config::PriorityDelays::default()
            },
            ..DirectorConfig::default()
        };
        let (director, _) = running(config);
        let actor = scripted(&director);
        assert!(director.deliver(
            packet(InformationType::EconomicCrisis, 0.5),
            actor,
            Priority::Low,
            epoch(),
        ));
        let far_future = epoch() + TimeDelta::days(365 * 1000);
        let report = director.update(far_future).unwrap_or_default();
        assert_eq!(report.messages_processed, 0);
        assert_eq!(director.queued_for(actor), Some(1));
    }

    #[test]
    fn per_actor_message_cap_leaves_the_rest_queued() {
        let config = DirectorConfig {
            max_messages_per_actor: 2,
            ..DirectorConfig::default()
        };
        let (director, _) = running(config);
        let actor = scripted(&director);
        for _ in 0..5 {
            director.deliver(
                packet(InformationType::EconomicCrisis, 0.5),
                actor,
                Priority::Medium,
                epoch(),
            );
        }
        let later = epoch() + TimeDelta::days(7);
        let report = director.update(later).unwrap_or_default();
        assert_eq!(report.messages_processed, 2);
        assert_eq!(director.queued_for(actor), Some(3));
    }

    #[test]
    fn agent_failure_abandons_only_that_message() {
        let (director, log) = running(DirectorConfig::default());
        let actor = scripted(&director);
        director.deliver(
            packet(InformationType::Rebellion, 0.5),
            actor,
            Priority::Critical,
            epoch(),
        );
        director.deliver(
            packet(InformationType::EconomicCrisis, 0.5),
            actor,
            Priority::Critical,
            epoch(),
        );
        // The rebellion fails in the critical pass; the candidate pass
        // still picks up the second message in the same frame.
        let report = director.update(epoch()).unwrap_or_default();
        assert_eq!(report.critical_processed, 1);
        assert_eq!(report.messages_processed, 1);
        assert_eq!(director.metrics().failed_messages, 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn destroying_an_actor_discards_its_mail() {
        let (director, _) = running(DirectorConfig::default());
        let actor = scripted(&director);
        let other = scripted(&director);
        for target in [actor, actor, other] {
            director.deliver(
                packet(InformationType::EconomicCrisis, 0.5),
                target,
                Priority::Low,
                epoch(),
            );
        }
        assert_eq!(director.total_queued(), 3);
        assert!(director.destroy_actor(actor));
        assert!(!director.destroy_actor(actor));
        assert_eq!(director.total_queued(), 1);
        assert!(!director.deliver(
            packet(InformationType::EconomicCrisis, 0.5),
            actor,
            Priority::Low,
            epoch(),
        ));
    }

    #[test]
    fn broadcast_reaches_watchers_of_the_source_region() {
        let (director, _) = running(DirectorConfig::default());
        let watcher = scripted(&director);
        let _bystander = scripted(&director);
        assert!(director.watch_region(watcher, RegionId(1)));

        let reached = director.broadcast(&packet(InformationType::CulturalShift, 0.0), epoch());
        assert!(reached >= 1);
        assert_eq!(director.queued_for(watcher), Some(1));
        assert_eq!(director.total_queued(), reached);
    }

    #[test]
    fn background_rotates_through_actors() {
        let config = DirectorConfig {
            background_nations_per_pass: 1,
            background_tasks_per_frame: 1,
            ..DirectorConfig::default()
        };
        let (director, _) = running(config);
        let first = scripted(&director);
        let second = scripted(&director);

        // Frame 1 only schedules; frames 2 and 3 run one task each.
        let reports: Vec<FrameReport> = (0..3)
            .map(|_| director.update(epoch()).unwrap_or_default())
            .collect();
        assert_eq!(
            reports.iter().map(|r| r.background_tasks_run).collect::<Vec<_>>(),
            vec![0, 1, 1]
        );
        let registry = director.lock_registry();
        for actor in [first, second] {
            assert_eq!(registry.agent(actor).map(|a| a.pending_decisions()), Some(0));
        }
    }

    #[test]
    fn critical_work_counts_against_the_background_budget() {
        let config = DirectorConfig {
            max_actors_per_frame: 2,
            actors_per_frame_floor: 1,
            background_nations_per_pass: 1,
            background_tasks_per_frame: 1,
            ..DirectorConfig::default()
        };
        let (director, _) = running(config);
        let actor = scripted(&director);

        let scheduling = director.update(epoch()).unwrap_or_default();
        assert_eq!(scheduling.background_tasks_run, 0);

        assert!(director.deliver(
            packet(InformationType::EconomicCrisis, 0.9),
            actor,
            Priority::Critical,
            epoch(),
        ));
        let busy = director.update(epoch()).unwrap_or_default();
        assert_eq!(busy.critical_processed, 1);
        assert_eq!(busy.background_tasks_run, 0);

        let idle = director.update(epoch()).unwrap_or_default();
        assert_eq!(idle.background_tasks_run, 1);
    }

    #[test]
    fn round_robin_wraps() {
        let ids = [ActorId(1), ActorId(2), ActorId(3)];
        let mut cursor = 0;
        assert_eq!(take_round_robin(&ids, &mut cursor, 2), vec![ActorId(1), ActorId(2)]);
        assert_eq!(take_round_robin(&ids, &mut cursor, 2), vec![ActorId(3), ActorId(1)]);
        assert!(take_round_robin(&[], &mut cursor, 2).is_empty());
    }

    #[test]
    fn load_balancer_stays_within_bounds() {
        let config = DirectorConfig {
            max_actors_per_frame: 6,
            overload_queue_depth: 1,
            overload_actor_count: 0,
            ..DirectorConfig::default()
        };
        let (director, _) = running(config);
        let actor = scripted(&director);

        // Nothing queued: the budget sinks to the floor and stays there.
        for _ in 0..5 {
            director.balance_load();
        }
        assert_eq!(director.max_actors_per_frame(), 5);

        for _ in 0..3 {
            director.deliver(
                packet(InformationType::EconomicCrisis, 0.5),
                actor,
                Priority::Low,
                epoch(),
            );
        }
        for _ in 0..20 {
            let budget = director.balance_load();
            assert!((5..=20).contains(&budget));
        }
        assert_eq!(director.max_actors_per_frame(), 20);
    }

    #[test]
    fn out_of_range_budget_is_clamped_at_construction() {
        let config = DirectorConfig {
            max_actors_per_frame: 100,
            ..DirectorConfig::default()
        };
        let (director, _) = director_with(config, StaticRealms::new());
        assert_eq!(director.max_actors_per_frame(), 20);
    }

    #[test]
    fn nation_without_realm_data_counts_a_failure() {
        let (director, _) = director_with(DirectorConfig::default(), StaticRealms::new());
        assert!(director.initialize().is_ok());
        assert!(director.start().is_ok());
        let nation = director
            .create_nation(EntityId(9), "Nowhere", Archetype::Conqueror)
            .unwrap_or_default();
        director.deliver(
            packet(InformationType::MilitaryAction, 0.9),
            nation,
            Priority::Critical,
            epoch(),
        );
        director.update(epoch());
        assert_eq!(director.metrics().failed_messages, 1);
    }

    #[test]
    fn shutdown_clears_everything() {
        let (director, _) = running(DirectorConfig::default());
        let nation = director.create_nation(REALM, "Aragon", Archetype::Diplomat);
        let council = director.create_council(REALM, "Aragon", Archetype::Diplomat);
        assert!(nation.is_ok() && council.is_ok());
        assert_eq!(director.actors_for_realm(REALM).len(), 2);

        assert_eq!(director.shutdown().ok(), Some(DirectorState::Stopped));
        assert_eq!(director.active_actor_count(), 0);
        assert_eq!(director.total_queued(), 0);
        assert_eq!(director.attention_statistics().filtered, 0);
    }

    #[test]
    fn performance_report_names_the_state() {
        let (director, _) = running(DirectorConfig::default());
        let report = director.performance_report();
        assert_eq!(
            report.first().map(String::as_str),
            Some("=== Herald Director Performance ===")
        );
        assert!(report.iter().any(|line| line == "State: RUNNING"));
        director.reset_metrics();
        assert_eq!(director.metrics(), MetricsSnapshot::default());
    }
}
