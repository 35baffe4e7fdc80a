//! The propagation engine.
//!
//! [`PropagationEngine`] turns one originating [`Packet`] into a wave of
//! time-scheduled deliveries across the region-adjacency graph:
//!
//! 1. [`start_propagation`](PropagationEngine::start_propagation) delivers
//!    the packet at zero delay to the nation owning the source region and
//!    schedules relays to its neighbours.
//! 2. [`process_queue`](PropagationEngine::process_queue) pops a bounded
//!    batch of due nodes (earliest arrival first), delivers each to the
//!    owner of the region it reached, and relays it onward.
//!
//! A relay is rejected when its accuracy would fall below the floor, the
//! hop cap is exceeded, the region is already on the path, or the region is
//! too far from the source. It is blocked when the source nation and the
//! destination nation are hostile and not diplomatic neighbours, or when
//! the destination sits in the sphere of a nation hostile to the packet's
//! originator. Each packet reaches a region at most once, through its
//! earliest scheduled arrival.
//!
//! Internal state sits behind three locks, always taken in the order
//! cache, then queue, then statistics. None of them is held while calling
//! out to the diplomacy provider with another lock pending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;

use chrono::{NaiveDateTime, TimeDelta};
use herald_types::{EntityId, Packet, PacketId, RegionId, Relevance};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PropagationConfig;
use crate::diplomacy::{DiplomacyProvider, SAME_NATION_DELAY_MULTIPLIER};
use crate::error::WorldError;
use crate::pathfinding;
use crate::region::{RegionCache, WorldDataProvider};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Delays longer than this (about 30 000 years) are treated as unreachable.
const MAX_DELAY_SECONDS: f64 = 1.0e12;

// ---------------------------------------------------------------------------
// Public records
// ---------------------------------------------------------------------------

/// A packet arriving at a nation.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The packet as it arrived (degraded accuracy, extended path).
    pub packet: Packet,
    /// Receiving nation.
    pub nation: EntityId,
    /// Region where the news arrived.
    pub region: RegionId,
    /// Game date of arrival.
    pub arrival: NaiveDateTime,
    /// Days between the event and its arrival here.
    pub delay_days: f64,
}

/// Why a relay was not scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DropReason {
    /// Accuracy floor, hop cap, or loop.
    Irrelevant,
    /// Beyond the maximum distance from the source.
    Distance,
    /// Source and destination nations are hostile.
    Diplomatic,
    /// Destination is dominated by a nation hostile to the originator.
    Sphere,
    /// Region, position, or owner data was missing.
    MissingData,
}

/// Rolling statistics exposed for observability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationStats {
    /// Packets handed to `start_propagation`.
    pub packets_created: u64,
    /// Relay nodes pushed onto the queue.
    pub nodes_scheduled: u64,
    /// Relay nodes popped and expanded.
    pub nodes_processed: u64,
    /// Relays skipped because an earlier arrival was already scheduled.
    pub nodes_superseded: u64,
    /// Deliveries made to nations.
    pub deliveries: u64,
    /// Drops for accuracy floor, hop cap, or loop.
    pub dropped_irrelevant: u64,
    /// Drops for distance.
    pub dropped_distance: u64,
    /// Drops for diplomatic blocking.
    pub dropped_diplomatic: u64,
    /// Drops for sphere-of-influence blocking.
    pub dropped_sphere: u64,
    /// Drops for missing reference data.
    pub dropped_missing_data: u64,
    /// Mean days between event and delivery.
    pub average_delivery_days: f64,
    /// Mean accuracy at delivery.
    pub average_delivery_accuracy: f64,
    /// `process_queue` calls that found due work.
    pub process_calls: u64,
    /// Mean wall-clock latency of those calls.
    pub average_process_micros: f64,
    /// Worst wall-clock latency of those calls.
    pub peak_process_micros: u64,
    /// Calls that exceeded the soft time budget.
    pub budget_overruns: u64,
    /// Explicit path queries run.
    pub pathfinding_calls: u64,
    /// Path queries that ran out of node budget.
    pub pathfinding_exhausted: u64,
    /// Nodes waiting in the queue.
    pub queue_depth: usize,
}

impl PropagationStats {
    /// Total relays dropped for any reason.
    pub const fn total_dropped(&self) -> u64 {
        self.dropped_irrelevant
            .saturating_add(self.dropped_distance)
            .saturating_add(self.dropped_diplomatic)
            .saturating_add(self.dropped_sphere)
            .saturating_add(self.dropped_missing_data)
    }

    fn record_drop(&mut self, reason: DropReason, count: u64) {
        let slot = match reason {
            DropReason::Irrelevant => &mut self.dropped_irrelevant,
            DropReason::Distance => &mut self.dropped_distance,
            DropReason::Diplomatic => &mut self.dropped_diplomatic,
            DropReason::Sphere => &mut self.dropped_sphere,
            DropReason::MissingData => &mut self.dropped_missing_data,
        };
        *slot = slot.saturating_add(count);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_delivery(&mut self, delay_days: f64, accuracy: f64) {
        self.deliveries = self.deliveries.saturating_add(1);
        let n = self.deliveries as f64;
        self.average_delivery_days += (delay_days - self.average_delivery_days) / n;
        self.average_delivery_accuracy += (accuracy - self.average_delivery_accuracy) / n;
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_latency(&mut self, micros: u64) {
        self.process_calls = self.process_calls.saturating_add(1);
        let n = self.process_calls as f64;
        self.average_process_micros += (micros as f64 - self.average_process_micros) / n;
        self.peak_process_micros = self.peak_process_micros.max(micros);
    }
}

// ---------------------------------------------------------------------------
// Queue internals
// ---------------------------------------------------------------------------

/// A packet in flight toward a region.
#[derive(Debug, Clone)]
struct PropagationNode {
    packet: Packet,
    region: RegionId,
    /// Owner of `region` when the node was scheduled.
    target_hint: EntityId,
    arrival: NaiveDateTime,
}

/// Heap entry ordered earliest arrival first, then fewest hops, then
/// insertion order.
#[derive(Debug)]
struct Scheduled {
    seq: u64,
    node: PropagationNode,
}

impl Scheduled {
    const fn key(&self) -> (NaiveDateTime, u32, u64) {
        (self.node.arrival, self.node.packet.hop_count, self.seq)
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Per-packet bookkeeping, dropped once nothing of the packet is in flight.
#[derive(Debug, Default)]
struct PacketTrack {
    in_flight: u64,
    reached: BTreeMap<RegionId, NaiveDateTime>,
    delivered: BTreeSet<EntityId>,
}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
    tracks: BTreeMap<PacketId, PacketTrack>,
    active_by_region: BTreeMap<RegionId, Vec<(PacketId, NaiveDateTime)>>,
}

impl QueueState {
    /// Push `node` unless an arrival at least as early is already scheduled.
    fn schedule(&mut self, node: PropagationNode) -> bool {
        let track = self.tracks.entry(node.packet.id).or_default();
        let earlier = track
            .reached
            .get(&node.region)
            .is_some_and(|&existing| existing <= node.arrival);
        if earlier {
            return false;
        }
        track.reached.insert(node.region, node.arrival);
        track.in_flight = track.in_flight.saturating_add(1);
        self.active_by_region
            .entry(node.region)
            .or_default()
            .push((node.packet.id, node.arrival));
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.heap.push(Scheduled { seq, node });
        true
    }

    /// Whether a strictly earlier arrival superseded `node`.
    fn is_stale(&self, node: &PropagationNode) -> bool {
        self.tracks
            .get(&node.packet.id)
            .and_then(|track| track.reached.get(&node.region))
            .is_some_and(|&best| best < node.arrival)
    }

    /// Record a delivery to `nation`; `false` if it already had this packet.
    fn mark_delivered(&mut self, packet: PacketId, nation: EntityId) -> bool {
        self.tracks
            .entry(packet)
            .or_default()
            .delivered
            .insert(nation)
    }

    /// Account for a popped node, forgetting the packet once fully spent.
    fn finish(&mut self, packet: PacketId) {
        let spent = self.tracks.get_mut(&packet).is_some_and(|track| {
            track.in_flight = track.in_flight.saturating_sub(1);
            track.in_flight == 0
        });
        if spent {
            self.tracks.remove(&packet);
        }
    }

    fn forget_if_idle(&mut self, packet: PacketId) {
        if self.tracks.get(&packet).is_some_and(|t| t.in_flight == 0) {
            self.tracks.remove(&packet);
        }
    }
}

/// Counters gathered while locks other than `stats` are held.
#[derive(Debug, Default)]
struct Tally {
    scheduled: u64,
    processed: u64,
    superseded: u64,
    drops: BTreeMap<DropReason, u64>,
    deliveries: Vec<(f64, f64)>,
}

impl Tally {
    fn drop_for(&mut self, reason: DropReason) {
        let slot = self.drops.entry(reason).or_insert(0);
        *slot = slot.saturating_add(1);
    }

    fn apply(self, stats: &mut PropagationStats) {
        stats.nodes_scheduled = stats.nodes_scheduled.saturating_add(self.scheduled);
        stats.nodes_processed = stats.nodes_processed.saturating_add(self.processed);
        stats.nodes_superseded = stats.nodes_superseded.saturating_add(self.superseded);
        for (reason, count) in self.drops {
            stats.record_drop(reason, count);
        }
        for (days, accuracy) in self.deliveries {
            stats.record_delivery(days, accuracy);
        }
    }
}

#[derive(Debug, Default)]
struct Timers {
    since_rebuild: f64,
    since_cleanup: f64,
}

#[allow(clippy::cast_possible_truncation)]
fn days_to_delta(days: f64) -> Option<TimeDelta> {
    if !days.is_finite() || days < 0.0 {
        return None;
    }
    let seconds = (days * SECONDS_PER_DAY).round();
    if seconds > MAX_DELAY_SECONDS {
        return None;
    }
    TimeDelta::try_seconds(seconds as i64)
}

#[allow(clippy::cast_precision_loss)]
fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let seconds = to.signed_duration_since(from).num_seconds().max(0);
    seconds as f64 / SECONDS_PER_DAY
}

// ---------------------------------------------------------------------------
// PropagationEngine
// ---------------------------------------------------------------------------

/// Expands packets across the region graph over simulated time.
pub struct PropagationEngine {
    config: RwLock<PropagationConfig>,
    world: Arc<dyn WorldDataProvider>,
    diplomacy: Arc<dyn DiplomacyProvider>,
    cache: RwLock<RegionCache>,
    state: Mutex<QueueState>,
    stats: Mutex<PropagationStats>,
    intelligence: RwLock<BTreeMap<(EntityId, EntityId), f64>>,
    timers: Mutex<Timers>,
}

impl core::fmt::Debug for PropagationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropagationEngine")
            .field("queue_depth", &self.queue_depth())
            .finish_non_exhaustive()
    }
}

impl PropagationEngine {
    /// Create an engine and load the region cache from `world`.
    ///
    /// A failing provider leaves the cache empty; every propagation then
    /// drops with [`DropReason::MissingData`] until a rebuild succeeds.
    pub fn new(
        config: PropagationConfig,
        world: Arc<dyn WorldDataProvider>,
        diplomacy: Arc<dyn DiplomacyProvider>,
    ) -> Self {
        let engine = Self {
            config: RwLock::new(config),
            world,
            diplomacy,
            cache: RwLock::new(RegionCache::new()),
            state: Mutex::new(QueueState::default()),
            stats: Mutex::new(PropagationStats::default()),
            intelligence: RwLock::new(BTreeMap::new()),
            timers: Mutex::new(Timers::default()),
        };
        engine.rebuild_cache();
        engine
    }

    // -------------------------------------------------------------------
    // Lock helpers
    // -------------------------------------------------------------------

    fn read_cache(&self) -> RwLockReadGuard<'_, RegionCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, PropagationStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_snapshot(&self) -> PropagationConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn intelligence_bonus(&self, receiver: EntityId, relayer: EntityId) -> f64 {
        self.intelligence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(receiver, relayer))
            .copied()
            .unwrap_or(0.0)
    }

    // -------------------------------------------------------------------
    // Propagation
    // -------------------------------------------------------------------

    /// Begin propagating `packet` at `now`.
    ///
    /// Returns the immediate zero-delay delivery to the nation owning the
    /// source region, if there is one. Relays to neighbouring regions are
    /// scheduled on the queue.
    pub fn start_propagation(&self, packet: Packet, now: NaiveDateTime) -> Vec<Delivery> {
        let config = self.config_snapshot();
        let mut tally = Tally::default();
        let mut deliveries = Vec::new();

        let cache = self.read_cache();
        let source = packet.source_region;
        if !cache.contains(source) {
            debug!(packet = %packet.id, region = %source, "Source region unknown, dropping packet");
            tally.drop_for(DropReason::MissingData);
        } else {
            let owner = cache.owner(source);
            let candidates = self.expand(&cache, &packet, source, now, &config, &mut tally);
            let mut state = self.lock_state();
            state
                .tracks
                .entry(packet.id)
                .or_default()
                .reached
                .insert(source, now);
            if let Some(nation) = owner
                && state.mark_delivered(packet.id, nation)
            {
                let delay_days = days_between(packet.occurred_at, now);
                tally.deliveries.push((delay_days, packet.accuracy));
                deliveries.push(Delivery {
                    packet: packet.clone(),
                    nation,
                    region: source,
                    arrival: now,
                    delay_days,
                });
            }
            for node in candidates {
                if state.schedule(node) {
                    tally.scheduled = tally.scheduled.saturating_add(1);
                } else {
                    tally.superseded = tally.superseded.saturating_add(1);
                }
            }
            state.forget_if_idle(packet.id);
        }
        drop(cache);

        let mut stats = self.lock_stats();
        stats.packets_created = stats.packets_created.saturating_add(1);
        tally.apply(&mut stats);
        drop(stats);

        info!(
            packet = %packet.id,
            kind = %packet.kind,
            region = %source,
            severity = packet.severity,
            "Propagation started"
        );
        deliveries
    }

    /// Expand up to one batch of nodes whose arrival is at or before `now`.
    ///
    /// Returns the deliveries made. When nothing is due the call returns
    /// immediately and leaves the statistics untouched.
    pub fn process_queue(&self, now: NaiveDateTime) -> Vec<Delivery> {
        let started = Instant::now();
        let config = self.config_snapshot();

        let due: Vec<PropagationNode> = {
            let mut state = self.lock_state();
            let mut due = Vec::new();
            while due.len() < config.batch_size {
                let is_due = state.heap.peek().is_some_and(|s| s.node.arrival <= now);
                if !is_due {
                    break;
                }
                if let Some(scheduled) = state.heap.pop() {
                    due.push(scheduled.node);
                }
            }
            due
        };
        if due.is_empty() {
            return Vec::new();
        }

        let mut tally = Tally::default();
        let mut deliveries = Vec::new();
        let cache = self.read_cache();

        for node in due {
            tally.processed = tally.processed.saturating_add(1);
            let packet_id = node.packet.id;

            let stale = self.lock_state().is_stale(&node);
            if stale {
                self.lock_state().finish(packet_id);
                continue;
            }

            let nation = cache
                .owner(node.region)
                .or_else(|| (!node.target_hint.is_none()).then_some(node.target_hint));
            // Relays leave from the moment the news arrived, not from the tick
            // that happened to process it.
            let candidates =
                self.expand(&cache, &node.packet, node.region, node.arrival, &config, &mut tally);

            let mut state = self.lock_state();
            if let Some(nation) = nation
                && state.mark_delivered(packet_id, nation)
            {
                let delay_days = days_between(node.packet.occurred_at, node.arrival);
                tally.deliveries.push((delay_days, node.packet.accuracy));
                deliveries.push(Delivery {
                    packet: node.packet.clone(),
                    nation,
                    region: node.region,
                    arrival: node.arrival,
                    delay_days,
                });
            }
            for child in candidates {
                if state.schedule(child) {
                    tally.scheduled = tally.scheduled.saturating_add(1);
                } else {
                    tally.superseded = tally.superseded.saturating_add(1);
                }
            }
            state.finish(packet_id);
        }
        drop(cache);

        let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        let budget_micros = config.time_budget_ms.saturating_mul(1000);
        let mut stats = self.lock_stats();
        tally.apply(&mut stats);
        stats.record_latency(micros);
        if micros > budget_micros {
            stats.budget_overruns = stats.budget_overruns.saturating_add(1);
            warn!(
                elapsed_us = micros,
                budget_us = budget_micros,
                "Propagation queue processing exceeded its time budget"
            );
        }
        deliveries
    }

    /// Compute the relays of `packet` from `region` to each neighbour.
    fn expand(
        &self,
        cache: &RegionCache,
        packet: &Packet,
        region: RegionId,
        now: NaiveDateTime,
        config: &PropagationConfig,
        tally: &mut Tally,
    ) -> Vec<PropagationNode> {
        let neighbors = cache.neighbors(region);
        let mut nodes = Vec::with_capacity(neighbors.len());
        let source_owner = cache.owner(packet.source_region);
        let from_owner = cache.owner(region);

        for &next in neighbors {
            match self.evaluate_relay(cache, packet, region, next, source_owner, from_owner, config) {
                Ok(delay) => {
                    let Some(arrival) = days_to_delta(delay).and_then(|d| now.checked_add_signed(d))
                    else {
                        tally.drop_for(DropReason::MissingData);
                        continue;
                    };
                    nodes.push(PropagationNode {
                        packet: packet.relayed(next, config.accuracy_degradation_rate),
                        region: next,
                        target_hint: cache.owner(next).unwrap_or(EntityId::NONE),
                        arrival,
                    });
                }
                Err(reason) => {
                    debug!(
                        packet = %packet.id,
                        from = %region,
                        to = %next,
                        ?reason,
                        "Relay dropped"
                    );
                    tally.drop_for(reason);
                }
            }
        }
        nodes
    }

    /// Decide whether a relay from `from` to `to` goes ahead, returning its
    /// delay in days. `now` for the relay is the caller's business.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_relay(
        &self,
        cache: &RegionCache,
        packet: &Packet,
        from: RegionId,
        to: RegionId,
        source_owner: Option<EntityId>,
        from_owner: Option<EntityId>,
        config: &PropagationConfig,
    ) -> Result<f64, DropReason> {
        if !cache.contains(to) {
            return Err(DropReason::MissingData);
        }
        if packet.has_visited(to)
            || packet.hop_count >= config.max_hops
            || packet.degraded_accuracy(config.accuracy_degradation_rate) < config.min_accuracy
        {
            return Err(DropReason::Irrelevant);
        }

        let from_source = cache
            .distance(packet.source_region, to)
            .ok_or(DropReason::MissingData)?;
        if from_source > config.max_propagation_distance_km {
            return Err(DropReason::Distance);
        }

        let to_owner = cache.owner(to);

        if let (Some(src), Some(dst)) = (source_owner, to_owner)
            && src != dst
            && self.diplomacy.relation(src, dst).is_hostile()
            && !self.diplomacy.are_neighbors(src, dst)
        {
            return Err(DropReason::Diplomatic);
        }

        if let Some(dst) = to_owner
            && self.is_sphere_blocked(packet, dst, source_owner, config)
        {
            return Err(DropReason::Sphere);
        }

        let distance = cache.distance(from, to).ok_or(DropReason::MissingData)?;
        let speed = config.base_message_speed_km_per_day
            * packet.propagation_speed()
            * config.speed_multiplier;
        if speed <= 0.0 || !speed.is_finite() {
            return Err(DropReason::MissingData);
        }

        let (relation_multiplier, bonus) = match (from_owner, to_owner) {
            (Some(a), Some(b)) if a == b => (SAME_NATION_DELAY_MULTIPLIER, 0.0),
            (Some(a), Some(b)) => (
                self.diplomacy.relation(a, b).delay_multiplier(),
                self.intelligence_bonus(b, a)
                    .clamp(0.0, config.intelligence_bonus_cap),
            ),
            _ => (1.0, 0.0),
        };

        Ok(distance / speed * relation_multiplier * (1.0 - bonus))
    }

    fn is_sphere_blocked(
        &self,
        packet: &Packet,
        destination: EntityId,
        source_owner: Option<EntityId>,
        config: &PropagationConfig,
    ) -> bool {
        let Some(influence) = self.diplomacy.influence(destination) else {
            return false;
        };
        if influence.autonomy >= config.sphere_autonomy_threshold
            || influence.dominant_influencer.is_none()
            || influence.dominant_influencer == destination
        {
            return false;
        }
        let subject = if packet.originator.is_none() {
            source_owner
        } else {
            Some(packet.originator)
        };
        subject.is_some_and(|subject| {
            subject != influence.dominant_influencer
                && self
                    .diplomacy
                    .relation(influence.dominant_influencer, subject)
                    .is_hostile()
        })
    }

    // -------------------------------------------------------------------
    // Relevance
    // -------------------------------------------------------------------

    /// Relevance of `packet` to `nation` by geography.
    ///
    /// Critical if the nation owns the source region, high if it borders
    /// the source owner, medium within half the maximum propagation
    /// distance, low within the maximum, irrelevant beyond.
    pub fn calculate_relevance(&self, packet: &Packet, nation: EntityId) -> Relevance {
        let max_distance = self.config_snapshot().max_propagation_distance_km;
        let cache = self.read_cache();
        let source_owner = cache.owner(packet.source_region);
        if source_owner == Some(nation) {
            return Relevance::Critical;
        }
        if source_owner.is_some_and(|owner| cache.nations_share_border(owner, nation)) {
            return Relevance::High;
        }
        match cache.nation_distance(nation, packet.source_region) {
            Some(d) if d <= max_distance * 0.5 => Relevance::Medium,
            Some(d) if d <= max_distance => Relevance::Low,
            _ => Relevance::Irrelevant,
        }
    }

    // -------------------------------------------------------------------
    // Path queries
    // -------------------------------------------------------------------

    fn path_blocked(&self, cache: &RegionCache, origin: Option<EntityId>, next: RegionId) -> bool {
        match (origin, cache.owner(next)) {
            (Some(a), Some(b)) if a != b => {
                self.diplomacy.relation(a, b).is_hostile() && !self.diplomacy.are_neighbors(a, b)
            }
            _ => false,
        }
    }

    fn record_path_query<T>(&self, result: &Result<T, WorldError>) {
        let mut stats = self.lock_stats();
        stats.pathfinding_calls = stats.pathfinding_calls.saturating_add(1);
        if let Err(WorldError::SearchBudgetExhausted { from, to, explored }) = result {
            stats.pathfinding_exhausted = stats.pathfinding_exhausted.saturating_add(1);
            warn!(%from, %to, explored, "Path search exhausted its node budget");
        }
    }

    /// Fewest-hop path from `from` to `to` that avoids regions of nations
    /// hostile to the owner of `from`.
    pub fn find_path(&self, from: RegionId, to: RegionId) -> Result<Option<Vec<RegionId>>, WorldError> {
        let budget = self.config_snapshot().path_node_budget;
        let cache = self.read_cache();
        let origin = cache.owner(from);
        let result = pathfinding::reachable_path(&cache, from, to, budget, |_, next| {
            self.path_blocked(&cache, origin, next)
        });
        drop(cache);
        self.record_path_query(&result);
        result
    }

    /// Cheapest path from `from` to `to`, costing each step by distance
    /// times the relation multiplier between the two regions' owners.
    pub fn find_cheapest_path(
        &self,
        from: RegionId,
        to: RegionId,
    ) -> Result<Option<(Vec<RegionId>, f64)>, WorldError> {
        let budget = self.config_snapshot().path_node_budget;
        let cache = self.read_cache();
        let origin = cache.owner(from);
        let result = pathfinding::best_first_path(&cache, from, to, budget, |a, b| {
            if self.path_blocked(&cache, origin, b) {
                return None;
            }
            let distance = cache.distance(a, b)?;
            let multiplier = match (cache.owner(a), cache.owner(b)) {
                (Some(x), Some(y)) if x == y => SAME_NATION_DELAY_MULTIPLIER,
                (Some(x), Some(y)) => self.diplomacy.relation(x, y).delay_multiplier(),
                _ => 1.0,
            };
            Some(distance * multiplier)
        });
        drop(cache);
        self.record_path_query(&result);
        result
    }

    // -------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------

    /// Per-tick driver: expand due nodes, then run timed maintenance.
    ///
    /// `elapsed_secs` is host wall-clock time since the previous call and
    /// drives the cache rebuild and cleanup intervals.
    pub fn update(&self, now: NaiveDateTime, elapsed_secs: f64) -> Vec<Delivery> {
        let deliveries = self.process_queue(now);
        let config = self.config_snapshot();

        let (rebuild, cleanup) = {
            let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
            timers.since_rebuild += elapsed_secs.max(0.0);
            timers.since_cleanup += elapsed_secs.max(0.0);
            let rebuild = timers.since_rebuild > config.cache_rebuild_interval_secs;
            let cleanup = timers.since_cleanup > config.cleanup_interval_secs;
            if rebuild {
                timers.since_rebuild = 0.0;
            }
            if cleanup {
                timers.since_cleanup = 0.0;
            }
            (rebuild, cleanup)
        };
        if rebuild {
            self.rebuild_cache();
        }
        if cleanup {
            self.cleanup(now);
        }
        deliveries
    }

    /// Reload the region cache from the world data provider.
    ///
    /// On provider failure the previous cache is kept.
    pub fn rebuild_cache(&self) {
        match RegionCache::load(self.world.as_ref()) {
            Ok(fresh) => {
                let regions = fresh.len();
                *self.cache.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                info!(regions, "Region cache rebuilt");
            }
            Err(err) => {
                warn!(error = %err, "Region cache rebuild failed, keeping previous cache");
            }
        }
    }

    /// Purge per-region bookkeeping whose arrival time has passed.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self, now: NaiveDateTime) -> usize {
        let mut state = self.lock_state();
        let mut removed: usize = 0;
        state.active_by_region.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|(_, arrival)| *arrival > now);
            removed = removed.saturating_add(before.saturating_sub(entries.len()));
            !entries.is_empty()
        });
        drop(state);
        if removed > 0 {
            debug!(removed, "Cleaned up stale propagation entries");
        }
        removed
    }

    // -------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------

    /// Set the intelligence-network bonus `receiver` holds on `relayer`.
    ///
    /// The bonus shortens delays on relays from `relayer`'s regions into
    /// `receiver`'s, and is clamped to `[0, intelligence_bonus_cap]`.
    pub fn set_intelligence_bonus(&self, receiver: EntityId, relayer: EntityId, bonus: f64) {
        let cap = self.config_snapshot().intelligence_bonus_cap;
        let bonus = bonus.clamp(0.0, cap);
        let mut intelligence = self
            .intelligence
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if bonus > 0.0 {
            intelligence.insert((receiver, relayer), bonus);
        } else {
            intelligence.remove(&(receiver, relayer));
        }
    }

    /// Set the global speed multiplier.
    pub fn set_speed_multiplier(&self, multiplier: f64) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .speed_multiplier = multiplier.max(0.0);
    }

    /// Set the per-relay accuracy degradation rate, clamped to `[0, 1]`.
    pub fn set_accuracy_degradation_rate(&self, rate: f64) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .accuracy_degradation_rate = rate.clamp(0.0, 1.0);
    }

    /// Set the maximum distance from the source region.
    pub fn set_max_propagation_distance(&self, km: f64) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .max_propagation_distance_km = km.max(0.0);
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Number of nodes waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.lock_state().heap.len()
    }

    /// Number of in-flight entries heading to `region`.
    pub fn active_in_region(&self, region: RegionId) -> usize {
        self.lock_state()
            .active_by_region
            .get(&region)
            .map_or(0, Vec::len)
    }

    /// Earliest scheduled arrival on the queue.
    pub fn next_arrival(&self) -> Option<NaiveDateTime> {
        self.lock_state().heap.peek().map(|s| s.node.arrival)
    }

    /// Snapshot of the statistics with the current queue depth filled in.
    pub fn statistics(&self) -> PropagationStats {
        let depth = self.queue_depth();
        let mut stats = self.lock_stats().clone();
        stats.queue_depth = depth;
        stats
    }

    /// Zero all statistics.
    pub fn reset_statistics(&self) {
        *self.lock_stats() = PropagationStats::default();
    }

    /// Owner of `region` according to the cache.
    pub fn region_owner(&self, region: RegionId) -> Option<EntityId> {
        self.read_cache().owner(region)
    }

    /// Lowest-numbered region owned by `nation`.
    pub fn capital_of(&self, nation: EntityId) -> Option<RegionId> {
        self.read_cache().capital_of(nation)
    }

    /// Whether the two nations' territories touch.
    pub fn nations_share_border(&self, a: EntityId, b: EntityId) -> bool {
        self.read_cache().nations_share_border(a, b)
    }

    /// Every nation owning at least one region.
    pub fn nations(&self) -> Vec<EntityId> {
        self.read_cache().nations().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diplomacy::{InfluenceState, RelationStatus, StaticDiplomacy};
    use crate::region::{GridWorld, RegionRecord};
    use chrono::NaiveDate;
    use herald_types::InformationType;

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    fn days(n: i64) -> NaiveDateTime {
        epoch()
            .checked_add_signed(TimeDelta::days(n))
            .unwrap_or_default()
    }

    /// A line of regions 1-2-3-4, 100 km apart, owned by 1, 2, 3, 4.
    struct Line;

    impl WorldDataProvider for Line {
        fn snapshot(&self) -> Result<Vec<RegionRecord>, WorldError> {
            Ok((1..=4_u32)
                .map(|i| RegionRecord {
                    id: RegionId(i),
                    x: f64::from(i) * 100.0,
                    y: 0.0,
                    owner: EntityId(i),
                    neighbors: [i.checked_sub(1), i.checked_add(1)]
                        .into_iter()
                        .flatten()
                        .filter(|n| (1..=4).contains(n))
                        .map(RegionId)
                        .collect(),
                })
                .collect())
        }
    }

    struct Broken;

    impl WorldDataProvider for Broken {
        fn snapshot(&self) -> Result<Vec<RegionRecord>, WorldError> {
            Err(WorldError::Provider {
                message: String::from("map not loaded"),
            })
        }
    }

    fn engine_with(diplomacy: StaticDiplomacy) -> PropagationEngine {
        PropagationEngine::new(
            PropagationConfig::default(),
            Arc::new(Line),
            Arc::new(diplomacy),
        )
    }

    fn military(severity: f64) -> Packet {
        Packet::new(
            InformationType::MilitaryAction,
            RegionId(1),
            EntityId(1),
            severity,
            epoch(),
        )
    }

    fn drain(engine: &PropagationEngine, until: NaiveDateTime) -> Vec<Delivery> {
        let mut all = Vec::new();
        for _ in 0..100 {
            let batch = engine.process_queue(until);
            if batch.is_empty() && engine.next_arrival().is_none_or(|a| a > until) {
                break;
            }
            all.extend(batch);
        }
        all
    }

    #[test]
    fn source_owner_receives_at_zero_delay() {
        let engine = engine_with(StaticDiplomacy::new());
        let packet = military(0.95);
        assert_eq!(packet.base_relevance, Relevance::Critical);
        let deliveries = engine.start_propagation(packet, epoch());
        assert_eq!(deliveries.len(), 1);
        let first = deliveries.first().cloned();
        assert!(first.is_some_and(|d| d.nation == EntityId(1)
            && d.arrival == epoch()
            && d.delay_days.abs() < f64::EPSILON));
        assert_eq!(engine.queue_depth(), 1);
    }

    #[test]
    fn wave_reaches_every_nation_once_with_degrading_accuracy() {
        let engine = engine_with(StaticDiplomacy::new());
        let _ = engine.start_propagation(military(0.5), epoch());
        let deliveries = drain(&engine, days(30));
        let nations: Vec<EntityId> = deliveries.iter().map(|d| d.nation).collect();
        assert_eq!(nations, vec![EntityId(2), EntityId(3), EntityId(4)]);

        let mut last_accuracy = 1.0;
        for delivery in &deliveries {
            assert!(delivery.packet.accuracy <= last_accuracy);
            last_accuracy = delivery.packet.accuracy;
            let mut seen = BTreeSet::new();
            assert!(delivery.packet.path.iter().all(|r| seen.insert(*r)));
        }
        assert_eq!(engine.queue_depth(), 0);
        let stats = engine.statistics();
        assert_eq!(stats.deliveries, 4);
        assert_eq!(stats.nodes_processed, 3);
    }

    #[test]
    fn nodes_wait_until_due() {
        let engine = engine_with(StaticDiplomacy::new());
        // Economic news at severity 0.2 moves at 50 * 0.8 * 0.7 = 28 km/day,
        // so the first neutral border 100 km away takes about 3.57 days.
        let packet = Packet::new(
            InformationType::EconomicCrisis,
            RegionId(1),
            EntityId(1),
            0.2,
            epoch(),
        );
        let _ = engine.start_propagation(packet, epoch());
        assert!(engine.process_queue(days(3)).is_empty());
        let deliveries = engine.process_queue(days(4));
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries.first().is_some_and(|d| d.delay_days > 3.0 && d.delay_days < 4.0));
    }

    #[test]
    fn empty_queue_leaves_statistics_unchanged() {
        let engine = engine_with(StaticDiplomacy::new());
        let before = engine.statistics();
        let started = Instant::now();
        let deliveries = engine.process_queue(days(1));
        assert!(deliveries.is_empty());
        assert!(started.elapsed().as_millis() < 5);
        assert_eq!(engine.statistics(), before);
    }

    #[test]
    fn not_yet_due_queue_leaves_statistics_unchanged() {
        let engine = engine_with(StaticDiplomacy::new());
        let _ = engine.start_propagation(military(0.5), epoch());
        let before = engine.statistics();
        assert!(engine.process_queue(epoch()).is_empty());
        assert_eq!(engine.statistics(), before);
    }

    #[test]
    fn hostile_non_neighbors_are_blocked() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_relation(EntityId(1), EntityId(2), RelationStatus::AtWar);
        let engine = engine_with(diplomacy);
        let _ = engine.start_propagation(military(0.9), epoch());
        assert_eq!(engine.queue_depth(), 0);
        let stats = engine.statistics();
        assert_eq!(stats.dropped_diplomatic, 1);
    }

    #[test]
    fn belligerent_diplomatic_neighbors_still_gossip() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_relation(EntityId(1), EntityId(2), RelationStatus::AtWar);
        diplomacy.set_neighbors(EntityId(1), EntityId(2), true);
        let engine = engine_with(diplomacy);
        let _ = engine.start_propagation(military(0.9), epoch());
        assert_eq!(engine.queue_depth(), 1);
    }

    #[test]
    fn sphere_of_hostile_influencer_blocks() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_influence(
            EntityId(2),
            InfluenceState {
                autonomy: 0.1,
                dominant_influencer: EntityId(9),
            },
        );
        diplomacy.set_relation(EntityId(9), EntityId(1), RelationStatus::Hostile);
        let engine = engine_with(diplomacy);
        let _ = engine.start_propagation(military(0.9), epoch());
        assert_eq!(engine.statistics().dropped_sphere, 1);
        assert_eq!(engine.queue_depth(), 0);
    }

    #[test]
    fn hop_cap_and_accuracy_floor_stop_the_wave() {
        let mut config = PropagationConfig::default();
        config.max_hops = 1;
        let engine = PropagationEngine::new(
            config,
            Arc::new(Line),
            Arc::new(StaticDiplomacy::new()),
        );
        let _ = engine.start_propagation(military(0.5), epoch());
        let deliveries = drain(&engine, days(30));
        assert_eq!(deliveries.len(), 1);
        assert!(engine.statistics().dropped_irrelevant >= 1);

        let engine = engine_with(StaticDiplomacy::new());
        engine.set_accuracy_degradation_rate(0.85);
        let _ = engine.start_propagation(military(0.5), epoch());
        let deliveries = drain(&engine, days(30));
        assert!(deliveries.is_empty());
        assert_eq!(engine.statistics().dropped_irrelevant, 1);
    }

    #[test]
    fn distance_limit_drops_far_relays() {
        let engine = engine_with(StaticDiplomacy::new());
        engine.set_max_propagation_distance(150.0);
        let _ = engine.start_propagation(military(0.5), epoch());
        let deliveries = drain(&engine, days(30));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(engine.statistics().dropped_distance, 1);
    }

    #[test]
    fn unknown_source_is_missing_data() {
        let engine = engine_with(StaticDiplomacy::new());
        let packet = Packet::new(
            InformationType::Plague,
            RegionId(77),
            EntityId::NONE,
            0.5,
            epoch(),
        );
        assert!(engine.start_propagation(packet, epoch()).is_empty());
        assert_eq!(engine.statistics().dropped_missing_data, 1);
    }

    #[test]
    fn failing_provider_keeps_engine_usable() {
        let engine = PropagationEngine::new(
            PropagationConfig::default(),
            Arc::new(Broken),
            Arc::new(StaticDiplomacy::new()),
        );
        assert!(engine.start_propagation(military(0.5), epoch()).is_empty());
        engine.rebuild_cache();
        assert_eq!(engine.region_owner(RegionId(1)), None);
    }

    #[test]
    fn intelligence_bonus_speeds_up_relays() {
        let slow = engine_with(StaticDiplomacy::new());
        let fast = engine_with(StaticDiplomacy::new());
        fast.set_intelligence_bonus(EntityId(2), EntityId(1), 5.0);
        let _ = slow.start_propagation(military(0.5), epoch());
        let _ = fast.start_propagation(military(0.5), epoch());
        let slow_arrival = slow.next_arrival();
        let fast_arrival = fast.next_arrival();
        assert!(fast_arrival.is_some() && slow_arrival.is_some());
        assert!(fast_arrival < slow_arrival);
    }

    #[test]
    fn relevance_by_geography() {
        let engine = engine_with(StaticDiplomacy::new());
        let packet = military(0.5);
        assert_eq!(engine.calculate_relevance(&packet, EntityId(1)), Relevance::Critical);
        assert_eq!(engine.calculate_relevance(&packet, EntityId(2)), Relevance::High);
        assert_eq!(engine.calculate_relevance(&packet, EntityId(4)), Relevance::Medium);
        assert_eq!(engine.calculate_relevance(&packet, EntityId(50)), Relevance::Irrelevant);
    }

    #[test]
    fn cleanup_purges_passed_entries() {
        let engine = engine_with(StaticDiplomacy::new());
        let _ = engine.start_propagation(military(0.5), epoch());
        assert_eq!(engine.active_in_region(RegionId(2)), 1);
        assert_eq!(engine.cleanup(epoch()), 0);
        assert_eq!(engine.cleanup(days(30)), 1);
        assert_eq!(engine.active_in_region(RegionId(2)), 0);
    }

    #[test]
    fn update_runs_timed_maintenance() {
        let engine = engine_with(StaticDiplomacy::new());
        let _ = engine.start_propagation(military(0.5), epoch());
        let _ = engine.update(epoch(), 61.0);
        assert_eq!(engine.active_in_region(RegionId(2)), 1);
        assert_eq!(engine.region_owner(RegionId(3)), Some(EntityId(3)));
    }

    #[test]
    fn path_queries_count_and_respect_hostility() {
        let mut diplomacy = StaticDiplomacy::new();
        diplomacy.set_relation(EntityId(1), EntityId(3), RelationStatus::AtWar);
        let engine = engine_with(diplomacy);
        let path = engine.find_path(RegionId(1), RegionId(2));
        assert!(path.is_ok_and(|p| p == Some(vec![RegionId(1), RegionId(2)])));
        assert!(matches!(engine.find_path(RegionId(1), RegionId(4)), Ok(None)));
        let cheapest = engine.find_cheapest_path(RegionId(2), RegionId(4));
        assert!(cheapest.is_ok_and(|p| p.is_some()));
        assert_eq!(engine.statistics().pathfinding_calls, 3);
    }

    #[test]
    fn grid_wave_terminates_and_never_revisits() {
        let engine = PropagationEngine::new(
            PropagationConfig::default(),
            Arc::new(GridWorld::default()),
            Arc::new(StaticDiplomacy::new()),
        );
        let packet = Packet::new(
            InformationType::MilitaryAction,
            RegionId(45),
            EntityId(9),
            0.9,
            epoch(),
        );
        let mut deliveries = engine.start_propagation(packet, epoch());
        deliveries.extend(drain(&engine, days(365)));
        assert!(deliveries.len() > 1);
        let mut nations = BTreeSet::new();
        for delivery in &deliveries {
            assert!(nations.insert(delivery.nation));
            let mut seen = BTreeSet::new();
            assert!(delivery.packet.path.iter().all(|r| seen.insert(*r)));
        }
        assert_eq!(engine.queue_depth(), 0);
    }

    #[test]
    fn statistics_serialize_with_stable_field_names() {
        let engine = engine_with(StaticDiplomacy::new());
        engine.start_propagation(military(0.9), epoch());
        drain(&engine, days(30));
        let json = serde_json::to_value(engine.statistics()).unwrap_or_default();
        assert_eq!(json.get("packets_created").and_then(serde_json::Value::as_u64), Some(1));
        assert!(json
            .get("deliveries")
            .and_then(serde_json::Value::as_u64)
            .is_some_and(|n| n >= 1));
        assert!(json.get("queue_depth").is_some());
    }
}
