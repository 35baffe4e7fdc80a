//! The tick loop.
//!
//! [`run_simulation`] seeds the demo world, spawns its actors, and then
//! advances the game clock once per real-time interval. Each tick may inject
//! a demo event, drives one coordinator tick, and drains the decision log
//! into the structured log. The loop ends when the tick limit is reached or
//! the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use herald_core::{Coordinator, DecisionLog, GameClock, HeraldConfig, MetricsSnapshot};
use herald_world::PropagationStats;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::events::EventInjector;
use crate::spawner::{self, SpawnResult};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// `clock.max_ticks` ticks completed.
    MaxTicksReached,
    /// The shutdown signal fired.
    Shutdown,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Why the loop stopped.
    pub end_reason: EndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Game date after the last tick.
    pub final_date: NaiveDateTime,
    /// Actors created at startup.
    pub spawned: SpawnResult,
    /// Demo events injected.
    pub events_injected: u64,
    /// Decisions drained from the log.
    pub decisions: u64,
    /// Propagation counters at the end of the run.
    pub propagation: PropagationStats,
    /// Director counters at the end of the run.
    pub metrics: MetricsSnapshot,
}

/// Run the demo simulation until the tick limit or `shutdown` resolves.
///
/// # Errors
///
/// Returns [`EngineError`] if the world cannot be seeded, the clock
/// configuration is invalid, or a director lifecycle transition fails.
#[allow(clippy::too_many_lines)]
pub async fn run_simulation<F>(
    config: &HeraldConfig,
    log: &DecisionLog,
    shutdown: F,
) -> Result<RunSummary, EngineError>
where
    F: Future<Output = ()>,
{
    // 1. Seed the world and build the coordinator around it.
    let mut rng = StdRng::seed_from_u64(config.world.seed);
    let world = spawner::seed_world(&config.world, &mut rng)?;
    let region_count = world.region_count();
    let coordinator = Coordinator::new(
        config,
        Arc::new(world.grid),
        Arc::new(world.diplomacy),
        Arc::new(world.realms),
        Arc::new(log.clone()),
    );

    // 2. Spawn actors and bring the director up.
    let spawned = spawner::spawn_actors(
        &coordinator,
        &world.nations,
        &world.wars,
        &world.alliances,
        config.world.characters_per_realm,
        &mut rng,
    )?;
    let director = coordinator.director();
    director.initialize()?;
    director.start()?;

    // 3. Clock and event injector.
    let mut clock = GameClock::new(config.world.start_date, &config.clock)?;
    let mut injector = EventInjector::new(rng, world.nations, region_count);
    let interval = Duration::from_millis(config.clock.tick_interval_ms);
    let elapsed_secs = interval.as_secs_f64();
    let max_ticks = config.clock.max_ticks;
    let event_interval = config.clock.event_interval_ticks;

    info!(
        start = %clock.now(),
        max_ticks,
        tick_interval_ms = config.clock.tick_interval_ms,
        event_interval_ticks = event_interval,
        "Simulation starting"
    );

    let mut events_injected: u64 = 0;
    let mut decisions: u64 = 0;
    tokio::pin!(shutdown);

    // 4. Tick until a stop condition.
    let end_reason = loop {
        if max_ticks > 0 && clock.tick() >= max_ticks {
            info!(tick = clock.tick(), max_ticks, "Tick limit reached");
            break EndReason::MaxTicksReached;
        }

        let now = clock.advance()?;
        if event_interval > 0 && clock.tick().checked_rem(event_interval) == Some(0) {
            let event = injector.next_event(now);
            let kind = event.label();
            let queued = event.apply(&coordinator, now);
            events_injected = events_injected.saturating_add(1);
            debug!(tick = clock.tick(), kind, queued, "Demo event injected");
        }

        let report = coordinator.tick(now, elapsed_secs);
        if report.deliveries > 0 {
            debug!(
                tick = clock.tick(),
                deliveries = report.deliveries,
                routed = report.routed,
                "Propagation tick"
            );
        }
        decisions = decisions.saturating_add(drain_decisions(log));

        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(tick = clock.tick(), "Shutdown signal received");
                break EndReason::Shutdown;
            }
            () = tokio::time::sleep(interval) => {}
        }
    };

    // 5. Wind down and report.
    director.stop()?;
    decisions = decisions.saturating_add(drain_decisions(log));
    for line in director.performance_report() {
        info!("{line}");
    }
    let propagation = coordinator.engine().statistics();
    match serde_json::to_string(&propagation) {
        Ok(json) => info!(stats = %json, "Propagation statistics"),
        Err(e) => warn!(error = %e, "failed to serialize propagation statistics"),
    }
    let metrics = director.metrics();
    director.shutdown()?;

    let summary = RunSummary {
        end_reason,
        total_ticks: clock.tick(),
        final_date: clock.now(),
        spawned,
        events_injected,
        decisions,
        propagation,
        metrics,
    };
    log_simulation_end(&summary);
    Ok(summary)
}

/// Write every buffered decision to the log as JSON. Returns how many.
fn drain_decisions(log: &DecisionLog) -> u64 {
    let mut drained: u64 = 0;
    for record in log.drain() {
        match serde_json::to_string(&record) {
            Ok(json) => info!(
                actor = %record.actor,
                intent = record.intent.label(),
                decision = %json,
                "Decision executed"
            ),
            Err(e) => warn!(error = %e, actor = %record.actor, "failed to serialize decision"),
        }
        drained = drained.saturating_add(1);
    }
    drained
}

/// Log the end-of-run summary.
pub fn log_simulation_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        final_date = %summary.final_date,
        events_injected = summary.events_injected,
        decisions = summary.decisions,
        deliveries = summary.propagation.deliveries,
        "Simulation ended"
    );
}
