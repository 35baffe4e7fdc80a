//! Seeded demo event injection.
//!
//! Stands in for the host game's gameplay systems: every few ticks the
//! injector rolls one event, either a loose [`EventReport`] of the kind a
//! gameplay system would file or one of the coordinator's typed
//! notifications.

use chrono::NaiveDateTime;
use herald_core::Coordinator;
use herald_types::{EntityId, RegionId};
use herald_world::factory::{KEY_CASUALTIES, KEY_ECONOMIC_IMPACT};
use herald_world::EventReport;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

/// Loose kinds the injector files as reports; each maps onto a different
/// information type once classified.
const REPORT_KINDS: &[&str] = &[
    "BattleEvent",
    "RebelUprising",
    "PlagueOutbreak",
    "FloodDisaster",
    "TradeEmbargo",
    "FamineEvent",
    "TechDiscovery",
    "HeresySpreads",
    "CulturalFestival",
    "TreatySigned",
];

const DIPLOMATIC_CHANGES: &[&str] = &["alliance_broken", "insult", "royal_marriage", "embargo"];

/// One injected event.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedEvent {
    /// A gameplay report to classify and propagate.
    Report(EventReport),
    /// A declaration of war.
    War {
        /// Realm declaring.
        aggressor: EntityId,
        /// Realm attacked.
        defender: EntityId,
    },
    /// A change in relations between two realms.
    Diplomatic {
        /// First realm.
        a: EntityId,
        /// Second realm.
        b: EntityId,
        /// What changed.
        change: &'static str,
    },
    /// An economic shock in one region.
    Economic {
        /// Where it hit.
        region: RegionId,
        /// Impact in `[0, 1]`.
        severity: f64,
    },
    /// A disputed succession.
    Succession {
        /// Realm in crisis.
        realm: EntityId,
        /// Number of claimants.
        claimants: u32,
    },
}

impl InjectedEvent {
    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Report(_) => "report",
            Self::War { .. } => "war",
            Self::Diplomatic { .. } => "diplomatic",
            Self::Economic { .. } => "economic",
            Self::Succession { .. } => "succession",
        }
    }

    /// Hand the event to the coordinator. Returns messages queued at once.
    pub fn apply(self, coordinator: &Coordinator, now: NaiveDateTime) -> usize {
        match self {
            Self::Report(report) => coordinator.report_event(report, now),
            Self::War {
                aggressor,
                defender,
            } => {
                let queued = coordinator.notify_war_declaration(aggressor, defender, now);
                coordinator.director().set_rivalry(aggressor, defender, true);
                queued
            }
            Self::Diplomatic { a, b, change } => {
                coordinator.notify_diplomatic_change(a, b, change, now)
            }
            Self::Economic { region, severity } => {
                coordinator.notify_economic_event(region, severity, now)
            }
            Self::Succession { realm, claimants } => {
                coordinator.notify_succession_crisis(realm, claimants, now)
            }
        }
    }
}

/// Rolls demo events from a seeded RNG.
#[derive(Debug)]
pub struct EventInjector {
    rng: StdRng,
    nations: Vec<EntityId>,
    region_count: u32,
}

impl EventInjector {
    /// An injector over `nations` and regions `1..=region_count`.
    pub const fn new(rng: StdRng, nations: Vec<EntityId>, region_count: u32) -> Self {
        Self {
            rng,
            nations,
            region_count,
        }
    }

    fn region(&mut self) -> RegionId {
        RegionId(self.rng.random_range(1..=self.region_count.max(1)))
    }

    fn nation(&mut self) -> EntityId {
        self.nations
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(EntityId::NONE)
    }

    fn other_nation(&mut self, not: EntityId) -> EntityId {
        let others: Vec<EntityId> = self
            .nations
            .iter()
            .copied()
            .filter(|nation| *nation != not)
            .collect();
        others
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(EntityId::NONE)
    }

    /// Roll the next event dated `now`.
    pub fn next_event(&mut self, now: NaiveDateTime) -> InjectedEvent {
        let event = match self.rng.random_range(0_u8..10) {
            0 => {
                let aggressor = self.nation();
                let defender = self.other_nation(aggressor);
                InjectedEvent::War {
                    aggressor,
                    defender,
                }
            }
            1 => {
                let a = self.nation();
                let b = self.other_nation(a);
                let change = DIPLOMATIC_CHANGES
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or("insult");
                InjectedEvent::Diplomatic { a, b, change }
            }
            2 => InjectedEvent::Economic {
                region: self.region(),
                severity: self.rng.random_range(0.2..1.0),
            },
            3 => InjectedEvent::Succession {
                realm: self.nation(),
                claimants: self.rng.random_range(2..=4),
            },
            _ => InjectedEvent::Report(self.report(now)),
        };
        debug!(kind = event.label(), "Injecting demo event");
        event
    }

    fn report(&mut self, now: NaiveDateTime) -> EventReport {
        let kind = REPORT_KINDS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("TreatySigned");
        let region = self.region();
        let mut report =
            EventReport::new(kind, region, self.nation(), now).with_description(kind);
        if kind.starts_with("Battle") {
            report = report.with_numeric(KEY_CASUALTIES, self.rng.random_range(100.0..12_000.0));
        } else if kind.starts_with("Famine") || kind.starts_with("Trade") {
            report = report.with_numeric(KEY_ECONOMIC_IMPACT, self.rng.random_range(0.1..1.0));
        }
        report
    }
}
