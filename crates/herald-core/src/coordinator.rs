//! Glue between propagation and the director.
//!
//! Gameplay systems talk to the [`Coordinator`]: they report events, and
//! once per tick it expands the propagation queue, routes every delivery to
//! the actors attached to the receiving realm, and dispatches a director
//! frame.

use std::sync::Arc;

use chrono::NaiveDateTime;
use herald_agents::RealmView;
use herald_types::{ActorId, Archetype, EntityId, Packet, RegionId, Relevance};
use herald_world::factory::{
    diplomatic_event, economic_event, military_event, packet_from_report, succession_crisis,
};
use herald_world::{
    Delivery, DiplomacyProvider, EventReport, PropagationEngine, WorldDataProvider,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::HeraldConfig;
use crate::director::{Director, FrameReport};
use crate::error::DirectorError;
use crate::mailbox::Priority;
use crate::sink::DecisionSink;

/// Severity of a war declaration packet.
const WAR_DECLARATION_SEVERITY: f64 = 0.9;

/// What one coordinator tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Deliveries produced by the propagation queue.
    pub deliveries: usize,
    /// Messages queued for actors from those deliveries.
    pub routed: usize,
    /// The director frame, if the director is running.
    pub frame: Option<FrameReport>,
}

/// Owns the propagation engine and the director.
#[derive(Debug)]
pub struct Coordinator {
    engine: PropagationEngine,
    director: Director,
}

impl Coordinator {
    /// Build both halves from the loaded configuration.
    pub fn new(
        config: &HeraldConfig,
        world: Arc<dyn WorldDataProvider>,
        diplomacy: Arc<dyn DiplomacyProvider>,
        realms: Arc<dyn RealmView>,
        sink: Arc<dyn DecisionSink>,
    ) -> Self {
        let engine = PropagationEngine::new(config.propagation.clone(), world, diplomacy);
        let director = Director::new(
            config.director.clone(),
            config.attention.clone(),
            config.agents.clone(),
            realms,
            sink,
        );
        Self { engine, director }
    }

    /// The propagation engine.
    pub const fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    /// The director.
    pub const fn director(&self) -> &Director {
        &self.director
    }

    /// Create the nation actor and the council of `realm`.
    pub fn create_ai_for_realm(
        &self,
        realm: EntityId,
        name: &str,
        archetype: Archetype,
    ) -> Result<(ActorId, ActorId), DirectorError> {
        let nation = self.director.create_nation(realm, name, archetype)?;
        let council = self.director.create_council(realm, name, archetype)?;
        Ok((nation, council))
    }

    /// Create a character actor serving `realm`.
    pub fn create_ai_for_character(
        &self,
        character: EntityId,
        realm: EntityId,
        name: &str,
        archetype: Archetype,
    ) -> Result<ActorId, DirectorError> {
        self.director
            .create_character(character, realm, name, archetype)
    }

    /// Start propagating `packet` and route the immediate delivery to the
    /// source region's owner. Returns the number of messages queued.
    pub fn propagate(&self, packet: Packet, now: NaiveDateTime) -> usize {
        let deliveries = self.engine.start_propagation(packet, now);
        self.route(deliveries, now)
    }

    /// Normalize a gameplay report and propagate it.
    pub fn report_event(&self, report: EventReport, now: NaiveDateTime) -> usize {
        self.propagate(packet_from_report(report), now)
    }

    fn capital_or_none(&self, realm: EntityId) -> RegionId {
        self.engine.capital_of(realm).unwrap_or_else(|| {
            debug!(realm = %realm, "Realm has no capital, event will not propagate");
            RegionId::NONE
        })
    }

    /// A declaration of war, spreading from the aggressor's capital.
    pub fn notify_war_declaration(
        &self,
        aggressor: EntityId,
        defender: EntityId,
        now: NaiveDateTime,
    ) -> usize {
        let region = self.capital_or_none(aggressor);
        info!(aggressor = %aggressor, defender = %defender, "War declared");
        let packet = military_event(region, aggressor, defender, WAR_DECLARATION_SEVERITY, now);
        self.propagate(packet, now)
    }

    /// A change in relations, spreading from the first realm's capital.
    pub fn notify_diplomatic_change(
        &self,
        a: EntityId,
        b: EntityId,
        change: &str,
        now: NaiveDateTime,
    ) -> usize {
        let region = self.capital_or_none(a);
        self.propagate(diplomatic_event(region, a, b, change, now), now)
    }

    /// An economic shock of the given impact in `region`, attributed to
    /// the region's owner.
    pub fn notify_economic_event(
        &self,
        region: RegionId,
        severity: f64,
        now: NaiveDateTime,
    ) -> usize {
        let nation = self.engine.region_owner(region).unwrap_or(EntityId::NONE);
        self.propagate(economic_event(region, nation, severity, now), now)
    }

    /// A disputed succession in `realm`, spreading from its capital.
    pub fn notify_succession_crisis(
        &self,
        realm: EntityId,
        claimants: u32,
        now: NaiveDateTime,
    ) -> usize {
        let region = self.capital_or_none(realm);
        self.propagate(succession_crisis(region, realm, claimants, now), now)
    }

    /// Deliver `packet` to every actor whose filter passes, ignoring
    /// geography.
    pub fn broadcast(&self, packet: &Packet, now: NaiveDateTime) -> usize {
        self.director.broadcast(packet, now)
    }

    /// Per-tick driver: expand the propagation queue, route what arrived,
    /// then dispatch one director frame.
    pub fn tick(&self, now: NaiveDateTime, elapsed_secs: f64) -> TickReport {
        let deliveries = self.engine.update(now, elapsed_secs);
        let arrived = deliveries.len();
        let routed = self.route(deliveries, now);
        TickReport {
            deliveries: arrived,
            routed,
            frame: self.director.update(now),
        }
    }

    /// Queue each delivery for every actor attached to the receiving realm
    /// whose filter passes. The packet is first raised to the geographic
    /// relevance it has for that realm.
    ///
    /// Critical news reaching the source region's owner at hop zero goes to
    /// that realm's nation actor unfiltered, in the critical tier.
    fn route(&self, deliveries: Vec<Delivery>, now: NaiveDateTime) -> usize {
        let mut routed = 0_usize;
        for delivery in deliveries {
            let mut packet = delivery.packet;
            let geographic = self.engine.calculate_relevance(&packet, delivery.nation);
            packet.base_relevance = packet.base_relevance.max(geographic);

            let unfiltered = self
                .is_critical_at_source(&packet, delivery.nation)
                .then(|| self.director.nation_for_realm(delivery.nation))
                .flatten();

            for actor in self.director.actors_for_realm(delivery.nation) {
                if Some(actor) == unfiltered {
                    if self
                        .director
                        .deliver(packet.clone(), actor, Priority::Critical, now)
                    {
                        routed = routed.saturating_add(1);
                    }
                    continue;
                }
                if self
                    .director
                    .deliver_filtered(&packet, actor, now)
                    .should_receive
                {
                    routed = routed.saturating_add(1);
                }
            }
        }
        routed
    }

    fn is_critical_at_source(&self, packet: &Packet, nation: EntityId) -> bool {
        packet.hop_count == 0
            && packet.base_relevance == Relevance::Critical
            && self.engine.region_owner(packet.source_region) == Some(nation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DecisionLog;
    use chrono::NaiveDate;
    use herald_agents::{RealmSnapshot, StaticRealms};
    use herald_types::InformationType;
    use herald_world::{GridWorld, StaticDiplomacy};

    fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// A 4x1 grid with one region per nation: realms 1-2-3-4 in a row.
    fn coordinator() -> Coordinator {
        let mut realms = StaticRealms::new();
        for realm in 1..=4 {
            realms.set_realm(EntityId(realm), RealmSnapshot::default());
        }
        Coordinator::new(
            &HeraldConfig::default(),
            Arc::new(GridWorld::new(4, 1, 1)),
            Arc::new(StaticDiplomacy::new()),
            Arc::new(realms),
            Arc::new(DecisionLog::new(100)),
        )
    }

    #[test]
    fn realm_ai_gets_nation_and_council() {
        let coordinator = coordinator();
        let created = coordinator.create_ai_for_realm(EntityId(1), "Castile", Archetype::Diplomat);
        assert!(created.is_ok());
        let (nation, council) = created.unwrap_or_default();
        assert_eq!(
            coordinator.director().actors_for_realm(EntityId(1)),
            vec![nation, council]
        );
        assert_eq!(coordinator.director().nation_for_realm(EntityId(1)), Some(nation));
    }

    #[test]
    fn source_owner_gets_critical_mail_at_once() {
        let coordinator = coordinator();
        let created = coordinator.create_ai_for_realm(EntityId(1), "Castile", Archetype::Conqueror);
        let (nation, _) = created.unwrap_or_default();
        let routed = coordinator.notify_war_declaration(EntityId(1), EntityId(2), epoch());
        assert!(routed >= 1);
        let queued = coordinator.director().queued_by_priority();
        assert!(queued.get(Priority::Critical) >= 1);
        assert!(coordinator.director().queued_for(nation).is_some_and(|n| n >= 1));
    }

    #[test]
    fn critical_news_skips_the_filter_at_the_source() {
        let coordinator = coordinator();
        let created = coordinator.create_ai_for_realm(EntityId(1), "Castile", Archetype::Zealot);
        let (nation, _) = created.unwrap_or_default();
        let crash = Packet::new(
            InformationType::EconomicCrisis,
            RegionId(1),
            EntityId(1),
            0.95,
            epoch(),
        );
        assert!(!coordinator.director().filter_for(&crash, nation).should_receive);

        assert!(coordinator.propagate(crash, epoch()) >= 1);
        assert!(coordinator.director().queued_by_priority().critical >= 1);
        assert_eq!(coordinator.director().queued_for(nation), Some(1));
    }

    #[test]
    fn relayed_news_is_still_filtered() {
        let coordinator = coordinator();
        let created = coordinator.create_ai_for_realm(EntityId(2), "Aragon", Archetype::Zealot);
        let (neighbour, _) = created.unwrap_or_default();
        let crash = Packet::new(
            InformationType::EconomicCrisis,
            RegionId(1),
            EntityId(1),
            0.95,
            epoch(),
        );
        coordinator.propagate(crash, epoch());
        let mut now = epoch();
        for _ in 0..40 {
            now += chrono::TimeDelta::hours(6);
            coordinator.tick(now, 0.0);
        }
        assert!(coordinator.engine().statistics().deliveries >= 2);
        assert_eq!(coordinator.director().queued_for(neighbour), Some(0));
    }

    #[test]
    fn realm_without_capital_does_not_propagate() {
        let coordinator = coordinator();
        assert_eq!(
            coordinator.notify_war_declaration(EntityId(42), EntityId(1), epoch()),
            0
        );
        assert_eq!(coordinator.engine().queue_depth(), 0);
    }

    #[test]
    fn tick_routes_relayed_news_to_neighbours() {
        let coordinator = coordinator();
        assert!(coordinator.director().initialize().is_ok());
        assert!(coordinator.director().start().is_ok());
        let created = coordinator.create_ai_for_realm(EntityId(2), "Aragon", Archetype::Conqueror);
        assert!(created.is_ok());

        coordinator.notify_war_declaration(EntityId(1), EntityId(3), epoch());
        let mut routed = 0;
        let mut now = epoch();
        for _ in 0..40 {
            now += chrono::TimeDelta::hours(6);
            let report = coordinator.tick(now, 0.0);
            routed += report.routed;
            assert!(report.frame.is_some());
        }
        assert!(routed >= 1);
        assert!(coordinator.director().metrics().messages_processed >= 1);
    }

    #[test]
    fn tick_report_serializes_for_logging() {
        let coordinator = coordinator();
        let report = coordinator.tick(epoch(), 0.0);
        let json = serde_json::to_value(report).unwrap_or_default();
        assert_eq!(json.get("deliveries").and_then(serde_json::Value::as_u64), Some(0));
        assert!(json.get("frame").is_some_and(serde_json::Value::is_null));
    }
}
