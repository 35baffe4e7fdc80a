//! Demo world seeding.
//!
//! Without a host game the engine needs something to talk about. The
//! spawner lays nations over a [`GridWorld`], rolls their treasuries and
//! armies, draws relations between every pair of realms, and then creates
//! a nation, a council, and a few courtiers for each realm. Everything is
//! drawn from one seeded RNG, so a given seed always yields the same world.

use std::collections::BTreeSet;

use herald_agents::{RealmRelation, RealmSnapshot, StaticRealms};
use herald_core::{Coordinator, WorldConfig};
use herald_types::{Archetype, EntityId};
use herald_world::{GridWorld, RelationStatus, StaticDiplomacy, WorldDataProvider};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Name pools
// -----------------------------------------------------------------------

const REALM_NAMES: &[&str] = &[
    "Avaria", "Bohemia", "Castile", "Dalmatia", "Epirus", "Frisia", "Gascony", "Hesse",
    "Istria", "Jutland", "Karelia", "Lorraine", "Moravia", "Navarre", "Ostmark", "Pomerania",
    "Quercy", "Ragusa", "Savoy", "Thuringia", "Umbria", "Valais", "Wessex", "Zeeland",
];

const COURTIER_NAMES: &[&str] = &[
    "Aldric", "Beatrix", "Conrad", "Dagny", "Eudes", "Fulk", "Gisela", "Hugh", "Ingrid",
    "Jocelyn", "Konrad", "Leofric", "Matilda", "Nicolas", "Odo", "Petronilla", "Ranulf",
    "Sibylla", "Tancred", "Urraca", "Waleran", "Yolande",
];

/// Entity ids for courtiers start here, clear of realm ids.
const CHARACTER_ENTITY_BASE: u32 = 10_000;

// Cumulative odds for the relation drawn between two realms.
const WAR_ODDS: f64 = 0.05;
const ALLIANCE_ODDS: f64 = 0.12;
const HOSTILE_ODDS: f64 = 0.30;
const FRIENDLY_ODDS: f64 = 0.50;

// -----------------------------------------------------------------------
// World
// -----------------------------------------------------------------------

/// The generated map, diplomacy, and realm economies.
#[derive(Debug)]
pub struct SeededWorld {
    /// The map.
    pub grid: GridWorld,
    /// Relations and diplomatic neighbours as the propagation engine sees them.
    pub diplomacy: StaticDiplomacy,
    /// Realm economies and opinions as the agents see them.
    pub realms: StaticRealms,
    /// Every realm on the map, in id order.
    pub nations: Vec<EntityId>,
    /// Realm pairs at war.
    pub wars: Vec<(EntityId, EntityId)>,
    /// Allied realm pairs.
    pub alliances: Vec<(EntityId, EntityId)>,
}

impl SeededWorld {
    /// Display name of a realm.
    pub fn realm_name(realm: EntityId) -> &'static str {
        usize::try_from(realm.0.saturating_sub(1))
            .ok()
            .and_then(|index| index.checked_rem(REALM_NAMES.len()))
            .and_then(|index| REALM_NAMES.get(index))
            .copied()
            .unwrap_or("Unnamed")
    }

    /// Number of regions on the map.
    pub const fn region_count(&self) -> u32 {
        self.grid.region_count()
    }
}

fn roll_realm(rng: &mut StdRng, regions: u32) -> RealmSnapshot {
    RealmSnapshot {
        treasury: rng.random_range(500.0..5000.0),
        monthly_income: rng.random_range(50.0..300.0),
        monthly_expenses: rng.random_range(40.0..250.0),
        levy_size: rng.random_range(500.0..3000.0),
        standing_army: rng.random_range(100.0..800.0),
        stability: rng.random_range(0.3..1.0),
        legitimacy: rng.random_range(0.3..1.0),
        region_count: regions,
    }
}

fn roll_relation(rng: &mut StdRng) -> (RelationStatus, RealmRelation) {
    let roll: f64 = rng.random();
    let status = if roll < WAR_ODDS {
        RelationStatus::AtWar
    } else if roll < ALLIANCE_ODDS {
        RelationStatus::Allied
    } else if roll < HOSTILE_ODDS {
        RelationStatus::Hostile
    } else if roll < FRIENDLY_ODDS {
        RelationStatus::Friendly
    } else {
        RelationStatus::Neutral
    };
    let opinion = match status {
        RelationStatus::Allied => rng.random_range(40.0..90.0),
        RelationStatus::Friendly => rng.random_range(10.0..50.0),
        RelationStatus::Neutral => rng.random_range(-20.0..20.0),
        RelationStatus::Hostile => rng.random_range(-70.0..-20.0),
        RelationStatus::AtWar => rng.random_range(-100.0..-60.0),
    };
    let relation = RealmRelation {
        opinion,
        allied: status == RelationStatus::Allied,
        at_war: status == RelationStatus::AtWar,
        trade: matches!(status, RelationStatus::Allied | RelationStatus::Friendly),
    };
    (status, relation)
}

/// Lay out realms on the grid and roll their economies and relations.
pub fn seed_world(config: &WorldConfig, rng: &mut StdRng) -> Result<SeededWorld, EngineError> {
    let grid = GridWorld::new(config.width, config.height, config.regions_per_nation);
    let records = grid.snapshot()?;

    let mut realms = StaticRealms::new();
    let mut diplomacy = StaticDiplomacy::new();
    let nations: Vec<EntityId> = records
        .iter()
        .map(|record| record.owner)
        .filter(|owner| !owner.is_none())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    for record in &records {
        realms.assign_region(record.owner, record.id);
        for neighbor in &record.neighbors {
            let other = grid.owner_of_index(neighbor.0.saturating_sub(1));
            if other != record.owner {
                diplomacy.set_neighbors(record.owner, other, true);
            }
        }
    }
    for nation in &nations {
        let owned = u32::try_from(
            records
                .iter()
                .filter(|record| record.owner == *nation)
                .count(),
        )
        .unwrap_or(u32::MAX);
        realms.set_realm(*nation, roll_realm(rng, owned));
    }

    let mut wars = Vec::new();
    let mut alliances = Vec::new();
    for (i, a) in nations.iter().enumerate() {
        for b in nations.iter().skip(i.saturating_add(1)) {
            let (status, relation) = roll_relation(rng);
            diplomacy.set_relation(*a, *b, status);
            realms.set_mutual_relation(*a, *b, relation);
            match status {
                RelationStatus::AtWar => wars.push((*a, *b)),
                RelationStatus::Allied => alliances.push((*a, *b)),
                _ => {}
            }
        }
    }

    info!(
        regions = grid.region_count(),
        nations = nations.len(),
        wars = wars.len(),
        alliances = alliances.len(),
        "Demo world seeded"
    );
    Ok(SeededWorld {
        grid,
        diplomacy,
        realms,
        nations,
        wars,
        alliances,
    })
}

// -----------------------------------------------------------------------
// Actors
// -----------------------------------------------------------------------

/// How many actors of each kind were created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnResult {
    /// Nation actors.
    pub nations: usize,
    /// Council actors.
    pub councils: usize,
    /// Character actors.
    pub characters: usize,
}

/// Create a nation, its council, and `characters_per_realm` courtiers for
/// every realm, and mirror wars and alliances into the attention filter.
pub fn spawn_actors(
    coordinator: &Coordinator,
    nations: &[EntityId],
    wars: &[(EntityId, EntityId)],
    alliances: &[(EntityId, EntityId)],
    characters_per_realm: u32,
    rng: &mut StdRng,
) -> Result<SpawnResult, EngineError> {
    let mut result = SpawnResult::default();
    let mut next_character = CHARACTER_ENTITY_BASE;

    for realm in nations {
        let name = SeededWorld::realm_name(*realm);
        let archetype = Archetype::ALL
            .choose(rng)
            .copied()
            .unwrap_or_default();
        coordinator.create_ai_for_realm(*realm, name, archetype)?;
        result.nations = result.nations.saturating_add(1);
        result.councils = result.councils.saturating_add(1);

        for _ in 0..characters_per_realm {
            let courtier = COURTIER_NAMES.choose(rng).copied().unwrap_or("Nameless");
            let archetype = Archetype::ALL
                .choose(rng)
                .copied()
                .unwrap_or_default();
            let character = EntityId(next_character);
            next_character = next_character.saturating_add(1);
            coordinator.create_ai_for_character(
                character,
                *realm,
                &format!("{courtier} of {name}"),
                archetype,
            )?;
            result.characters = result.characters.saturating_add(1);
        }
    }

    let director = coordinator.director();
    for (a, b) in wars {
        director.set_rivalry(*a, *b, true);
    }
    for (a, b) in alliances {
        director.set_alliance(*a, *b, true);
    }

    info!(
        nations = result.nations,
        councils = result.councils,
        characters = result.characters,
        "Actors spawned"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_agents::RealmView;
    use herald_types::RegionId;
    use rand::SeedableRng;

    fn small() -> WorldConfig {
        WorldConfig {
            width: 4,
            height: 3,
            regions_per_nation: 2,
            ..WorldConfig::default()
        }
    }

    fn seeded(seed: u64) -> SeededWorld {
        let mut rng = StdRng::seed_from_u64(seed);
        seed_world(&small(), &mut rng).unwrap_or_else(|_| SeededWorld {
            grid: GridWorld::new(0, 0, 1),
            diplomacy: StaticDiplomacy::new(),
            realms: StaticRealms::new(),
            nations: Vec::new(),
            wars: Vec::new(),
            alliances: Vec::new(),
        })
    }

    #[test]
    fn every_nation_gets_a_realm_snapshot() {
        let world = seeded(42);
        assert_eq!(world.nations.len(), 6);
        assert_eq!(world.region_count(), 12);
        for nation in &world.nations {
            let snapshot = world.realms.realm(*nation);
            assert!(snapshot.is_some_and(|s| s.region_count == 2 && s.treasury >= 500.0));
            // Nation n holds regions 2n-1 and 2n.
            assert!(world
                .realms
                .owns_region(*nation, RegionId(nation.0.saturating_mul(2))));
        }
    }

    #[test]
    fn same_seed_same_world() {
        let a = seeded(7);
        let b = seeded(7);
        assert_eq!(a.wars, b.wars);
        assert_eq!(a.alliances, b.alliances);
        for nation in &a.nations {
            assert_eq!(a.realms.realm(*nation), b.realms.realm(*nation));
        }
    }

    #[test]
    fn wars_are_mirrored_in_realm_relations() {
        for seed in 0..20 {
            let world = seeded(seed);
            for (x, y) in &world.wars {
                let relation = world.realms.relation(*x, *y);
                assert!(relation.is_some_and(|r| r.at_war && r.opinion <= -60.0));
            }
        }
    }

    #[test]
    fn realm_names_wrap_around() {
        assert_eq!(SeededWorld::realm_name(EntityId(1)), "Avaria");
        assert_eq!(SeededWorld::realm_name(EntityId(25)), "Avaria");
        assert_eq!(SeededWorld::realm_name(EntityId(24)), "Zeeland");
    }
}
