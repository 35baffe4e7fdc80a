//! The region cache and its data source.
//!
//! Region positions, ownership, and adjacency belong to the host game. The
//! propagation engine reads them through a [`WorldDataProvider`] snapshot
//! and keeps a [`RegionCache`] that it rebuilds on a fixed interval. All
//! maps are `BTreeMap`s so iteration order (and therefore the order in which
//! neighbours are expanded) is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use herald_types::{EntityId, RegionId};

use crate::error::WorldError;

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

/// One region as reported by the world data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    /// Region id.
    pub id: RegionId,
    /// East-west position in kilometres.
    pub x: f64,
    /// North-south position in kilometres.
    pub y: f64,
    /// Owning nation, or [`EntityId::NONE`] for unclaimed land.
    pub owner: EntityId,
    /// Adjacent regions.
    pub neighbors: Vec<RegionId>,
}

/// Read-only source of region data.
pub trait WorldDataProvider: Send + Sync {
    /// Return a full snapshot of every region.
    fn snapshot(&self) -> Result<Vec<RegionRecord>, WorldError>;
}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

/// Rectangular fallback map used when the host has no map loaded.
///
/// Regions are numbered from 1 in row-major order, spaced 100 km apart,
/// and handed out to nations in consecutive blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridWorld {
    width: u32,
    height: u32,
    regions_per_nation: u32,
    spacing_km: f64,
}

impl GridWorld {
    /// Create a grid of `width` by `height` regions.
    pub const fn new(width: u32, height: u32, regions_per_nation: u32) -> Self {
        Self {
            width,
            height,
            regions_per_nation,
            spacing_km: 100.0,
        }
    }

    /// Distance between adjacent region centres.
    pub const fn spacing_km(&self) -> f64 {
        self.spacing_km
    }

    /// Total number of regions.
    pub const fn region_count(&self) -> u32 {
        self.width.saturating_mul(self.height)
    }

    /// Owner of the region at zero-based `index`.
    pub fn owner_of_index(&self, index: u32) -> EntityId {
        index
            .checked_div(self.regions_per_nation)
            .and_then(|block| block.checked_add(1))
            .map_or(EntityId::NONE, EntityId)
    }

    fn record(&self, index: u32) -> Option<RegionRecord> {
        let col = index.checked_rem(self.width)?;
        let row = index.checked_div(self.width)?;
        let id = RegionId(index.checked_add(1)?);

        let mut neighbors = Vec::with_capacity(4);
        if row > 0 {
            neighbors.push(RegionId(id.0.checked_sub(self.width)?));
        }
        if col > 0 {
            neighbors.push(RegionId(id.0.checked_sub(1)?));
        }
        if col.checked_add(1)? < self.width {
            neighbors.push(RegionId(id.0.checked_add(1)?));
        }
        if row.checked_add(1)? < self.height {
            neighbors.push(RegionId(id.0.checked_add(self.width)?));
        }

        Some(RegionRecord {
            id,
            x: f64::from(col) * self.spacing_km,
            y: f64::from(row) * self.spacing_km,
            owner: self.owner_of_index(index),
            neighbors,
        })
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(10, 10, 5)
    }
}

impl WorldDataProvider for GridWorld {
    fn snapshot(&self) -> Result<Vec<RegionRecord>, WorldError> {
        (0..self.region_count())
            .map(|index| {
                self.record(index).ok_or_else(|| WorldError::Provider {
                    message: format!("grid index {index} out of range"),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RegionCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct RegionInfo {
    x: f64,
    y: f64,
    owner: EntityId,
}

/// Cached spatial index of regions: position, owner, and adjacency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCache {
    regions: BTreeMap<RegionId, RegionInfo>,
    adjacency: BTreeMap<RegionId, Vec<RegionId>>,
    by_owner: BTreeMap<EntityId, BTreeSet<RegionId>>,
}

impl RegionCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            by_owner: BTreeMap::new(),
        }
    }

    /// Build a cache from a provider snapshot.
    ///
    /// Neighbour lists are de-duplicated and self-loops removed.
    pub fn from_records(records: Vec<RegionRecord>) -> Result<Self, WorldError> {
        let mut cache = Self::new();
        for record in records {
            if cache.regions.contains_key(&record.id) {
                return Err(WorldError::DuplicateRegion(record.id));
            }
            cache.regions.insert(
                record.id,
                RegionInfo {
                    x: record.x,
                    y: record.y,
                    owner: record.owner,
                },
            );
            if !record.owner.is_none() {
                cache
                    .by_owner
                    .entry(record.owner)
                    .or_default()
                    .insert(record.id);
            }
            let mut neighbors = record.neighbors;
            neighbors.retain(|n| *n != record.id);
            neighbors.sort_unstable();
            neighbors.dedup();
            cache.adjacency.insert(record.id, neighbors);
        }
        Ok(cache)
    }

    /// Build a cache straight from a provider.
    pub fn load(provider: &dyn WorldDataProvider) -> Result<Self, WorldError> {
        Self::from_records(provider.snapshot()?)
    }

    /// Number of cached regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the cache holds no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Whether `region` is known.
    pub fn contains(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }

    /// All region ids in ascending order.
    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.keys().copied()
    }

    /// Owning nation of `region`, if the region is known and owned.
    pub fn owner(&self, region: RegionId) -> Option<EntityId> {
        self.regions
            .get(&region)
            .map(|info| info.owner)
            .filter(|owner| !owner.is_none())
    }

    /// Position of `region` in kilometres.
    pub fn position(&self, region: RegionId) -> Option<(f64, f64)> {
        self.regions.get(&region).map(|info| (info.x, info.y))
    }

    /// Adjacent regions, empty if unknown.
    pub fn neighbors(&self, region: RegionId) -> &[RegionId] {
        self.adjacency.get(&region).map_or(&[], Vec::as_slice)
    }

    /// Straight-line distance between two regions in kilometres.
    pub fn distance(&self, a: RegionId, b: RegionId) -> Option<f64> {
        let (ax, ay) = self.position(a)?;
        let (bx, by) = self.position(b)?;
        Some((ax - bx).hypot(ay - by))
    }

    /// Regions owned by `nation`.
    pub fn regions_of(&self, nation: EntityId) -> impl Iterator<Item = RegionId> + '_ {
        self.by_owner
            .get(&nation)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Lowest-numbered region owned by `nation`.
    pub fn capital_of(&self, nation: EntityId) -> Option<RegionId> {
        self.by_owner
            .get(&nation)
            .and_then(|set| set.first().copied())
    }

    /// Every nation that owns at least one region.
    pub fn nations(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_owner.keys().copied()
    }

    /// Whether any region of `a` is adjacent to a region of `b`.
    pub fn nations_share_border(&self, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        self.regions_of(a).any(|region| {
            self.neighbors(region)
                .iter()
                .any(|n| self.owner(*n) == Some(b))
        })
    }

    /// Shortest distance from any region of `nation` to `region`.
    pub fn nation_distance(&self, nation: EntityId, region: RegionId) -> Option<f64> {
        self.regions_of(nation)
            .filter_map(|own| self.distance(own, region))
            .reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_hundred_regions() {
        let grid = GridWorld::default();
        let records = grid.snapshot().unwrap_or_default();
        assert_eq!(records.len(), 100);
        let first = records.first().cloned();
        assert!(first.is_some());
        let first = first.unwrap_or_else(|| RegionRecord {
            id: RegionId::NONE,
            x: 0.0,
            y: 0.0,
            owner: EntityId::NONE,
            neighbors: Vec::new(),
        });
        assert_eq!(first.id, RegionId(1));
        assert_eq!(first.owner, EntityId(1));
        assert_eq!(first.neighbors, vec![RegionId(2), RegionId(11)]);
    }

    #[test]
    fn grid_ownership_blocks() {
        let grid = GridWorld::default();
        assert_eq!(grid.owner_of_index(0), EntityId(1));
        assert_eq!(grid.owner_of_index(4), EntityId(1));
        assert_eq!(grid.owner_of_index(5), EntityId(2));
        assert_eq!(grid.owner_of_index(99), EntityId(20));
    }

    #[test]
    fn cache_answers_spatial_queries() {
        let cache = RegionCache::load(&GridWorld::default()).unwrap_or_default();
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.owner(RegionId(6)), Some(EntityId(2)));
        assert_eq!(cache.neighbors(RegionId(12)).len(), 4);
        assert!(cache.neighbors(RegionId(999)).is_empty());
        let d = cache.distance(RegionId(1), RegionId(12)).unwrap_or_default();
        assert!((d - 100.0_f64.hypot(100.0)).abs() < 1e-9);
        assert_eq!(cache.capital_of(EntityId(2)), Some(RegionId(6)));
        assert!(cache.nations_share_border(EntityId(1), EntityId(2)));
        assert!(!cache.nations_share_border(EntityId(1), EntityId(20)));
        assert_eq!(cache.regions_of(EntityId(3)).count(), 5);
    }

    #[test]
    fn duplicate_region_rejected() {
        let record = RegionRecord {
            id: RegionId(1),
            x: 0.0,
            y: 0.0,
            owner: EntityId(1),
            neighbors: vec![RegionId(1), RegionId(2), RegionId(2)],
        };
        let result = RegionCache::from_records(vec![record.clone(), record]);
        assert!(matches!(result, Err(WorldError::DuplicateRegion(RegionId(1)))));
    }

    #[test]
    fn neighbor_lists_are_cleaned() {
        let record = RegionRecord {
            id: RegionId(1),
            x: 0.0,
            y: 0.0,
            owner: EntityId::NONE,
            neighbors: vec![RegionId(3), RegionId(1), RegionId(2), RegionId(3)],
        };
        let cache = RegionCache::from_records(vec![record]).unwrap_or_default();
        assert_eq!(cache.neighbors(RegionId(1)), &[RegionId(2), RegionId(3)]);
        assert_eq!(cache.owner(RegionId(1)), None);
    }
}
