//! Explicit path queries over the region graph.
//!
//! Two searches are offered:
//!
//! - [`reachable_path`]: unweighted breadth-first search that honours a
//!   blocking predicate.
//! - [`best_first_path`]: cost-weighted best-first (A*) search whose
//!   heuristic is the straight-line distance to the goal.
//!
//! Both stop after expanding a fixed number of regions so a query on a
//! huge or adversarial map always terminates.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use herald_types::RegionId;

use crate::error::WorldError;
use crate::region::RegionCache;

fn check_endpoints(cache: &RegionCache, from: RegionId, to: RegionId) -> Result<(), WorldError> {
    if !cache.contains(from) {
        return Err(WorldError::RegionNotFound(from));
    }
    if !cache.contains(to) {
        return Err(WorldError::RegionNotFound(to));
    }
    Ok(())
}

fn reconstruct(prev: &BTreeMap<RegionId, RegionId>, from: RegionId, to: RegionId) -> Vec<RegionId> {
    let mut path = VecDeque::new();
    let mut current = to;
    path.push_front(current);
    while let Some(&predecessor) = prev.get(&current) {
        path.push_front(predecessor);
        current = predecessor;
        if current == from {
            break;
        }
    }
    path.into_iter().collect()
}

/// Breadth-first search from `from` to `to`, skipping edges for which
/// `is_blocked(current, next)` returns `true`.
///
/// Returns `Ok(None)` when the goal is unreachable and
/// [`WorldError::SearchBudgetExhausted`] when `budget` regions were expanded
/// without a verdict.
pub fn reachable_path<F>(
    cache: &RegionCache,
    from: RegionId,
    to: RegionId,
    budget: usize,
    is_blocked: F,
) -> Result<Option<Vec<RegionId>>, WorldError>
where
    F: Fn(RegionId, RegionId) -> bool,
{
    check_endpoints(cache, from, to)?;
    if from == to {
        return Ok(Some(vec![from]));
    }

    let mut visited = BTreeSet::new();
    let mut prev: BTreeMap<RegionId, RegionId> = BTreeMap::new();
    let mut queue = VecDeque::new();
    let mut explored: usize = 0;
    visited.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        if explored >= budget {
            return Err(WorldError::SearchBudgetExhausted { from, to, explored });
        }
        explored = explored.saturating_add(1);

        for &next in cache.neighbors(current) {
            if !cache.contains(next) || is_blocked(current, next) {
                continue;
            }
            if visited.insert(next) {
                prev.insert(next, current);
                if next == to {
                    return Ok(Some(reconstruct(&prev, from, to)));
                }
                queue.push_back(next);
            }
        }
    }

    Ok(None)
}

/// Frontier entry ordered so the smallest estimate pops first from a
/// max-heap. Ties go to the lower region id for determinism.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    estimate: f64,
    cost: f64,
    region: RegionId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.region.cmp(&self.region))
    }
}

/// Best-first search from `from` to `to` minimizing the summed edge cost.
///
/// `edge_cost(current, next)` returns `None` for a blocked edge. Costs
/// should be at least the straight-line distance between the two regions
/// for the result to be optimal; smaller costs still terminate.
///
/// Returns the path and its total cost.
pub fn best_first_path<F>(
    cache: &RegionCache,
    from: RegionId,
    to: RegionId,
    budget: usize,
    edge_cost: F,
) -> Result<Option<(Vec<RegionId>, f64)>, WorldError>
where
    F: Fn(RegionId, RegionId) -> Option<f64>,
{
    check_endpoints(cache, from, to)?;
    if from == to {
        return Ok(Some((vec![from], 0.0)));
    }

    let heuristic = |region: RegionId| cache.distance(region, to).unwrap_or(0.0);

    let mut best: BTreeMap<RegionId, f64> = BTreeMap::new();
    let mut prev: BTreeMap<RegionId, RegionId> = BTreeMap::new();
    let mut closed = BTreeSet::new();
    let mut open = BinaryHeap::new();
    let mut explored: usize = 0;

    best.insert(from, 0.0);
    open.push(Frontier {
        estimate: heuristic(from),
        cost: 0.0,
        region: from,
    });

    while let Some(Frontier { cost, region, .. }) = open.pop() {
        if region == to {
            return Ok(Some((reconstruct(&prev, from, to), cost)));
        }
        if !closed.insert(region) {
            continue;
        }
        if explored >= budget {
            return Err(WorldError::SearchBudgetExhausted { from, to, explored });
        }
        explored = explored.saturating_add(1);

        for &next in cache.neighbors(region) {
            if closed.contains(&next) || !cache.contains(next) {
                continue;
            }
            let Some(step) = edge_cost(region, next) else {
                continue;
            };
            let candidate = cost + step.max(0.0);
            let is_better = best
                .get(&next)
                .is_none_or(|&existing| candidate < existing);
            if is_better {
                best.insert(next, candidate);
                prev.insert(next, region);
                open.push(Frontier {
                    estimate: candidate + heuristic(next),
                    cost: candidate,
                    region: next,
                });
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{GridWorld, WorldDataProvider};

    fn grid() -> RegionCache {
        let records = GridWorld::new(5, 5, 5).snapshot().unwrap_or_default();
        RegionCache::from_records(records).unwrap_or_default()
    }

    #[test]
    fn bfs_finds_shortest_hop_path() {
        let cache = grid();
        let path = reachable_path(&cache, RegionId(1), RegionId(3), 100, |_, _| false);
        assert!(path.is_ok());
        let path = path.ok().flatten().unwrap_or_default();
        assert_eq!(path, vec![RegionId(1), RegionId(2), RegionId(3)]);
    }

    #[test]
    fn bfs_respects_blocking() {
        let cache = grid();
        // Wall off column 3 (regions 3, 8, 13, 18, 23).
        let wall = |_: RegionId, next: RegionId| next.0 % 5 == 3;
        let path = reachable_path(&cache, RegionId(1), RegionId(5), 100, wall);
        assert!(matches!(path, Ok(None)));
    }

    #[test]
    fn bfs_budget_terminates() {
        let cache = grid();
        let path = reachable_path(&cache, RegionId(1), RegionId(25), 3, |_, _| false);
        assert!(matches!(
            path,
            Err(WorldError::SearchBudgetExhausted { explored: 3, .. })
        ));
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let cache = grid();
        let path = reachable_path(&cache, RegionId(1), RegionId(99), 100, |_, _| false);
        assert!(matches!(path, Err(WorldError::RegionNotFound(RegionId(99)))));
    }

    #[test]
    fn best_first_avoids_expensive_edges() {
        let cache = grid();
        // Entering region 2 is very expensive, so go around via row 2.
        let cost = |a: RegionId, b: RegionId| {
            let d = cache.distance(a, b)?;
            Some(if b == RegionId(2) { d * 50.0 } else { d })
        };
        let result = best_first_path(&cache, RegionId(1), RegionId(3), 100, cost);
        assert!(result.is_ok());
        let (path, total) = result.ok().flatten().unwrap_or_default();
        assert!(!path.contains(&RegionId(2)));
        assert_eq!(path.first(), Some(&RegionId(1)));
        assert_eq!(path.last(), Some(&RegionId(3)));
        assert!((total - 400.0).abs() < 1e-9);
    }

    #[test]
    fn best_first_blocked_edges_make_goal_unreachable() {
        let cache = grid();
        let cost = |_: RegionId, b: RegionId| if b == RegionId(25) { None } else { Some(100.0) };
        let result = best_first_path(&cache, RegionId(1), RegionId(25), 1000, cost);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn best_first_budget_terminates() {
        let cache = grid();
        let cost = |a: RegionId, b: RegionId| cache.distance(a, b);
        let result = best_first_path(&cache, RegionId(1), RegionId(25), 2, cost);
        assert!(matches!(result, Err(WorldError::SearchBudgetExhausted { .. })));
    }
}
