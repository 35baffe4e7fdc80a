//! Opinion tracking between characters and realms.
//!
//! Opinions live in `[-100, 100]`. Every background pass drifts them toward
//! neutral: positive opinions fade by 0.5, negative ones recover by 0.3,
//! so grudges outlast favours.

use std::collections::BTreeMap;

use herald_types::EntityId;

/// Lowest possible opinion.
pub const OPINION_MIN: f64 = -100.0;

/// Highest possible opinion.
pub const OPINION_MAX: f64 = 100.0;

/// Opinions below this mark a rival.
pub const RIVAL_THRESHOLD: f64 = -50.0;

/// Opinions above this mark a friend.
pub const FRIEND_THRESHOLD: f64 = 70.0;

const POSITIVE_DECAY: f64 = 0.5;
const NEGATIVE_RECOVERY: f64 = 0.3;

/// Per-agent opinion map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpinionGraph {
    opinions: BTreeMap<EntityId, f64>,
}

impl OpinionGraph {
    /// An empty graph.
    pub const fn new() -> Self {
        Self {
            opinions: BTreeMap::new(),
        }
    }

    /// Opinion of `other`, neutral when unknown.
    pub fn get(&self, other: EntityId) -> f64 {
        self.opinions.get(&other).copied().unwrap_or(0.0)
    }

    /// Shift the opinion of `other` by `delta`, clamped. Returns the new value.
    pub fn adjust(&mut self, other: EntityId, delta: f64) -> f64 {
        let value = (self.get(other) + delta).clamp(OPINION_MIN, OPINION_MAX);
        self.opinions.insert(other, value);
        value
    }

    /// Set the opinion of `other` outright, clamped.
    pub fn set(&mut self, other: EntityId, value: f64) {
        self.opinions
            .insert(other, value.clamp(OPINION_MIN, OPINION_MAX));
    }

    /// Drift every opinion toward neutral. Opinions that reach zero are
    /// forgotten.
    pub fn decay(&mut self) {
        for value in self.opinions.values_mut() {
            if *value > 0.0 {
                *value = (*value - POSITIVE_DECAY).max(0.0);
            } else if *value < 0.0 {
                *value = (*value + NEGATIVE_RECOVERY).min(0.0);
            }
        }
        self.opinions.retain(|_, value| *value != 0.0);
    }

    /// Mean opinion across everyone known, or zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> f64 {
        if self.opinions.is_empty() {
            return 0.0;
        }
        self.opinions.values().sum::<f64>() / self.opinions.len() as f64
    }

    /// Everyone below the rival threshold.
    pub fn rivals(&self) -> Vec<EntityId> {
        self.opinions
            .iter()
            .filter(|(_, v)| **v < RIVAL_THRESHOLD)
            .map(|(e, _)| *e)
            .collect()
    }

    /// Everyone above the friend threshold.
    pub fn friends(&self) -> Vec<EntityId> {
        self.opinions
            .iter()
            .filter(|(_, v)| **v > FRIEND_THRESHOLD)
            .map(|(e, _)| *e)
            .collect()
    }

    /// Adjust every known opinion by `delta`.
    pub fn adjust_all(&mut self, delta: f64) {
        for value in self.opinions.values_mut() {
            *value = (*value + delta).clamp(OPINION_MIN, OPINION_MAX);
        }
    }

    /// Number of known entities.
    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    /// Whether nobody is known.
    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_clamps() {
        let mut graph = OpinionGraph::new();
        assert!((graph.adjust(EntityId(1), 250.0) - OPINION_MAX).abs() < f64::EPSILON);
        assert!((graph.adjust(EntityId(2), -250.0) - OPINION_MIN).abs() < f64::EPSILON);
        assert!((graph.get(EntityId(3))).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_is_asymmetric() {
        let mut graph = OpinionGraph::new();
        graph.set(EntityId(1), 10.0);
        graph.set(EntityId(2), -10.0);
        graph.decay();
        assert!((graph.get(EntityId(1)) - 9.5).abs() < 1e-9);
        assert!((graph.get(EntityId(2)) + 9.7).abs() < 1e-9);
    }

    #[test]
    fn decay_forgets_neutral() {
        let mut graph = OpinionGraph::new();
        graph.set(EntityId(1), 0.2);
        graph.set(EntityId(2), -0.1);
        graph.decay();
        assert!(graph.is_empty());
    }

    #[test]
    fn rivals_and_friends() {
        let mut graph = OpinionGraph::new();
        graph.set(EntityId(1), -60.0);
        graph.set(EntityId(2), 80.0);
        graph.set(EntityId(3), 20.0);
        assert_eq!(graph.rivals(), vec![EntityId(1)]);
        assert_eq!(graph.friends(), vec![EntityId(2)]);
        assert!((graph.average() - 40.0 / 3.0).abs() < 1e-9);
    }
}
