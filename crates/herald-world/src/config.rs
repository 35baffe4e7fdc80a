//! Propagation engine tuning.
//!
//! Deserialized from the `propagation` section of `herald-config.yaml`.
//! Every field has a default, so an empty section yields a working engine.

use serde::Deserialize;

/// Tuning parameters for the [`PropagationEngine`](crate::PropagationEngine).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropagationConfig {
    /// Distance a speed-1.0 message covers per game day, in kilometres.
    #[serde(default = "default_base_message_speed")]
    pub base_message_speed_km_per_day: f64,

    /// Global multiplier on propagation speed.
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    /// Fraction of accuracy lost per relay.
    #[serde(default = "default_accuracy_degradation_rate")]
    pub accuracy_degradation_rate: f64,

    /// Relays that would fall below this accuracy are dropped.
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: f64,

    /// Maximum number of relays from the source region.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    /// Maximum straight-line distance from the source region, in kilometres.
    #[serde(default = "default_max_propagation_distance")]
    pub max_propagation_distance_km: f64,

    /// Maximum nodes expanded per `process_queue` call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Soft wall-clock budget for one `process_queue` call.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// Maximum regions expanded by one explicit path query.
    #[serde(default = "default_path_node_budget")]
    pub path_node_budget: usize,

    /// Seconds of host time between region cache rebuilds.
    #[serde(default = "default_cache_rebuild_interval")]
    pub cache_rebuild_interval_secs: f64,

    /// Seconds of host time between purges of stale bookkeeping.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: f64,

    /// Nations below this autonomy are inside someone's sphere.
    #[serde(default = "default_sphere_autonomy_threshold")]
    pub sphere_autonomy_threshold: f64,

    /// Upper bound on any intelligence-network delay bonus.
    #[serde(default = "default_intelligence_bonus_cap")]
    pub intelligence_bonus_cap: f64,
}

const fn default_base_message_speed() -> f64 {
    50.0
}

const fn default_speed_multiplier() -> f64 {
    1.0
}

const fn default_accuracy_degradation_rate() -> f64 {
    0.05
}

const fn default_min_accuracy() -> f64 {
    0.2
}

const fn default_max_hops() -> u32 {
    15
}

const fn default_max_propagation_distance() -> f64 {
    2000.0
}

const fn default_batch_size() -> usize {
    10
}

const fn default_time_budget_ms() -> u64 {
    5
}

const fn default_path_node_budget() -> usize {
    1000
}

const fn default_cache_rebuild_interval() -> f64 {
    30.0
}

const fn default_cleanup_interval() -> f64 {
    60.0
}

const fn default_sphere_autonomy_threshold() -> f64 {
    0.3
}

const fn default_intelligence_bonus_cap() -> f64 {
    0.9
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            base_message_speed_km_per_day: default_base_message_speed(),
            speed_multiplier: default_speed_multiplier(),
            accuracy_degradation_rate: default_accuracy_degradation_rate(),
            min_accuracy: default_min_accuracy(),
            max_hops: default_max_hops(),
            max_propagation_distance_km: default_max_propagation_distance(),
            batch_size: default_batch_size(),
            time_budget_ms: default_time_budget_ms(),
            path_node_budget: default_path_node_budget(),
            cache_rebuild_interval_secs: default_cache_rebuild_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            sphere_autonomy_threshold: default_sphere_autonomy_threshold(),
            intelligence_bonus_cap: default_intelligence_bonus_cap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let config: Result<PropagationConfig, _> = serde_yml::from_str("{}");
        assert!(config.is_ok());
        assert_eq!(config.ok(), Some(PropagationConfig::default()));
    }

    #[test]
    fn partial_section_overrides() {
        let yaml = "max_hops: 4\naccuracy_degradation_rate: 0.1\n";
        let config: PropagationConfig = serde_yml::from_str(yaml).unwrap_or_default();
        assert_eq!(config.max_hops, 4);
        assert!((config.accuracy_degradation_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.batch_size, 10);
    }
}
