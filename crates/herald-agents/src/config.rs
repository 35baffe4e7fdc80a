//! Configuration for attention filtering and decision agents.
//!
//! The attention scoring blend and the delay bands are kept as named,
//! configurable parameters with their historical defaults.

use serde::Deserialize;

/// Attention filter parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttentionConfig {
    /// Multiplier applied to every attention score.
    #[serde(default = "default_global_multiplier")]
    pub global_multiplier: f64,

    /// Weight of the actor's type weight in the score.
    #[serde(default = "default_type_weight")]
    pub type_weight: f64,

    /// Weight of packet severity in the score.
    #[serde(default = "default_severity_weight")]
    pub severity_weight: f64,

    /// Weight of packet accuracy in the score.
    #[serde(default = "default_accuracy_weight")]
    pub accuracy_weight: f64,

    /// Weight of the packet's base relevance tier in the score.
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,

    /// Type weights at or below this are filtered out.
    #[serde(default = "default_type_weight_floor")]
    pub type_weight_floor: f64,

    /// Kilometres assumed per relay when estimating distance from hops.
    #[serde(default = "default_km_per_hop")]
    pub km_per_hop: f64,

    /// Processing delay in days for critical-band scores.
    #[serde(default = "default_critical_delay_days")]
    pub critical_delay_days: f64,

    /// Processing delay in days for high-band scores.
    #[serde(default = "default_high_delay_days")]
    pub high_delay_days: f64,

    /// Processing delay in days for medium-band scores.
    #[serde(default = "default_medium_delay_days")]
    pub medium_delay_days: f64,

    /// Processing delay in days for low-band scores.
    #[serde(default = "default_low_delay_days")]
    pub low_delay_days: f64,
}

const fn default_global_multiplier() -> f64 {
    1.0
}

const fn default_type_weight() -> f64 {
    0.4
}

const fn default_severity_weight() -> f64 {
    0.3
}

const fn default_accuracy_weight() -> f64 {
    0.2
}

const fn default_relevance_weight() -> f64 {
    0.1
}

const fn default_type_weight_floor() -> f64 {
    0.1
}

const fn default_km_per_hop() -> f64 {
    200.0
}

const fn default_critical_delay_days() -> f64 {
    0.0
}

const fn default_high_delay_days() -> f64 {
    1.0
}

const fn default_medium_delay_days() -> f64 {
    3.0
}

const fn default_low_delay_days() -> f64 {
    7.0
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            global_multiplier: default_global_multiplier(),
            type_weight: default_type_weight(),
            severity_weight: default_severity_weight(),
            accuracy_weight: default_accuracy_weight(),
            relevance_weight: default_relevance_weight(),
            type_weight_floor: default_type_weight_floor(),
            km_per_hop: default_km_per_hop(),
            critical_delay_days: default_critical_delay_days(),
            high_delay_days: default_high_delay_days(),
            medium_delay_days: default_medium_delay_days(),
            low_delay_days: default_low_delay_days(),
        }
    }
}

/// Decision agent parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Events a nation remembers.
    #[serde(default = "default_nation_memory_capacity")]
    pub nation_memory_capacity: usize,

    /// Memories a character keeps.
    #[serde(default = "default_character_memory_capacity")]
    pub character_memory_capacity: usize,

    /// Game hours after which a memory is forgotten.
    #[serde(default = "default_memory_lifetime_hours")]
    pub memory_lifetime_hours: i64,

    /// Game hours between a nation's strategy reviews.
    #[serde(default = "default_strategy_review_hours")]
    pub strategy_review_hours: i64,

    /// Game hours between a character's ambition reviews.
    #[serde(default = "default_ambition_review_hours")]
    pub ambition_review_hours: i64,

    /// Game hours after which a pursued ambition counts as achieved.
    #[serde(default = "default_ambition_achieved_hours")]
    pub ambition_achieved_hours: i64,

    /// Votes a council keeps on record.
    #[serde(default = "default_council_history_capacity")]
    pub council_history_capacity: usize,

    /// Seed mixed with the actor id for each character's dice.
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
}

const fn default_nation_memory_capacity() -> usize {
    50
}

const fn default_character_memory_capacity() -> usize {
    30
}

const fn default_memory_lifetime_hours() -> i64 {
    8760
}

const fn default_strategy_review_hours() -> i64 {
    24
}

const fn default_ambition_review_hours() -> i64 {
    168
}

const fn default_ambition_achieved_hours() -> i64 {
    720
}

const fn default_council_history_capacity() -> usize {
    100
}

const fn default_rng_seed() -> u64 {
    0x4845_5241_4c44
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            nation_memory_capacity: default_nation_memory_capacity(),
            character_memory_capacity: default_character_memory_capacity(),
            memory_lifetime_hours: default_memory_lifetime_hours(),
            strategy_review_hours: default_strategy_review_hours(),
            ambition_review_hours: default_ambition_review_hours(),
            ambition_achieved_hours: default_ambition_achieved_hours(),
            council_history_capacity: default_council_history_capacity(),
            rng_seed: default_rng_seed(),
        }
    }
}
