//! Configuration loading and typed config structures for Herald.
//!
//! The canonical configuration lives in `herald-config.yaml` at the project
//! root. Every section is optional; a missing section or field falls back to
//! the defaults below, so an empty file yields a working simulation.

use std::path::Path;

use chrono::NaiveDate;
use herald_agents::{AgentConfig, AttentionConfig};
use herald_world::PropagationConfig;
use serde::Deserialize;

/// Environment variable that overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "HERALD_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `herald-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeraldConfig {
    /// Demo world generation.
    #[serde(default)]
    pub world: WorldConfig,

    /// Game clock and tick loop.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Propagation engine tuning.
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Attention filter tuning.
    #[serde(default)]
    pub attention: AttentionConfig,

    /// Decision agent tuning.
    #[serde(default)]
    pub agents: AgentConfig,

    /// Director frame budgets.
    #[serde(default)]
    pub director: DirectorConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HeraldConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `HERALD_LOG` overrides `logging.level` when set.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// `HERALD_LOG` overrides `logging.level` when set.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

/// Demo world generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Regions along the x axis.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Regions along the y axis.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Consecutive regions owned by each nation.
    #[serde(default = "default_regions_per_nation")]
    pub regions_per_nation: u32,

    /// Seed for relations, treasuries, and injected events.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Game date the simulation starts on.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Courtiers seeded at each realm's court.
    #[serde(default = "default_characters_per_realm")]
    pub characters_per_realm: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            regions_per_nation: default_regions_per_nation(),
            seed: default_seed(),
            start_date: default_start_date(),
            characters_per_realm: default_characters_per_realm(),
        }
    }
}

/// Game clock and host tick loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Game hours that pass per tick.
    #[serde(default = "default_game_hours_per_tick")]
    pub game_hours_per_tick: u32,

    /// Real milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to run before stopping (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Ticks between injected demo events (0 = none).
    #[serde(default = "default_event_interval_ticks")]
    pub event_interval_ticks: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            game_hours_per_tick: default_game_hours_per_tick(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            event_interval_ticks: default_event_interval_ticks(),
        }
    }
}

/// Priority-to-delay offsets applied when a message enters a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PriorityDelays {
    /// Hours before a critical message is due.
    #[serde(default)]
    pub critical_hours: i64,

    /// Hours before a high-priority message is due.
    #[serde(default = "default_high_delay_hours")]
    pub high_hours: i64,

    /// Hours before a medium-priority message is due.
    #[serde(default = "default_medium_delay_hours")]
    pub medium_hours: i64,

    /// Hours before a low-priority message is due.
    #[serde(default = "default_low_delay_hours")]
    pub low_hours: i64,
}

impl Default for PriorityDelays {
    fn default() -> Self {
        Self {
            critical_hours: 0,
            high_hours: default_high_delay_hours(),
            medium_hours: default_medium_delay_hours(),
            low_hours: default_low_delay_hours(),
        }
    }
}

/// Director frame budgets and load balancing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectorConfig {
    /// Actors dispatched per frame after the critical pass. Adjusted by the
    /// load balancer.
    #[serde(default = "default_max_actors_per_frame")]
    pub max_actors_per_frame: usize,

    /// Messages dispatched per actor per frame.
    #[serde(default = "default_max_messages_per_actor")]
    pub max_messages_per_actor: usize,

    /// Soft frame budget in milliseconds, used for reporting.
    #[serde(default = "default_target_frame_ms")]
    pub target_frame_ms: f64,

    /// Background tasks run per light frame.
    #[serde(default = "default_background_tasks_per_frame")]
    pub background_tasks_per_frame: usize,

    /// Nations queued for background updates per pass.
    #[serde(default = "default_background_nations_per_pass")]
    pub background_nations_per_pass: usize,

    /// Characters queued for background updates per pass.
    #[serde(default = "default_background_characters_per_pass")]
    pub background_characters_per_pass: usize,

    /// Frames between load-balancing passes.
    #[serde(default = "default_load_balance_interval_frames")]
    pub load_balance_interval_frames: u64,

    /// Mailbox depth above which an actor counts as overloaded.
    #[serde(default = "default_overload_queue_depth")]
    pub overload_queue_depth: usize,

    /// Overloaded actors needed before throughput is raised.
    #[serde(default = "default_overload_actor_count")]
    pub overload_actor_count: usize,

    /// Total queued messages below which throughput is lowered.
    #[serde(default = "default_low_total_queued")]
    pub low_total_queued: usize,

    /// Lowest value the load balancer may set.
    #[serde(default = "default_actors_per_frame_floor")]
    pub actors_per_frame_floor: usize,

    /// Highest value the load balancer may set.
    #[serde(default = "default_actors_per_frame_ceiling")]
    pub actors_per_frame_ceiling: usize,

    /// Scheduling offsets per priority tier.
    #[serde(default)]
    pub priority_delay_hours: PriorityDelays,

    /// Decision records kept by the in-memory log before the oldest are
    /// dropped.
    #[serde(default = "default_decision_log_capacity")]
    pub decision_log_capacity: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            max_actors_per_frame: default_max_actors_per_frame(),
            max_messages_per_actor: default_max_messages_per_actor(),
            target_frame_ms: default_target_frame_ms(),
            background_tasks_per_frame: default_background_tasks_per_frame(),
            background_nations_per_pass: default_background_nations_per_pass(),
            background_characters_per_pass: default_background_characters_per_pass(),
            load_balance_interval_frames: default_load_balance_interval_frames(),
            overload_queue_depth: default_overload_queue_depth(),
            overload_actor_count: default_overload_actor_count(),
            low_total_queued: default_low_total_queued(),
            actors_per_frame_floor: default_actors_per_frame_floor(),
            actors_per_frame_ceiling: default_actors_per_frame_ceiling(),
            priority_delay_hours: PriorityDelays::default(),
            decision_log_capacity: default_decision_log_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Override the level with `HERALD_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.level = level;
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_width() -> u32 {
    10
}

const fn default_height() -> u32 {
    10
}

const fn default_regions_per_nation() -> u32 {
    5
}

const fn default_seed() -> u64 {
    42
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1444, 11, 11).unwrap_or_default()
}

const fn default_characters_per_realm() -> u32 {
    2
}

const fn default_game_hours_per_tick() -> u32 {
    6
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_max_ticks() -> u64 {
    0
}

const fn default_event_interval_ticks() -> u64 {
    8
}

const fn default_high_delay_hours() -> i64 {
    24
}

const fn default_medium_delay_hours() -> i64 {
    168
}

const fn default_low_delay_hours() -> i64 {
    336
}

const fn default_max_actors_per_frame() -> usize {
    10
}

const fn default_max_messages_per_actor() -> usize {
    5
}

const fn default_target_frame_ms() -> f64 {
    16.67
}

const fn default_background_tasks_per_frame() -> usize {
    5
}

const fn default_background_nations_per_pass() -> usize {
    2
}

const fn default_background_characters_per_pass() -> usize {
    3
}

const fn default_load_balance_interval_frames() -> u64 {
    300
}

const fn default_overload_queue_depth() -> usize {
    50
}

const fn default_overload_actor_count() -> usize {
    5
}

const fn default_low_total_queued() -> usize {
    100
}

const fn default_actors_per_frame_floor() -> usize {
    5
}

const fn default_actors_per_frame_ceiling() -> usize {
    20
}

const fn default_decision_log_capacity() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
