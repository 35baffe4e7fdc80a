//! Region graph, diplomacy view, and information propagation for Herald.
//!
//! This crate turns a single originating event into a time-scheduled wave
//! of deliveries across the region-adjacency graph. It reads the world
//! through two read-only provider traits and never mutates game state.
//!
//! # Modules
//!
//! - [`config`] -- [`PropagationConfig`] with serde defaults.
//! - [`diplomacy`] -- Relation and influence view used for blocking and
//!   delay multipliers, plus the in-memory [`StaticDiplomacy`].
//! - [`error`] -- Error types for world operations.
//! - [`factory`] -- Normalizes inbound event reports into packets.
//! - [`pathfinding`] -- Bounded reachability and best-first path queries.
//! - [`propagation`] -- The [`PropagationEngine`] and its statistics.
//! - [`region`] -- The region cache, the world data provider seam, and the
//!   [`GridWorld`] fallback map.

pub mod config;
pub mod diplomacy;
pub mod error;
pub mod factory;
pub mod pathfinding;
pub mod propagation;
pub mod region;

pub use config::PropagationConfig;
pub use diplomacy::{DiplomacyProvider, InfluenceState, RelationStatus, StaticDiplomacy};
pub use error::WorldError;
pub use factory::EventReport;
pub use propagation::{Delivery, DropReason, PropagationEngine, PropagationStats};
pub use region::{GridWorld, RegionCache, RegionRecord, WorldDataProvider};
