//! Attention filtering and decision agents for Herald.
//!
//! Packets that reach a realm are first screened by the
//! [`AttentionFilter`], which decides per actor whether a piece of news
//! matters and how urgently. Packets that pass are handed by the director to
//! a [`DecisionAgent`]: a nation, a character, or a council. Agents read the
//! world only through an [`AgentContext`] and answer with typed intents.
//!
//! # Modules
//!
//! - [`attention`] -- Per-actor attention profiles and the attention filter
//! - [`agent`] -- The `DecisionAgent` trait dispatched by the director
//! - [`context`] -- Read-only realm views handed to agents per dispatch
//! - [`nation`] -- Realm-level strategic agent
//! - [`character`] -- Personal agent for courtiers and vassals
//! - [`council`] -- Realm council votes and advice
//! - [`memory`] -- Bounded, time-limited event memory
//! - [`social`] -- Opinion graph with asymmetric decay
//! - [`config`] -- Attention and agent tuning parameters
//! - [`error`] -- Agent error type

pub mod agent;
pub mod attention;
pub mod character;
pub mod config;
pub mod context;
pub mod council;
pub mod error;
pub mod memory;
pub mod nation;
pub mod social;

// Re-export primary types at crate root for convenience.
pub use agent::DecisionAgent;
pub use attention::{AttentionFilter, AttentionProfile, AttentionResult, AttentionStats, FilterReason};
pub use character::{Ambition, CharacterAgent, CharacterTraits, Mood};
pub use config::{AgentConfig, AttentionConfig};
pub use context::{AgentContext, RealmRelation, RealmSnapshot, RealmView, StaticRealms};
pub use council::{CouncilAgent, Motion, VoteRecord};
pub use error::AgentError;
pub use memory::{MemoryEntry, MemoryStore};
pub use nation::{NationAgent, StrategicGoal, ThreatLevel};
pub use social::OpinionGraph;
