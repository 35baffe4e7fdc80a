//! Error types for the `herald-agents` crate.
//!
//! Agents return these from message handling and background updates. The
//! director catches them at the dispatch boundary, logs them, and abandons
//! only the unit of work that failed.

use herald_types::{EntityId, ParseArchetypeError};

/// Errors that can occur inside a decision agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The realm snapshot an evaluation needs is not available.
    #[error("realm data unavailable for entity {0}")]
    RealmUnavailable(EntityId),

    /// An archetype name could not be parsed.
    #[error("invalid archetype: {source}")]
    Archetype {
        /// The underlying parse error.
        #[from]
        source: ParseArchetypeError,
    },
}
