//! Error types for the director and coordinator.

use herald_agents::AgentError;
use herald_types::{ActorId, ActorKind};

use crate::control::{DirectorState, Transition};

/// Errors raised by director and coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    /// The lifecycle does not allow this transition from the current state.
    #[error("cannot {transition} while {state}")]
    InvalidTransition {
        /// State the director was in.
        state: DirectorState,
        /// Transition that was refused.
        transition: Transition,
    },

    /// Every id in this kind's range has been handed out.
    #[error("{0} actor id range exhausted")]
    IdRangeExhausted(ActorKind),

    /// No actor is registered under this id.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// An agent failed while handling a request.
    #[error("agent failure: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}
