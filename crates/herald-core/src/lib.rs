//! Actor director, mailboxes, and orchestration for Herald.
//!
//! This crate sits between gameplay and the decision agents. Events enter
//! through the [`Coordinator`], spread across the map in the propagation
//! engine, and arrive in per-actor mailboxes. Once per tick the
//! [`Director`] dispatches a bounded frame of due messages and hands every
//! executed decision to a [`DecisionSink`].
//!
//! # Modules
//!
//! - [`clock`] -- Game clock mapping ticks to calendar dates.
//! - [`config`] -- Configuration loading from `herald-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Director lifecycle states and transitions.
//! - [`coordinator`] -- Event intake and delivery routing.
//! - [`director`] -- Actor registry owner and the per-frame dispatcher.
//! - [`error`] -- Director error type.
//! - [`ids`] -- Per-kind actor id allocation.
//! - [`mailbox`] -- Four-tier scheduled mailboxes.
//! - [`registry`] -- Actor and mailbox registries behind the director's
//!   locks.
//! - [`sink`] -- [`DecisionSink`] trait and the in-memory [`DecisionLog`].

pub mod clock;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod director;
pub mod error;
pub mod ids;
pub mod mailbox;
pub mod registry;
pub mod sink;

// Re-export primary types at crate root for convenience.
pub use clock::{ClockError, GameClock};
pub use config::{
    ClockConfig, ConfigError, DirectorConfig, HeraldConfig, LoggingConfig, PriorityDelays,
    WorldConfig,
};
pub use control::{DirectorState, Transition};
pub use coordinator::{Coordinator, TickReport};
pub use director::{Director, FrameReport, MetricsSnapshot};
pub use error::DirectorError;
pub use ids::IdAllocator;
pub use mailbox::{Mailbox, Message, Priority, TierCounts};
pub use registry::{ActorRegistry, MailboxRegistry};
pub use sink::{DecisionLog, DecisionSink};
