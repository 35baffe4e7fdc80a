//! Shared type definitions for the Herald information and decision core.
//!
//! This crate is the single source of truth for every identifier, packet,
//! personality template name, and outbound decision record exchanged between
//! the propagation engine, the attention filter, the director, and the host
//! game. It carries no behaviour beyond small pure helpers on the types.
//!
//! # Modules
//!
//! - [`ids`] -- Strongly-typed identifiers and actor id ranges
//! - [`packet`] -- The normalized event packet and its enumerations
//! - [`archetype`] -- Personality archetypes and nation personalities
//! - [`decision`] -- Typed decision records handed to external systems

pub mod archetype;
pub mod decision;
pub mod ids;
pub mod packet;

pub use archetype::{Archetype, NationPersonality, ParseArchetypeError};
pub use decision::{
    DecisionRecord, DiplomaticAction, EconomicPolicy, Intent, MilitaryPosture, PersonalAction,
    PlotKind, ProposalKind, RelationshipAction,
};
pub use ids::{ActorId, ActorKind, EntityId, PacketId, RegionId};
pub use packet::{InformationType, Packet, Relevance};
