//! Shared type definitions for the Keynes beauty contest simulation.
//!
//! Everything that crosses a crate boundary lives here: agent identity,
//! the strategy enumeration, and the per-round summary handed to external
//! reporting collaborators.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for agent identifiers
//! - [`enums`] -- The [`Strategy`] enumeration
//! - [`structs`] -- Round summaries ([`RoundSummary`], [`RoundWinner`])

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::Strategy;
pub use ids::AgentId;
pub use structs::{RoundSummary, RoundWinner};
