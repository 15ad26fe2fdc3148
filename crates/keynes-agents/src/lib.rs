//! Agent state, guess strategies, and population construction for the Keynes
//! simulation.
//!
//! This crate holds everything that operates on a single agent or on the
//! initial population, without any knowledge of rounds or selection. The
//! round cycle in `keynes-core` drives it.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] record: identity, memory, guess and update
//! - [`error`] -- Error types for guess computation ([`AgentError`])
//! - [`population`] -- Initial population factory ([`PopulationSpec`])
//! - [`strategy`] -- Guess formulas, one exhaustive dispatch over [`Strategy`]
//!
//! [`Strategy`]: keynes_types::Strategy

pub mod agent;
pub mod error;
pub mod population;
pub mod strategy;

pub use agent::{Agent, is_non_strategic};
pub use error::AgentError;
pub use population::PopulationSpec;
