//! Round cycle, selection, and orchestration for the Keynes simulation.
//!
//! This crate owns the round cycle that drives the beauty contest: every
//! agent guesses, the round is resolved against `multiplier * mean`, agents
//! learn the outcome, and the worst performers are replaced by copies of
//! the best.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `keynes-config.yaml` into
//!   strongly-typed structs, plus validation.
//! - [`resolver`] -- Winning target, winner, and per-agent errors.
//! - [`round`] -- The single-round cycle.
//! - [`runner`] -- [`Simulation`] state machine and [`run_simulation`].
//! - [`selection`] -- Ranking, elimination, and replication.
//!
//! [`Simulation`]: runner::Simulation
//! [`run_simulation`]: runner::run_simulation

pub mod config;
pub mod resolver;
pub mod round;
pub mod runner;
pub mod selection;
