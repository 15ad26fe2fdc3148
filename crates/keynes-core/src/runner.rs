//! Simulation loop runner.
//!
//! This module provides [`Simulation`], the multi-round state machine, and
//! [`run_simulation`], the top-level entry point that builds one from a
//! [`SimulationConfig`] and drives it to completion.
//!
//! ```text
//! NotStarted -> Running { round } -> ... -> Completed
//!                     |
//!                     +-> Aborted { round }
//! ```
//!
//! A failed round moves the simulation to `Aborted` and leaves the
//! population as it was before that round. Nothing further can be played
//! once the simulation is aborted or completed.

use keynes_agents::Agent;
use keynes_types::RoundSummary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{self, ConfigError, GameConfig, SimulationConfig};
use crate::round::{self, RoundContext, RoundError};
use crate::selection;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration cannot produce a playable simulation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// A round failed and the run was aborted.
    #[error("round {round} failed: {source}")]
    Round {
        /// Zero-based index of the failed round.
        round: u64,
        /// The underlying round error.
        source: RoundError,
    },

    /// A step was requested after the run had already aborted.
    #[error("simulation was aborted in round {round}")]
    Aborted {
        /// Zero-based index of the round that failed.
        round: u64,
    },
}

/// Where the simulation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    /// No round has been played yet.
    NotStarted,
    /// At least one round has been played; `round` is the next one.
    Running {
        /// Zero-based index of the next round to play.
        round: u64,
    },
    /// Every configured round has been played.
    Completed,
    /// A round failed; no more rounds will be played.
    Aborted {
        /// Zero-based index of the round that failed.
        round: u64,
    },
}

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// Every configured round was played.
    MaxRoundsReached,
    /// The round callback asked the run to stop early.
    CallbackStop,
}

/// Result of the simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Summaries of every completed round, in order.
    pub summaries: Vec<RoundSummary>,
    /// Total number of rounds executed.
    pub total_rounds: u64,
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
}

/// Callback invoked after each round completes.
///
/// Implementations can use this to stream summaries, record population
/// snapshots, and so on.
pub trait RoundCallback {
    /// Called after a round completes successfully, with the population as
    /// it stands after selection.
    fn on_round(&mut self, summary: &RoundSummary, population: &[Agent]);

    /// Checked before every round; returning `true` ends the run cleanly.
    fn stop_requested(&self) -> bool {
        false
    }
}

/// A no-op round callback for testing.
pub struct NoOpCallback;

impl RoundCallback for NoOpCallback {
    fn on_round(&mut self, _summary: &RoundSummary, _population: &[Agent]) {}
}

/// Multi-round beauty contest state machine.
#[derive(Debug)]
pub struct Simulation<R> {
    population: Vec<Agent>,
    multiplier: f64,
    elimination_quota: usize,
    rounds: u64,
    phase: SimulationPhase,
    summaries: Vec<RoundSummary>,
    rng: R,
}

impl<R: Rng> Simulation<R> {
    /// Build a simulation from validated game parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if [`GameConfig::validate`] fails.
    pub fn new(game: &GameConfig, rng: R) -> Result<Self, RunnerError> {
        game.validate()?;
        let spec = game.population_spec();
        info!(
            population = spec.population_size(),
            elimination_quota = spec.elimination_quota(),
            rounds = game.rounds,
            "Population initialized"
        );
        Ok(Self {
            population: spec.build(),
            multiplier: game.multiplier,
            elimination_quota: spec.elimination_quota(),
            rounds: game.rounds,
            phase: SimulationPhase::NotStarted,
            summaries: Vec::new(),
            rng,
        })
    }

    /// Build a simulation around an existing population.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if the multiplier is outside
    /// `(0, 1)`, `rounds` is zero, the population is empty, or the quota is
    /// too large for it.
    pub fn from_population(
        population: Vec<Agent>,
        multiplier: f64,
        elimination_quota: usize,
        rounds: u64,
        rng: R,
    ) -> Result<Self, RunnerError> {
        if !config::is_valid_multiplier(multiplier) {
            return Err(ConfigError::MultiplierOutOfRange { multiplier }.into());
        }
        if rounds == 0 {
            return Err(ConfigError::Invalid {
                reason: "rounds must be at least 1".to_owned(),
            }
            .into());
        }
        if population.is_empty() {
            return Err(ConfigError::EmptyPopulation.into());
        }
        if selection::check_quota(elimination_quota, population.len()).is_err() {
            return Err(ConfigError::QuotaTooLarge {
                quota: elimination_quota,
                population: population.len(),
            }
            .into());
        }
        Ok(Self {
            population,
            multiplier,
            elimination_quota,
            rounds,
            phase: SimulationPhase::NotStarted,
            summaries: Vec::new(),
            rng,
        })
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> SimulationPhase {
        self.phase
    }

    /// The current population.
    pub fn population(&self) -> &[Agent] {
        &self.population
    }

    /// Summaries of every completed round, in order.
    pub fn summaries(&self) -> &[RoundSummary] {
        &self.summaries
    }

    /// Agents replaced at the end of every round.
    pub const fn elimination_quota(&self) -> usize {
        self.elimination_quota
    }

    /// Number of rounds the simulation will play.
    pub const fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Play the next round.
    ///
    /// Returns the new summary, or `None` once every round has been played.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::Round`] if the round fails; the simulation moves to
    ///   [`SimulationPhase::Aborted`].
    /// - [`RunnerError::Aborted`] if the simulation had already aborted.
    pub fn step(&mut self) -> Result<Option<&RoundSummary>, RunnerError> {
        let round = match self.phase {
            SimulationPhase::NotStarted => 0,
            SimulationPhase::Running { round } => round,
            SimulationPhase::Completed => return Ok(None),
            SimulationPhase::Aborted { round } => return Err(RunnerError::Aborted { round }),
        };
        self.phase = SimulationPhase::Running { round };

        let ctx = RoundContext {
            round,
            multiplier: self.multiplier,
            elimination_quota: self.elimination_quota,
        };
        let summary = match round::run_round(&mut self.population, &ctx, &mut self.rng) {
            Ok(summary) => summary,
            Err(source) => {
                warn!(round, error = %source, "Round failed, aborting simulation");
                self.phase = SimulationPhase::Aborted { round };
                return Err(RunnerError::Round { round, source });
            }
        };

        let next = round.saturating_add(1);
        self.phase = if next >= self.rounds {
            SimulationPhase::Completed
        } else {
            SimulationPhase::Running { round: next }
        };
        self.summaries.push(summary);
        Ok(self.summaries.last())
    }

    /// Play every remaining round.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if a round fails or the simulation was
    /// already aborted.
    pub fn run(mut self, callback: &mut dyn RoundCallback) -> Result<SimulationResult, RunnerError> {
        info!(
            rounds = self.rounds,
            population = self.population.len(),
            multiplier = self.multiplier,
            "Simulation starting"
        );

        let end_reason = loop {
            if self.phase == SimulationPhase::Completed {
                break SimulationEndReason::MaxRoundsReached;
            }
            if callback.stop_requested() {
                info!(phase = ?self.phase, "Callback requested stop");
                break SimulationEndReason::CallbackStop;
            }
            if self.step()?.is_none() {
                break SimulationEndReason::MaxRoundsReached;
            }
            if let Some(summary) = self.summaries.last() {
                callback.on_round(summary, &self.population);
            }
        };

        let total_rounds = u64::try_from(self.summaries.len()).unwrap_or(u64::MAX);
        Ok(SimulationResult {
            summaries: self.summaries,
            total_rounds,
            end_reason,
        })
    }
}

/// Run a full simulation from configuration.
///
/// The RNG is seeded from `run.seed` when present and from the operating
/// system otherwise.
///
/// # Errors
///
/// Returns [`RunnerError`] if the configuration is invalid or a round
/// fails.
pub fn run_simulation(
    config: &SimulationConfig,
    callback: &mut dyn RoundCallback,
) -> Result<SimulationResult, RunnerError> {
    let rng = match config.run.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!(run = %config.run.name, seed = ?config.run.seed, "Preparing simulation");
    Simulation::new(&config.game, rng)?.run(callback)
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_rounds = result.total_rounds,
        "Simulation ended"
    );

    if let Some(summary) = result.summaries.last() {
        info!(
            round = summary.round,
            winning_target = summary.winning_target,
            winner_strategy = %summary.winner.strategy,
            population = summary.population(),
            "Final round summary"
        );
    } else {
        warn!("Simulation ended with no rounds executed");
    }
}
