//! Per-round output records.
//!
//! A [`RoundSummary`] is produced once per round by the simulation loop and
//! never mutated afterwards. Plotting and reporting live outside this
//! workspace; they consume summaries through serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::Strategy;
use crate::ids::AgentId;

/// The agent whose guess landed closest to the winning target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundWinner {
    /// Identifier of the winning agent.
    pub agent_id: AgentId,
    /// Strategy the winner played.
    pub strategy: Strategy,
    /// Winner's k-level.
    pub k_level: f64,
    /// The winning guess.
    pub guess: f64,
}

/// Summary of a single completed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Zero-based round index.
    pub round: u64,
    /// Number of agents holding each strategy at the start of the round,
    /// keyed by strategy name (lexicographic order).
    pub strategy_counts: BTreeMap<String, u32>,
    /// `multiplier * mean_guess`; the value every guess is judged against.
    pub winning_target: f64,
    /// Mean of all guesses made this round.
    pub mean_guess: f64,
    /// The round's winner.
    pub winner: RoundWinner,
}

impl RoundSummary {
    /// Total number of agents counted in this summary.
    pub fn population(&self) -> u64 {
        self.strategy_counts
            .values()
            .map(|&count| u64::from(count))
            .fold(0_u64, u64::saturating_add)
    }

    /// Number of agents holding `strategy` at the start of the round.
    pub fn count_of(&self, strategy: Strategy) -> u32 {
        self.strategy_counts
            .get(strategy.as_str())
            .copied()
            .unwrap_or(0)
    }
}
