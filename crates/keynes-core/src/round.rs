//! Round cycle: one full pass of the beauty contest.
//!
//! Each round runs through these phases:
//!
//! 1. **Census** -- count agents per strategy before anything changes.
//! 2. **Guess** -- every agent proposes a guess, in population order.
//! 3. **Resolve** -- compute the winning target, winner, and errors.
//! 4. **Update** -- every agent records its guess and learns the outcome.
//! 5. **Select** -- drop the worst agents and replicate the best.
//! 6. **Summarize** -- return the [`RoundSummary`].
//!
//! Phases 2 and 3 only read the population. If either fails the round is
//! abandoned and the population is exactly as it was before the round.

use std::collections::BTreeMap;

use keynes_agents::{Agent, AgentError};
use keynes_types::{AgentId, RoundSummary, RoundWinner};
use rand::Rng;
use tracing::{debug, info};

use crate::resolver::{self, ResolveError};
use crate::selection::{self, SelectionError};

/// Errors that can occur during a round.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// The population has no agents.
    #[error("cannot play a round with an empty population")]
    EmptyPopulation,

    /// An agent could not produce a guess.
    #[error("agent {agent_id} failed to guess: {source}")]
    Agent {
        /// The agent that failed.
        agent_id: AgentId,
        /// The underlying agent error.
        source: AgentError,
    },

    /// Round resolution failed.
    #[error("resolution error: {source}")]
    Resolve {
        /// The underlying resolution error.
        #[from]
        source: ResolveError,
    },

    /// Selection and replenishment failed.
    #[error("selection error: {source}")]
    Selection {
        /// The underlying selection error.
        #[from]
        source: SelectionError,
    },

    /// The resolver named a winner outside the population.
    #[error("winner index {index} is outside a population of {population}")]
    WinnerOutOfRange {
        /// The reported winner index.
        index: usize,
        /// Population size.
        population: usize,
    },
}

/// Fixed parameters for a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundContext {
    /// Zero-based round index.
    pub round: u64,
    /// Fraction of the mean guess that forms the winning target.
    pub multiplier: f64,
    /// Agents replaced at the end of the round.
    pub elimination_quota: usize,
}

/// Number of agents per strategy, keyed by strategy name.
pub fn strategy_counts(population: &[Agent]) -> BTreeMap<String, u32> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for agent in population {
        let count = counts.entry(agent.strategy().as_str().to_owned()).or_insert(0);
        *count = count.saturating_add(1);
    }
    counts
}

/// Execute a single round against `population`.
///
/// # Errors
///
/// - [`RoundError::EmptyPopulation`] if there are no agents.
/// - [`RoundError::Selection`] if the quota is too large for the
///   population (checked before any guess is made).
/// - [`RoundError::Agent`] if any agent's strategy fails; the population
///   is left untouched.
pub fn run_round(
    population: &mut Vec<Agent>,
    ctx: &RoundContext,
    rng: &mut impl Rng,
) -> Result<RoundSummary, RoundError> {
    if population.is_empty() {
        return Err(RoundError::EmptyPopulation);
    }
    selection::check_quota(ctx.elimination_quota, population.len())?;

    // --- Census ---
    let counts = strategy_counts(population);

    // --- Guess ---
    let mut guesses = Vec::with_capacity(population.len());
    for agent in &*population {
        let guess = agent
            .propose_guess(rng)
            .map_err(|source| RoundError::Agent {
                agent_id: agent.id(),
                source,
            })?;
        guesses.push(guess);
    }

    // --- Resolve ---
    let resolution = resolver::resolve(&guesses, ctx.multiplier)?;
    let winner = population
        .get(resolution.winner_index)
        .zip(guesses.get(resolution.winner_index))
        .map(|(agent, &guess)| RoundWinner {
            agent_id: agent.id(),
            strategy: agent.strategy(),
            k_level: agent.k_level(),
            guess,
        })
        .ok_or(RoundError::WinnerOutOfRange {
            index: resolution.winner_index,
            population: population.len(),
        })?;

    // --- Update ---
    for ((agent, &guess), &error) in population
        .iter_mut()
        .zip(&guesses)
        .zip(&resolution.errors)
    {
        agent.record_guess(guess);
        agent.update(error, resolution.target);
    }

    // --- Select ---
    let outcome =
        selection::select_and_replenish(population, resolution.target, ctx.elimination_quota)?;
    debug!(
        round = ctx.round,
        eliminated = outcome.eliminated.len(),
        replicated = outcome.replicated_from.len(),
        "Population replenished"
    );

    info!(
        round = ctx.round,
        target = resolution.target,
        mean_guess = resolution.mean_guess,
        winner = %winner.agent_id,
        winner_strategy = %winner.strategy,
        winner_guess = winner.guess,
        "Round complete"
    );

    Ok(RoundSummary {
        round: ctx.round,
        strategy_counts: counts,
        winning_target: resolution.target,
        mean_guess: resolution.mean_guess,
        winner,
    })
}
