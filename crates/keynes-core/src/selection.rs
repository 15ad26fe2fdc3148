//! Selection and replenishment.
//!
//! After every round the population is ranked by how close each agent's
//! latest guess came to the winning target. The worst `quota` agents are
//! dropped and the best `quota` are replicated onto the end, so the
//! population size never changes.
//!
//! Ranking is stable: agents with equal distance keep their relative
//! population order. With a quota of zero nothing is dropped, but the
//! population is still left in rank order.

use keynes_agents::Agent;
use keynes_types::AgentId;
use tracing::debug;

/// Errors that can occur during selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// An agent has never guessed and cannot be ranked.
    #[error("agent {agent_id} has no recorded guess to rank")]
    MissingGuess {
        /// The agent without a guess.
        agent_id: AgentId,
    },

    /// The quota exceeds the number of survivors it is copied from.
    #[error("cannot replace {quota} agents in a population of {population}")]
    QuotaTooLarge {
        /// Agents to replace.
        quota: usize,
        /// Population size.
        population: usize,
    },
}

/// What selection did to the population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Agents removed, worst last.
    pub eliminated: Vec<AgentId>,
    /// Sources of the appended replicas, best first.
    pub replicated_from: Vec<AgentId>,
}

/// Check that `quota` agents can be replaced in a population of
/// `population`, i.e. `quota <= population - quota`.
///
/// # Errors
///
/// Returns [`SelectionError::QuotaTooLarge`] otherwise.
pub const fn check_quota(quota: usize, population: usize) -> Result<(), SelectionError> {
    if quota > population.saturating_sub(quota) {
        return Err(SelectionError::QuotaTooLarge { quota, population });
    }
    Ok(())
}

/// Rank `population` by distance to `target`, drop the worst `quota`, and
/// append replicas of the best `quota` in rank order.
///
/// The population is left unchanged if an error is returned.
///
/// # Errors
///
/// - [`SelectionError::QuotaTooLarge`] if the quota fails [`check_quota`].
/// - [`SelectionError::MissingGuess`] if any agent has no recorded guess.
pub fn select_and_replenish(
    population: &mut Vec<Agent>,
    target: f64,
    quota: usize,
) -> Result<SelectionOutcome, SelectionError> {
    check_quota(quota, population.len())?;

    let distances = population
        .iter()
        .map(|agent| {
            agent
                .last_guess()
                .map(|guess| (guess - target).abs())
                .ok_or_else(|| SelectionError::MissingGuess {
                    agent_id: agent.id(),
                })
        })
        .collect::<Result<Vec<f64>, SelectionError>>()?;

    let mut ranked: Vec<(f64, Agent)> = distances.into_iter().zip(population.drain(..)).collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let keep = ranked.len().saturating_sub(quota);
    let dropped = ranked.split_off(keep);
    population.extend(ranked.into_iter().map(|(_, agent)| agent));

    let replicas: Vec<Agent> = population.iter().take(quota).map(Agent::replicate).collect();
    let outcome = SelectionOutcome {
        eliminated: dropped.iter().map(|(_, agent)| agent.id()).collect(),
        replicated_from: replicas.iter().filter_map(Agent::cloned_from).collect(),
    };
    population.extend(replicas);

    debug!(
        quota,
        population = population.len(),
        eliminated = outcome.eliminated.len(),
        cutoff_distance = ?dropped.first().map(|(d, _)| *d),
        "Selection complete"
    );
    Ok(outcome)
}
