//! Initial population factory.
//!
//! Construction follows these rules, in this order:
//!
//! 1. If k-level 0 is listed, add `actors_per_group * (k_levels - 1)`
//!    random agents.
//! 2. For every strategy, for every k-level: a listed `random` strategy adds
//!    `actors_per_group` random agents for *every* k-level (including 0);
//!    any other strategy skips k-level 0 and adds `actors_per_group` agents
//!    at that k-level.
//!
//! A listed `random` strategy therefore adds random agents on top of the
//! implicit ones from rule 1. The two sources are intentionally not merged.
//!
//! The elimination quota is derived from the same specification and stays
//! fixed for the whole run.

use keynes_types::Strategy;
use tracing::debug;

use crate::agent::{Agent, is_non_strategic};

/// Everything needed to build the starting population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSpec {
    /// Agents created per (strategy, k-level) group.
    pub actors_per_group: u32,
    /// K-levels in configuration order; 0 means random agents.
    pub k_levels: Vec<f64>,
    /// Strategies in configuration order.
    pub strategies: Vec<Strategy>,
    /// Learning rate handed to every agent.
    pub learning_rate: f64,
    /// Target fraction handed to every agent.
    pub multiplier: f64,
}

impl PopulationSpec {
    /// Build the starting population in construction order.
    pub fn build(&self) -> Vec<Agent> {
        let group = self.group_size();
        let mut agents = Vec::with_capacity(self.population_size());

        if self.has_zero_level() {
            let implicit = group.saturating_mul(self.k_levels.len().saturating_sub(1));
            agents.extend((0..implicit).map(|_| self.random_agent()));
        }

        for &strategy in &self.strategies {
            for &k_level in &self.k_levels {
                if strategy.is_random() {
                    agents.extend((0..group).map(|_| self.random_agent()));
                } else if !is_non_strategic(k_level) {
                    agents.extend((0..group).map(|_| {
                        Agent::new(k_level, strategy, self.learning_rate, self.multiplier)
                    }));
                }
            }
        }

        debug!(
            population = agents.len(),
            strategies = self.strategies.len(),
            k_levels = self.k_levels.len(),
            "Population built"
        );
        agents
    }

    /// Size of the population [`PopulationSpec::build`] would produce.
    pub fn population_size(&self) -> usize {
        let group = self.group_size();
        let levels = self.k_levels.len();
        let implicit = if self.has_zero_level() {
            group.saturating_mul(levels.saturating_sub(1))
        } else {
            0
        };
        self.strategies
            .iter()
            .map(|strategy| {
                if strategy.is_random() {
                    group.saturating_mul(levels)
                } else {
                    group.saturating_mul(self.strategic_level_count())
                }
            })
            .fold(implicit, usize::saturating_add)
    }

    /// Number of agents replaced at the end of every round:
    /// `(non-zero k-levels) * (strategies)`.
    pub fn elimination_quota(&self) -> usize {
        self.strategic_level_count()
            .saturating_mul(self.strategies.len())
    }

    /// Whether k-level 0 is listed.
    pub fn has_zero_level(&self) -> bool {
        self.k_levels.iter().any(|&k| is_non_strategic(k))
    }

    /// Number of listed k-levels above zero.
    pub fn strategic_level_count(&self) -> usize {
        self.k_levels
            .iter()
            .filter(|&&k| !is_non_strategic(k))
            .count()
    }

    fn group_size(&self) -> usize {
        usize::try_from(self.actors_per_group).unwrap_or(usize::MAX)
    }

    fn random_agent(&self) -> Agent {
        Agent::new(0.0, Strategy::Random, self.learning_rate, self.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_THIRDS: f64 = 2.0 / 3.0;

    fn spec(k_levels: Vec<f64>, strategies: Vec<Strategy>) -> PopulationSpec {
        PopulationSpec {
            actors_per_group: 10,
            k_levels,
            strategies,
            learning_rate: 1.0,
            multiplier: TWO_THIRDS,
        }
    }

    fn count(agents: &[Agent], strategy: Strategy) -> usize {
        agents.iter().filter(|a| a.strategy() == strategy).count()
    }

    #[test]
    fn zero_level_adds_implicit_random_agents() {
        let spec = spec(vec![0.0, 1.0, 2.0], vec![Strategy::LastMean]);
        let agents = spec.build();
        assert_eq!(count(&agents, Strategy::Random), 20);
        assert_eq!(count(&agents, Strategy::LastMean), 20);
        assert_eq!(agents.len(), 40);
    }

    #[test]
    fn without_zero_level_no_random_agents() {
        let spec = spec(vec![1.0, 2.0], vec![Strategy::LastMean, Strategy::GradientDescent]);
        let agents = spec.build();
        assert_eq!(count(&agents, Strategy::Random), 0);
        assert_eq!(agents.len(), 40);
        assert_eq!(spec.elimination_quota(), 4);
    }

    #[test]
    fn listed_random_strategy_double_counts() {
        // 10 * (3 - 1) implicit + 10 * 3 explicit, one group per k-level.
        let spec = spec(vec![0.0, 1.0, 2.0], vec![Strategy::Random]);
        let agents = spec.build();
        assert_eq!(count(&agents, Strategy::Random), 50);
        assert!(agents.iter().all(|a| a.k_level() <= 0.0));
    }

    #[test]
    fn strategic_agents_keep_their_k_level_order() {
        let spec = spec(vec![1.0, 2.5], vec![Strategy::MovingAverage]);
        let agents = spec.build();
        let levels: Vec<f64> = agents.iter().map(Agent::k_level).collect();
        assert!(levels.iter().take(10).all(|&k| (k - 1.0).abs() < 1e-12));
        assert!(levels.iter().skip(10).all(|&k| (k - 2.5).abs() < 1e-12));
    }

    #[test]
    fn population_size_matches_build() {
        let cases = [
            spec(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![
                Strategy::Random,
                Strategy::LastMean,
                Strategy::LastMeanTwoThirds,
                Strategy::GradientDescent,
                Strategy::KLevelPredicting,
            ]),
            spec(vec![0.0], Vec::new()),
            spec(vec![0.0, 0.5], vec![Strategy::Random, Strategy::MovingAverage]),
            spec(Vec::new(), vec![Strategy::LastMean]),
        ];
        for case in cases {
            assert_eq!(case.build().len(), case.population_size());
        }
    }

    #[test]
    fn reference_scenario_quota_and_size() {
        let spec = spec(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![
            Strategy::Random,
            Strategy::LastMean,
            Strategy::LastMeanTwoThirds,
            Strategy::GradientDescent,
            Strategy::KLevelPredicting,
        ]);
        // 40 implicit + 50 listed random + 4 strategies * 4 levels * 10.
        assert_eq!(spec.population_size(), 250);
        assert_eq!(spec.elimination_quota(), 20);
    }

    #[test]
    fn every_agent_starts_with_empty_memory() {
        let spec = spec(vec![0.0, 1.0], vec![Strategy::LastMean]);
        for agent in spec.build() {
            assert!(agent.guess_history().is_empty());
            assert!(agent.winning_target_history().is_empty());
            assert!(agent.last_error().is_none());
        }
    }
}
