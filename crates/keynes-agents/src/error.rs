//! Error types for the keynes-agents crate.
//!
//! Guess computation never returns NaN in place of a failure. A strategy
//! that is undefined for the agent's current memory reports a typed error
//! carrying the strategy and k-level so the caller can identify the agent.

use keynes_types::Strategy;

/// Errors that can occur while an agent computes its guess.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// The strategy's formula is undefined at the agent's current state.
    #[error("{strategy} (k-level {k_level}) is undefined here: {reason}")]
    Domain {
        /// Strategy of the failing agent.
        strategy: Strategy,
        /// K-level of the failing agent.
        k_level: f64,
        /// What made the formula undefined.
        reason: String,
    },

    /// The strategy needs memory the agent has not accumulated yet.
    #[error("{strategy} (k-level {k_level}) has no {missing} to work from")]
    MissingHistory {
        /// Strategy of the failing agent.
        strategy: Strategy,
        /// K-level of the failing agent.
        k_level: f64,
        /// The piece of memory that is absent.
        missing: &'static str,
    },
}

impl AgentError {
    /// Strategy of the agent that raised the error.
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::Domain { strategy, .. } | Self::MissingHistory { strategy, .. } => *strategy,
        }
    }

    /// K-level of the agent that raised the error.
    pub const fn k_level(&self) -> f64 {
        match self {
            Self::Domain { k_level, .. } | Self::MissingHistory { k_level, .. } => *k_level,
        }
    }
}
