//! The agent record: identity, strategy, and per-agent memory.
//!
//! An agent owns its guess history and its copy of the winning-target
//! history. Nothing outside this module can write to either; the round
//! cycle goes through [`Agent::record_guess`] and [`Agent::update`].
//!
//! Replacement agents created during selection come from
//! [`Agent::replicate`], which copies every history container so that the
//! copy and its source never share storage.

use keynes_types::{AgentId, Strategy};
use rand::Rng;
use tracing::trace;

use crate::error::AgentError;
use crate::strategy;

/// Whether a k-level denotes a non-strategic (uniform-random) agent.
///
/// K-levels are validated as non-negative, so anything at or below zero
/// is the zero level.
pub const fn is_non_strategic(k_level: f64) -> bool {
    k_level <= 0.0
}

/// A single contestant.
#[derive(Debug, PartialEq)]
pub struct Agent {
    /// Unique identity; fresh for every replica.
    id: AgentId,
    /// The agent this one was replicated from, if any.
    cloned_from: Option<AgentId>,
    /// Depth of reasoning. 0 means uniform-random guessing.
    k_level: f64,
    /// Guess rule, fixed for the agent's lifetime.
    strategy: Strategy,
    /// Step size for [`Strategy::GradientDescent`].
    learning_rate: f64,
    /// The game's target fraction, shared by the whole population.
    multiplier: f64,
    /// Own past guesses, oldest first.
    guess_history: Vec<f64>,
    /// Past winning targets, oldest first.
    winning_target_history: Vec<f64>,
    /// Signed `guess - target` from the most recent update.
    last_error: Option<f64>,
}

impl Agent {
    /// Create a fresh agent with empty memory.
    ///
    /// A k-level of zero forces [`Strategy::Random`] regardless of the
    /// requested strategy.
    pub fn new(k_level: f64, strategy: Strategy, learning_rate: f64, multiplier: f64) -> Self {
        let strategy = if is_non_strategic(k_level) {
            Strategy::Random
        } else {
            strategy
        };
        Self {
            id: AgentId::new(),
            cloned_from: None,
            k_level,
            strategy,
            learning_rate,
            multiplier,
            guess_history: Vec::new(),
            winning_target_history: Vec::new(),
            last_error: None,
        }
    }

    /// Create a replacement agent that plays exactly like `self`.
    ///
    /// The replica gets a fresh [`AgentId`] and remembers its source in
    /// [`Agent::cloned_from`]. Every other field, including both histories
    /// and the last error, is copied into independent storage.
    pub fn replicate(&self) -> Self {
        trace!(source = %self.id, strategy = %self.strategy, "Replicating agent");
        Self {
            id: AgentId::new(),
            cloned_from: Some(self.id),
            k_level: self.k_level,
            strategy: self.strategy,
            learning_rate: self.learning_rate,
            multiplier: self.multiplier,
            guess_history: self.guess_history.clone(),
            winning_target_history: self.winning_target_history.clone(),
            last_error: self.last_error,
        }
    }

    /// Compute this round's guess without touching the agent's memory.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Domain`] when the strategy's formula is
    /// undefined for the current memory, or [`AgentError::MissingHistory`]
    /// when the strategy needs memory the agent does not have.
    pub fn propose_guess(&self, rng: &mut impl Rng) -> Result<f64, AgentError> {
        strategy::propose(self, rng)
    }

    /// Append a guess produced by [`Agent::propose_guess`] to the history.
    pub fn record_guess(&mut self, guess: f64) {
        self.guess_history.push(guess);
    }

    /// Produce and record one guess.
    ///
    /// # Errors
    ///
    /// Same as [`Agent::propose_guess`]; nothing is recorded on failure.
    pub fn guess(&mut self, rng: &mut impl Rng) -> Result<f64, AgentError> {
        let guess = self.propose_guess(rng)?;
        self.record_guess(guess);
        Ok(guess)
    }

    /// Learn the outcome of the round just resolved.
    pub fn update(&mut self, error: f64, winning_target: f64) {
        self.last_error = Some(error);
        self.winning_target_history.push(winning_target);
    }

    /// Unique identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Source agent if this one is a replica.
    pub const fn cloned_from(&self) -> Option<AgentId> {
        self.cloned_from
    }

    /// Depth of reasoning.
    pub const fn k_level(&self) -> f64 {
        self.k_level
    }

    /// Guess rule.
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Gradient-descent step size.
    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// The game's target fraction.
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// All recorded guesses, oldest first.
    pub fn guess_history(&self) -> &[f64] {
        &self.guess_history
    }

    /// All observed winning targets, oldest first.
    pub fn winning_target_history(&self) -> &[f64] {
        &self.winning_target_history
    }

    /// Signed error from the most recent update, if any.
    pub const fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    /// Most recently recorded guess.
    pub fn last_guess(&self) -> Option<f64> {
        self.guess_history.last().copied()
    }

    /// Most recently observed winning target.
    pub fn last_winning_target(&self) -> Option<f64> {
        self.winning_target_history.last().copied()
    }
}
