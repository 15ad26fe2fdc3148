//! Round resolution: winning target, winner, and per-agent errors.
//!
//! Resolution is a pure function of the round's guesses in population
//! order. The winner is the guess closest to the target; on a tie the
//! earliest guess in population order wins.

/// Errors that can occur while resolving a round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// There were no guesses to resolve.
    #[error("cannot resolve a round with no guesses")]
    NoGuesses,
}

/// Outcome of a resolved round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResolution {
    /// `multiplier * mean_guess`.
    pub target: f64,
    /// Arithmetic mean of all guesses.
    pub mean_guess: f64,
    /// Index (population order) of the guess closest to the target.
    pub winner_index: usize,
    /// Signed `guess - target` for every guess, in population order.
    pub errors: Vec<f64>,
}

impl RoundResolution {
    /// Absolute distance of the winning guess from the target.
    pub fn winning_distance(&self) -> Option<f64> {
        self.errors.get(self.winner_index).map(|e| e.abs())
    }
}

/// Resolve a round from its guesses.
///
/// # Errors
///
/// Returns [`ResolveError::NoGuesses`] if `guesses` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn resolve(guesses: &[f64], multiplier: f64) -> Result<RoundResolution, ResolveError> {
    if guesses.is_empty() {
        return Err(ResolveError::NoGuesses);
    }

    let mean_guess = guesses.iter().sum::<f64>() / guesses.len() as f64;
    let target = multiplier * mean_guess;
    let errors: Vec<f64> = guesses.iter().map(|guess| guess - target).collect();

    let mut winner_index = 0;
    let mut best = f64::INFINITY;
    for (index, error) in errors.iter().enumerate() {
        // Strict comparison keeps the first occurrence on ties.
        if error.abs() < best {
            best = error.abs();
            winner_index = index;
        }
    }

    Ok(RoundResolution {
        target,
        mean_guess,
        winner_index,
        errors,
    })
}
