//! Guess formulas for every [`Strategy`].
//!
//! A non-random agent first computes a *mean guess*:
//!
//! - On its first round (no winning target observed yet) every strategy
//!   uses the k-level bootstrap: `50 * (1 - k) + 50 * m * k + noise` for
//!   `k < 1`, otherwise `50 * m^(k - 1) + noise`, with `noise` uniform in
//!   `[-5, 5]`.
//! - Afterwards the strategy's own rule applies (see [`Strategy`]).
//!
//! The mean is then jittered by up to +/-10% of itself and scaled by the
//! multiplier, floored at zero. Random agents skip all of this and draw a
//! uniform integer in `[0, 100]`.
//!
//! `last_mean` divides the last target by the multiplier while
//! `last_mean_two_thirds` uses it as-is. Both rules are kept exactly.

use keynes_types::Strategy;
use rand::Rng;

use crate::agent::Agent;
use crate::error::AgentError;

/// Centre of the guessing range; the k-level 0 expectation of the crowd.
pub const BOOTSTRAP_CENTER: f64 = 50.0;

/// Half-width of the additive noise applied to the bootstrap mean.
pub const BOOTSTRAP_NOISE: f64 = 5.0;

/// Half-width of the relative jitter applied to every non-random mean.
pub const PERTURBATION: f64 = 0.1;

/// Number of recent winning targets averaged by [`Strategy::MovingAverage`].
pub const MOVING_AVERAGE_WINDOW: usize = 3;

/// How far [`Strategy::KLevelPredicting`] assumes the crowd's reasoning
/// depth advances each round.
pub const K_LEVEL_STEP: f64 = 0.6;

/// Upper bound (inclusive) of a random agent's guess.
pub const RANDOM_GUESS_MAX: u32 = 100;

/// Compute `agent`'s next guess without mutating it.
pub fn propose(agent: &Agent, rng: &mut impl Rng) -> Result<f64, AgentError> {
    match mean_guess(agent, rng)? {
        Some(mean) => Ok(perturb(mean, agent.multiplier(), rng)),
        None => Ok(random_guess(rng)),
    }
}

/// The mean guess before jitter, or `None` for a random agent.
///
/// This is the single dispatch point from strategy to formula.
pub fn mean_guess(agent: &Agent, rng: &mut impl Rng) -> Result<Option<f64>, AgentError> {
    let multiplier = agent.multiplier();
    let mean = match (agent.strategy(), agent.last_winning_target()) {
        (Strategy::Random, _) => return Ok(None),
        (_, None) => bootstrap_mean(agent.k_level(), multiplier, rng),
        (Strategy::LastMean | Strategy::LastMeanOffset, Some(last)) => last / multiplier,
        (Strategy::LastMeanTwoThirds, Some(last)) => last,
        (Strategy::MovingAverage, Some(last)) => {
            recent_mean(agent.winning_target_history()).unwrap_or(last) / multiplier
        }
        (Strategy::GradientDescent, Some(_)) => gradient_step(agent)?,
        (Strategy::KLevelPredicting, Some(last)) => predict_next_level(agent, last)?,
    };
    Ok(Some(mean))
}

/// Uniform integer guess in `[0, RANDOM_GUESS_MAX]`.
pub fn random_guess(rng: &mut impl Rng) -> f64 {
    f64::from(rng.random_range(0..=RANDOM_GUESS_MAX))
}

/// First-round mean guess derived purely from the k-level.
pub fn bootstrap_mean(k_level: f64, multiplier: f64, rng: &mut impl Rng) -> f64 {
    let noise = rng.random_range(-BOOTSTRAP_NOISE..=BOOTSTRAP_NOISE);
    let base = if k_level < 1.0 {
        BOOTSTRAP_CENTER * (1.0 - k_level) + BOOTSTRAP_CENTER * multiplier * k_level
    } else {
        BOOTSTRAP_CENTER * multiplier.powf(k_level - 1.0)
    };
    base + noise
}

/// Jitter `mean` by up to +/-[`PERTURBATION`] of itself, scale by the
/// multiplier, and floor at zero.
pub fn perturb(mean: f64, multiplier: f64, rng: &mut impl Rng) -> f64 {
    let jitter = rng.random_range(-PERTURBATION..=PERTURBATION);
    let mean = mean + mean * jitter;
    (mean * multiplier).max(0.0)
}

/// K-level that would have produced `target` under the bootstrap rule.
///
/// Solves `target = 50 * m^(k - 1)` for `k`. Only defined for a strictly
/// positive target.
pub fn implied_k_level(target: f64, multiplier: f64) -> Option<f64> {
    if target > 0.0 && target.is_finite() {
        Some((target / BOOTSTRAP_CENTER).ln() / multiplier.ln() + 1.0)
    } else {
        None
    }
}

/// Previous own guess moved by the last error times the learning rate.
fn gradient_step(agent: &Agent) -> Result<f64, AgentError> {
    let missing = |missing| AgentError::MissingHistory {
        strategy: agent.strategy(),
        k_level: agent.k_level(),
        missing,
    };
    let previous = agent.last_guess().ok_or_else(|| missing("previous guess"))?;
    let error = agent.last_error().ok_or_else(|| missing("previous error"))?;
    Ok(previous + error * agent.learning_rate())
}

/// Bootstrap mean one [`K_LEVEL_STEP`] beyond the level implied by `last`.
fn predict_next_level(agent: &Agent, last: f64) -> Result<f64, AgentError> {
    let multiplier = agent.multiplier();
    let implied = implied_k_level(last, multiplier).ok_or_else(|| AgentError::Domain {
        strategy: agent.strategy(),
        k_level: agent.k_level(),
        reason: format!("log of previous winning target {last} over {BOOTSTRAP_CENTER} is undefined"),
    })?;
    let predicted = implied + K_LEVEL_STEP;
    Ok(BOOTSTRAP_CENTER * multiplier.powf(predicted - 1.0))
}

/// Mean of the last [`MOVING_AVERAGE_WINDOW`] entries of `history`.
#[allow(clippy::cast_precision_loss)]
fn recent_mean(history: &[f64]) -> Option<f64> {
    let window = history.len().min(MOVING_AVERAGE_WINDOW);
    let recent = history.get(history.len().saturating_sub(window)..)?;
    if recent.is_empty() {
        None
    } else {
        Some(recent.iter().sum::<f64>() / recent.len() as f64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const TWO_THIRDS: f64 = 2.0 / 3.0;
    const EPS: f64 = 1e-9;

    /// Agent that has played one round and observed `target`.
    fn seasoned(strategy: Strategy, k_level: f64, guess: f64, target: f64) -> Agent {
        let mut agent = Agent::new(k_level, strategy, 0.5, TWO_THIRDS);
        agent.record_guess(guess);
        agent.update(guess - target, target);
        agent
    }

    /// Bounds of `perturb(mean)` for a positive mean.
    fn perturbed_bounds(mean: f64) -> (f64, f64) {
        (
            mean * (1.0 - PERTURBATION) * TWO_THIRDS - EPS,
            mean * (1.0 + PERTURBATION) * TWO_THIRDS + EPS,
        )
    }

    /// Mean guess for an agent whose strategy draws no randomness here.
    fn pure_mean(agent: &Agent) -> Result<f64, AgentError> {
        let mut rng = SmallRng::seed_from_u64(0);
        mean_guess(agent, &mut rng).map(|mean| mean.unwrap())
    }

    fn assert_within(value: f64, (lo, hi): (f64, f64)) {
        assert!(value >= lo && value <= hi, "{value} not in [{lo}, {hi}]");
    }

    #[test]
    fn random_guesses_are_integers_in_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        let agent = Agent::new(0.0, Strategy::Random, 1.0, TWO_THIRDS);
        for _ in 0..500 {
            let guess = propose(&agent, &mut rng).unwrap();
            assert!((0.0..=100.0).contains(&guess));
            assert!((guess - guess.round()).abs() < EPS);
        }
    }

    #[test]
    fn bootstrap_below_one_interpolates() {
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..200 {
            let mean = bootstrap_mean(0.5, TWO_THIRDS, &mut rng);
            let centre = 50.0 * 0.5 + 50.0 * TWO_THIRDS * 0.5;
            assert_within(mean, (centre - 5.0 - EPS, centre + 5.0 + EPS));
        }
    }

    #[test]
    fn bootstrap_at_or_above_one_is_geometric() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let mean = bootstrap_mean(3.0, TWO_THIRDS, &mut rng);
            let centre = 50.0 * TWO_THIRDS * TWO_THIRDS;
            assert_within(mean, (centre - 5.0 - EPS, centre + 5.0 + EPS));
        }
    }

    #[test]
    fn first_round_uses_bootstrap_for_every_strategy() {
        let mut rng = SmallRng::seed_from_u64(4);
        for strategy in Strategy::ALL.into_iter().filter(|s| !s.is_random()) {
            let agent = Agent::new(1.0, strategy, 1.0, TWO_THIRDS);
            let guess = propose(&agent, &mut rng).unwrap();
            // 50 * m^0 = 50, +/-5 noise, +/-10% jitter, times m.
            assert_within(guess, (45.0 * 0.9 * TWO_THIRDS - EPS, 55.0 * 1.1 * TWO_THIRDS + EPS));
        }
    }

    #[test]
    fn perturbation_floors_at_zero() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..100 {
            assert!(perturb(-40.0, TWO_THIRDS, &mut rng) >= 0.0);
        }
    }

    #[test]
    fn last_mean_divides_by_multiplier() {
        let agent = seasoned(Strategy::LastMean, 2.0, 30.0, 20.0);
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 30.0).abs() < EPS);
    }

    #[test]
    fn last_mean_offset_matches_last_mean() {
        let a = seasoned(Strategy::LastMean, 2.0, 30.0, 24.0);
        let b = seasoned(Strategy::LastMeanOffset, 2.0, 30.0, 24.0);
        let diff = pure_mean(&a).unwrap() - pure_mean(&b).unwrap();
        assert!(diff.abs() < EPS);
    }

    #[test]
    fn last_mean_two_thirds_uses_target_as_is() {
        let agent = seasoned(Strategy::LastMeanTwoThirds, 1.0, 30.0, 21.0);
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 21.0).abs() < EPS);

        let mut rng = SmallRng::seed_from_u64(6);
        for _ in 0..100 {
            let guess = propose(&agent, &mut rng).unwrap();
            assert_within(guess, perturbed_bounds(21.0));
        }
    }

    #[test]
    fn moving_average_uses_last_three_targets() {
        let mut agent = Agent::new(1.0, Strategy::MovingAverage, 1.0, TWO_THIRDS);
        for target in [90.0, 10.0, 20.0, 30.0] {
            agent.record_guess(target);
            agent.update(0.0, target);
        }
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 20.0 / TWO_THIRDS).abs() < EPS);
    }

    #[test]
    fn moving_average_with_short_history() {
        let agent = seasoned(Strategy::MovingAverage, 1.0, 30.0, 12.0);
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 12.0 / TWO_THIRDS).abs() < EPS);
    }

    #[test]
    fn gradient_descent_steps_by_error() {
        // guess 40, target 30 -> error 10, learning rate 0.5
        let agent = seasoned(Strategy::GradientDescent, 1.0, 40.0, 30.0);
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 45.0).abs() < EPS);
    }

    #[test]
    fn gradient_descent_without_error_is_missing_history() {
        let mut agent = Agent::new(1.0, Strategy::GradientDescent, 1.0, TWO_THIRDS);
        agent.update(0.0, 30.0);
        let err = pure_mean(&agent).unwrap_err();
        assert!(matches!(err, AgentError::MissingHistory { .. }));
    }

    #[test]
    fn k_level_predicting_advances_implied_level() {
        let target = 50.0 * TWO_THIRDS; // implied k = 2
        let agent = seasoned(Strategy::KLevelPredicting, 1.0, 30.0, target);
        let implied = implied_k_level(target, TWO_THIRDS).unwrap();
        assert!((implied - 2.0).abs() < EPS);
        let mean = pure_mean(&agent).unwrap();
        assert!((mean - 50.0 * TWO_THIRDS.powf(1.6)).abs() < EPS);
    }

    #[test]
    fn k_level_predicting_rejects_zero_target() {
        let mut rng = SmallRng::seed_from_u64(8);
        let agent = seasoned(Strategy::KLevelPredicting, 2.0, 0.0, 0.0);
        let err = propose(&agent, &mut rng).unwrap_err();
        match err {
            AgentError::Domain {
                strategy, k_level, ..
            } => {
                assert_eq!(strategy, Strategy::KLevelPredicting);
                assert!((k_level - 2.0).abs() < EPS);
            }
            other @ AgentError::MissingHistory { .. } => {
                panic!("expected domain error, got {other}")
            }
        }
    }

    #[test]
    fn implied_k_level_rejects_non_positive() {
        assert!(implied_k_level(0.0, TWO_THIRDS).is_none());
        assert!(implied_k_level(-1.0, TWO_THIRDS).is_none());
        assert!(implied_k_level(f64::NAN, TWO_THIRDS).is_none());
    }
}
