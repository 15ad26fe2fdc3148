//! Enumeration types for the Keynes simulation.

use serde::{Deserialize, Serialize};

/// How an agent turns its memory into a guess.
///
/// Names serialize in `snake_case` (`last_mean_two_thirds`, ...), which is
/// also the spelling used in configuration files and in the strategy count
/// keys of a [`RoundSummary`](crate::RoundSummary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Uniform integer in `[0, 100]`, no memory.
    Random,
    /// Last winning target divided by the multiplier.
    LastMean,
    /// Same formula as [`Strategy::LastMean`], tracked as a separate population.
    LastMeanOffset,
    /// Last winning target taken as-is (no division by the multiplier).
    LastMeanTwoThirds,
    /// Mean of the last three winning targets divided by the multiplier.
    MovingAverage,
    /// Previous own guess corrected by the last error times the learning rate.
    GradientDescent,
    /// Infers the crowd's k-level from the last target and reasons one step past it.
    KLevelPredicting,
}

impl Strategy {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Random,
        Self::LastMean,
        Self::LastMeanOffset,
        Self::LastMeanTwoThirds,
        Self::MovingAverage,
        Self::GradientDescent,
        Self::KLevelPredicting,
    ];

    /// The canonical `snake_case` name of the strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::LastMean => "last_mean",
            Self::LastMeanOffset => "last_mean_offset",
            Self::LastMeanTwoThirds => "last_mean_two_thirds",
            Self::MovingAverage => "moving_average",
            Self::GradientDescent => "gradient_descent",
            Self::KLevelPredicting => "k_level_predicting",
        }
    }

    /// Whether this is the non-strategic uniform-random strategy.
    pub const fn is_random(self) -> bool {
        matches!(self, Self::Random)
    }
}

impl core::fmt::Display for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
