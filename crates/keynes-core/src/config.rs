//! Configuration loading and validation for the Keynes simulation.
//!
//! The configuration lives in a YAML file (by default `keynes-config.yaml`
//! at the project root). Every section and field has a default, so an empty
//! file is a valid configuration.
//!
//! Loading and validating are separate steps: [`SimulationConfig::parse`]
//! only checks that the YAML is well formed, while
//! [`GameConfig::validate`] rejects configurations that cannot run (bad
//! multiplier, elimination quota too large for the population, and so on).
//! The runner validates before the first round.

use std::collections::BTreeSet;
use std::path::Path;

use keynes_agents::PopulationSpec;
use keynes_types::Strategy;
use serde::Deserialize;
use tracing::warn;

/// Environment variable that overrides `run.seed` when loading from file.
pub const SEED_ENV_VAR: &str = "KEYNES_SEED";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The multiplier is not strictly between 0 and 1.
    #[error("multiplier must lie strictly between 0 and 1, got {multiplier}")]
    MultiplierOutOfRange {
        /// The rejected multiplier.
        multiplier: f64,
    },

    /// Neither strategies nor k-levels were given.
    #[error("at least one strategy or k-level must be configured")]
    EmptyPopulationSpec,

    /// The strategies and k-levels given produce no agents at all.
    #[error("configuration produces an empty population")]
    EmptyPopulation,

    /// More agents would be eliminated each round than survive to be copied.
    #[error(
        "elimination quota {quota} is too large for a population of {population} \
         (at most half the population can be replaced)"
    )]
    QuotaTooLarge {
        /// Agents replaced per round.
        quota: usize,
        /// Total population size.
        population: usize,
    },

    /// Any other invalid value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run identity and randomness.
    #[serde(default)]
    pub run: RunConfig,

    /// Game parameters and population composition.
    #[serde(default)]
    pub game: GameConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `KEYNES_SEED`, when set to an unsigned integer, overrides `run.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.run.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML or
    /// names an unknown strategy.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Run identity and randomness.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Human-readable run name, echoed in logs.
    #[serde(default = "default_run_name")]
    pub name: String,

    /// Seed for the simulation RNG. `None` draws one from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(SEED_ENV_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring unparsable {SEED_ENV_VAR}"),
            }
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            seed: None,
        }
    }
}

/// Game parameters and population composition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Agents per (strategy, k-level) group.
    #[serde(default = "default_actors_per_strategy_group")]
    pub actors_per_strategy_group: u32,

    /// Number of rounds to play.
    #[serde(default = "default_rounds")]
    pub rounds: u64,

    /// Ordered set of k-levels; 0 adds random agents.
    #[serde(default = "default_k_levels")]
    pub k_levels: Vec<f64>,

    /// Ordered set of strategies.
    #[serde(default)]
    pub strategies: Vec<Strategy>,

    /// Step size for gradient-descent agents.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Fraction of the mean guess that forms the winning target.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            actors_per_strategy_group: default_actors_per_strategy_group(),
            rounds: default_rounds(),
            k_levels: default_k_levels(),
            strategies: Vec::new(),
            learning_rate: default_learning_rate(),
            multiplier: default_multiplier(),
        }
    }
}

impl GameConfig {
    /// The population specification described by this configuration.
    pub fn population_spec(&self) -> PopulationSpec {
        PopulationSpec {
            actors_per_group: self.actors_per_strategy_group,
            k_levels: self.k_levels.clone(),
            strategies: self.strategies.clone(),
            learning_rate: self.learning_rate,
            multiplier: self.multiplier,
        }
    }

    /// Reject configurations that cannot run.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MultiplierOutOfRange`] unless `0 < multiplier < 1`.
    /// - [`ConfigError::EmptyPopulationSpec`] if both strategies and
    ///   k-levels are empty.
    /// - [`ConfigError::EmptyPopulation`] if no agents would be created.
    /// - [`ConfigError::QuotaTooLarge`] if the elimination quota exceeds
    ///   the number of survivors it must be copied from.
    /// - [`ConfigError::Invalid`] for zero group size or rounds, negative,
    ///   non-finite or duplicate k-levels, duplicate strategies, or a
    ///   non-finite learning rate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_multiplier(self.multiplier) {
            return Err(ConfigError::MultiplierOutOfRange {
                multiplier: self.multiplier,
            });
        }
        if self.actors_per_strategy_group == 0 {
            return Err(invalid("actors_per_strategy_group must be at least 1"));
        }
        if self.rounds == 0 {
            return Err(invalid("rounds must be at least 1"));
        }
        if self.strategies.is_empty() && self.k_levels.is_empty() {
            return Err(ConfigError::EmptyPopulationSpec);
        }
        if let Some(bad) = self.k_levels.iter().find(|k| !k.is_finite() || **k < 0.0) {
            return Err(invalid(&format!(
                "k-levels must be finite and non-negative, got {bad}"
            )));
        }
        let mut sorted = self.k_levels.clone();
        sorted.sort_by(f64::total_cmp);
        if let Some(pair) = sorted.windows(2).find(|w| match w {
            [a, b] => a.total_cmp(b).is_eq(),
            _ => false,
        }) {
            return Err(invalid(&format!("duplicate k-level in {pair:?}")));
        }
        let unique: BTreeSet<Strategy> = self.strategies.iter().copied().collect();
        if unique.len() != self.strategies.len() {
            return Err(invalid("strategies must not repeat"));
        }
        if !self.learning_rate.is_finite() {
            return Err(invalid("learning_rate must be finite"));
        }

        let spec = self.population_spec();
        let population = spec.population_size();
        if population == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let quota = spec.elimination_quota();
        if quota > population.saturating_sub(quota) {
            return Err(ConfigError::QuotaTooLarge { quota, population });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit structured JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Whether `multiplier` lies strictly between 0 and 1.
pub const fn is_valid_multiplier(multiplier: f64) -> bool {
    multiplier > 0.0 && multiplier < 1.0
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_run_name() -> String {
    "Beauty Contest".to_owned()
}

const fn default_actors_per_strategy_group() -> u32 {
    10
}

const fn default_rounds() -> u64 {
    25
}

fn default_k_levels() -> Vec<f64> {
    vec![0.0, 1.0, 2.0]
}

const fn default_learning_rate() -> f64 {
    1.0
}

const fn default_multiplier() -> f64 {
    2.0 / 3.0
}

fn default_log_level() -> String {
    "info".to_owned()
}
