//! Engine binary for the Keynes beauty contest simulation.
//!
//! This is the main entry point that loads configuration, builds the
//! population, and plays every round, streaming one JSON summary per round
//! to stdout. Logs go to stderr so the summary stream stays clean.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `keynes-config.yaml` (or `$KEYNES_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Run the simulation with a JSON-lines report callback
//! 4. Flush the report and log the result

mod error;
mod report;

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use keynes_core::config::SimulationConfig;
use keynes_core::runner;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report::JsonLinesReport;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "keynes-config.yaml";

/// Environment variable naming an alternative configuration file.
const CONFIG_PATH_ENV_VAR: &str = "KEYNES_CONFIG";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration loading, the simulation, or writing
/// the report fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config);
    info!("keynes-engine starting");
    match source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        run = %config.run.name,
        seed = ?config.run.seed,
        rounds = config.game.rounds,
        actors_per_strategy_group = config.game.actors_per_strategy_group,
        multiplier = config.game.multiplier,
        "Run configured"
    );

    // 3. Run the simulation.
    let stdout = std::io::stdout();
    let mut report = JsonLinesReport::new(BufWriter::new(stdout.lock()));
    let result = runner::run_simulation(&config, &mut report).map_err(EngineError::from)?;
    let written = report.written();

    // 4. Flush and log results.
    report.finish().map_err(EngineError::from)?;
    runner::log_simulation_end(&result);

    info!(
        end_reason = ?result.end_reason,
        total_rounds = result.total_rounds,
        summaries_written = written,
        "keynes-engine shutdown complete"
    );

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`; `logging.json`
/// switches to structured JSON lines.
fn init_logging(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the simulation configuration.
///
/// Reads `$KEYNES_CONFIG` if set, otherwise `keynes-config.yaml` relative
/// to the current working directory.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV_VAR).map(PathBuf::from);
    resolve_config(explicit, Path::new(DEFAULT_CONFIG_PATH))
}

/// Load `explicit` if given, otherwise `default_path` when it exists.
///
/// An explicitly named file must exist. Only a missing default file falls
/// back to built-in defaults, in which case `None` is returned as the path.
fn resolve_config(
    explicit: Option<PathBuf>,
    default_path: &Path,
) -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    if let Some(path) = explicit {
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }
    if default_path.exists() {
        let config = SimulationConfig::from_file(default_path)?;
        Ok((config, Some(default_path.to_path_buf())))
    } else {
        let mut config = SimulationConfig::default();
        config.run.apply_env_overrides();
        Ok((config, None))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keynes_core::config::ConfigError;

    use super::*;

    fn project_config() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(DEFAULT_CONFIG_PATH)
    }

    fn missing_config() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("no-such-keynes-config.yaml")
    }

    #[test]
    fn explicit_missing_file_is_a_config_error() {
        let result = resolve_config(Some(missing_config()), &project_config());
        assert!(matches!(
            result,
            Err(EngineError::Config {
                source: ConfigError::Io { .. }
            })
        ));
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let (config, path) = resolve_config(None, &missing_config()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.game, SimulationConfig::default().game);
    }

    #[test]
    fn explicit_file_is_loaded() {
        let path = project_config();
        let (config, loaded) = resolve_config(Some(path.clone()), &missing_config()).unwrap();
        assert_eq!(loaded, Some(path));
        assert_eq!(config.game.rounds, 25);
        assert_eq!(config.game.k_levels.len(), 5);
    }
}
