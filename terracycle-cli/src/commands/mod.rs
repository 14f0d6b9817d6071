//! Command handlers -- one module per subcommand

pub mod config;
pub mod list;
pub mod probe;
pub mod run;

use std::path::{Path, PathBuf};

use tracing::debug;

use terracycle_core::config::TerracycleConfig;
use terracycle_harness::HarnessConfig;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "terracycle.toml";

/// Source label used when no config file exists.
pub const DEFAULTS_SOURCE: &str = "(defaults)";

/// Effective configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TerracycleConfig,
    /// File path, or [`DEFAULTS_SOURCE`].
    pub source: String,
}

impl LoadedConfig {
    /// Flatten into the harness view and validate it.
    pub fn harness_config(&self) -> Result<HarnessConfig, CliError> {
        let harness = HarnessConfig::from_core(&self.config);
        harness.validate()?;
        Ok(harness)
    }
}

/// Load the effective configuration.
///
/// 1. `--config <path>`: that file must exist.
/// 2. `./terracycle.toml` when present.
/// 3. Built-in defaults.
///
/// `TERRACYCLE_*` environment overrides apply in every case.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let path: Option<PathBuf> = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration file");
            let config = TerracycleConfig::load(&path).await?;
            Ok(LoadedConfig {
                config,
                source: path.display().to_string(),
            })
        }
        None => {
            debug!("no configuration file, using defaults");
            let mut config = TerracycleConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(LoadedConfig {
                config,
                source: DEFAULTS_SOURCE.to_owned(),
            })
        }
    }
}

/// Label for the config source before loading succeeded.
pub fn config_source(explicit: Option<&Path>) -> String {
    match explicit {
        Some(path) => path.display().to_string(),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH.to_owned(),
        None => DEFAULTS_SOURCE.to_owned(),
    }
}

/// Dispatch a parsed subcommand.
///
/// `config validate` reports a broken configuration itself; every other
/// command fails fast on it.
pub async fn execute(
    command: Commands,
    config_path: Option<&Path>,
    loaded: Result<LoadedConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => run::execute(args, &loaded?, writer).await,
        Commands::List => list::execute(&loaded?, writer),
        Commands::Probe => probe::execute(&loaded?, writer).await,
        Commands::Config(args) => {
            config::execute(args, config_source(config_path), loaded, writer)
        }
    }
}
