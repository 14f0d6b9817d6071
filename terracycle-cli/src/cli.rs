//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// terracycle -- provision, verify and destroy infrastructure modules.
///
/// Use `terracycle <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "terracycle", version, about, long_about = None)]
pub struct Cli {
    /// Path to terracycle.toml. Defaults to ./terracycle.toml when present,
    /// built-in defaults otherwise.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run provisioning cycles for catalog scenarios.
    Run(RunArgs),

    /// List catalog scenarios.
    List,

    /// Resolve and print the account context.
    Probe,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run one or more catalog scenarios in parallel.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario names to run (all catalog scenarios when omitted).
    pub scenarios: Vec<String>,

    /// Override the directory module paths are resolved against.
    #[arg(long)]
    pub modules_root: Option<PathBuf>,

    /// Override the number of scenarios running at once.
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Override the provisioning tool binary (e.g. `tofu`).
    #[arg(long)]
    pub tool_binary: Option<String>,
}

// ---- config ----

/// Manage terracycle configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tool, retry, probe, runner).
        #[arg(long)]
        section: Option<String>,
    },
}
