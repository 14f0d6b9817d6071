//! `terracycle config` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::LoadedConfig;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
pub const SECTIONS: [&str; 5] = ["general", "tool", "retry", "probe", "runner"];

/// Execute the `config` command.
pub fn execute(
    args: ConfigArgs,
    source: String,
    loaded: Result<LoadedConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(source, loaded, writer),
        ConfigAction::Show { section } => execute_show(loaded?, section, writer),
    }
}

/// Execute the config validate subcommand.
///
/// Checks the file itself and the harness settings derived from it,
/// including the retry policy.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
fn execute_validate(
    source: String,
    loaded: Result<LoadedConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source = %source, "validating configuration");

    let errors = match loaded {
        Ok(loaded) => harness_errors(&loaded),
        Err(e) => vec![e.to_string()],
    };
    let report = ConfigValidationReport {
        source,
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

fn harness_errors(loaded: &LoadedConfig) -> Vec<String> {
    match loaded.harness_config() {
        Ok(config) => match config.retry_policy() {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        },
        Err(e) => vec![e.to_string()],
    }
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Command` if the section name is unknown.
fn execute_show(
    loaded: LoadedConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = &loaded.config;
    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("tool") => toml::to_string_pretty(&config.tool),
        Some("retry") => toml::to_string_pretty(&config.retry),
        Some("probe") => toml::to_string_pretty(&config.probe),
        Some("runner") => toml::to_string_pretty(&config.runner),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {})", e));

    let report = ConfigReport {
        source: loaded.source,
        section,
        config_toml,
    };
    writer.render(&report)
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path or `(defaults)`
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
