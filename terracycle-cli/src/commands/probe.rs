//! `terracycle probe` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use terracycle_core::types::AccountContext;
use terracycle_harness::{AccountProbe, ConfiguredProbe};

use crate::commands::LoadedConfig;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `probe` command.
///
/// Resolves the account context exactly as `run` would.
///
/// # Errors
///
/// Returns `CliError::Probe` when the account cannot be resolved.
pub async fn execute(loaded: &LoadedConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let config = loaded.harness_config()?;
    let probe = ConfiguredProbe::from_config(&config);
    let source = match &probe {
        ConfiguredProbe::Static(_) => ProbeSource::Static,
        ConfiguredProbe::AwsCli(_) => ProbeSource::AwsCli,
    };

    let context = probe.resolve_account_context().await?;
    info!(account = %context.account_id, region = %context.region, "account context resolved");

    writer.render(&ProbeReport::new(context, source))
}

/// Where the account context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeSource {
    /// `probe.account_id` in the configuration
    Static,
    /// `aws sts get-caller-identity`
    AwsCli,
}

/// Account probe report.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub account_id: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_arn: Option<String>,
    pub source: ProbeSource,
}

impl ProbeReport {
    pub fn new(context: AccountContext, source: ProbeSource) -> Self {
        Self {
            account_id: context.account_id,
            region: context.region,
            caller_arn: context.caller_arn,
            source,
        }
    }
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let source = match self.source {
            ProbeSource::Static => "static",
            ProbeSource::AwsCli => "aws-cli",
        };
        writeln!(w, "{}", "Account Context".bold())?;
        writeln!(w, "  Account: {}", self.account_id.green())?;
        writeln!(w, "  Region:  {}", self.region)?;
        if let Some(arn) = &self.caller_arn {
            writeln!(w, "  Caller:  {arn}")?;
        }
        writeln!(w, "  Source:  {source}")?;
        Ok(())
    }
}
