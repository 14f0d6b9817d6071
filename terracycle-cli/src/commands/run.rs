//! `terracycle run` command handler

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use terracycle_harness::{
    ConfiguredProbe, CycleReport, HarnessConfig, MemoizedProbe, ProvisioningCycle, RunSummary,
    Scenario, ScenarioRunner, TerraformCli, catalog,
};

use crate::cli::RunArgs;
use crate::commands::LoadedConfig;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, format_duration, truncate};

/// Execute the `run` command.
///
/// Runs the selected catalog scenarios and renders one row per scenario.
///
/// # Errors
///
/// * `CliError::Config` - invalid configuration or CLI overrides
/// * `CliError::Command` - unknown scenario name, or a second interrupt
/// * `CliError::ScenarioFailures` - at least one scenario failed
pub async fn execute(
    args: RunArgs,
    loaded: &LoadedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = effective_config(&args, loaded)?;
    let scenarios = select_scenarios(&args.scenarios)?;
    let policy = config.retry_policy()?;

    info!(
        source = %loaded.source,
        scenarios = scenarios.len(),
        max_parallel = config.max_parallel,
        tool = %config.tool_binary,
        "starting run"
    );

    let cycle = ProvisioningCycle::new(
        Arc::new(TerraformCli::new(config.tool_binary.clone())),
        MemoizedProbe::new(ConfiguredProbe::from_config(&config)),
        Arc::new(policy),
        config.command_timeout(),
    )
    .with_modules_root(config.modules_root.clone());
    let runner = ScenarioRunner::new(cycle, config.max_parallel);

    let summary = run_until_done(&runner, scenarios).await?;
    let report = RunReport::from_summary(&config, &summary);
    writer.render(&report)?;

    if summary.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenarioFailures {
            failed: summary.failed,
            total: summary.reports.len(),
        })
    }
}

/// Apply CLI overrides on top of the loaded configuration.
pub fn effective_config(args: &RunArgs, loaded: &LoadedConfig) -> Result<HarnessConfig, CliError> {
    let mut config = HarnessConfig::from_core(&loaded.config);
    if let Some(root) = &args.modules_root {
        config.modules_root = root.clone();
    }
    if let Some(max_parallel) = args.max_parallel {
        config.max_parallel = max_parallel;
    }
    if let Some(binary) = &args.tool_binary {
        config.tool_binary = binary.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Build the requested scenarios (every catalog scenario when `names` is empty).
///
/// Duplicate names run once.
pub fn select_scenarios(names: &[String]) -> Result<Vec<Scenario>, CliError> {
    if names.is_empty() {
        return Ok(catalog::all()?);
    }
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(*name))
        .map(|name| catalog::by_name(name).map_err(CliError::from))
        .collect()
}

/// Wait for the run to finish.
///
/// The first Ctrl-C only warns: in-flight cycles still destroy what they
/// created. A second Ctrl-C drops the run.
async fn run_until_done(
    runner: &ScenarioRunner<TerraformCli, MemoizedProbe<ConfiguredProbe>>,
    scenarios: Vec<Scenario>,
) -> Result<RunSummary, CliError> {
    let run = runner.run_all(scenarios);
    tokio::pin!(run);
    let mut interrupted = false;

    loop {
        tokio::select! {
            summary = &mut run => return Ok(summary),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "cannot listen for interrupts");
                    return Ok((&mut run).await);
                }
                if interrupted {
                    return Err(CliError::Command(
                        "interrupted again, run aborted; infrastructure may be orphaned".to_owned(),
                    ));
                }
                interrupted = true;
                warn!("interrupt received, waiting for running cycles to destroy (Ctrl-C again to abort)");
            }
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub cycle_id: String,
    pub passed: bool,
    pub final_state: String,
    pub apply_attempts: u32,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
}

impl From<&CycleReport> for ScenarioResult {
    fn from(report: &CycleReport) -> Self {
        Self {
            scenario: report.scenario.clone(),
            cycle_id: report.cycle_id.to_string(),
            passed: report.passed(),
            final_state: report.final_state.to_string(),
            apply_attempts: report.apply_attempts,
            duration_secs: report.duration.as_secs_f64(),
            failure_phase: report.failure.as_ref().map(|f| f.phase.to_string()),
            failure: report.failure.as_ref().map(|f| f.message.clone()),
            cleanup_error: report.cleanup_error.clone(),
        }
    }
}

/// Run report.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub modules_root: String,
    pub max_parallel: usize,
    pub passed: usize,
    pub failed: usize,
    pub scenarios: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn from_summary(config: &HarnessConfig, summary: &RunSummary) -> Self {
        Self {
            modules_root: config.modules_root.display().to_string(),
            max_parallel: config.max_parallel,
            passed: summary.passed,
            failed: summary.failed,
            scenarios: summary.reports.iter().map(ScenarioResult::from).collect(),
        }
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "{} (modules root: {}, parallel: {})",
            "Run Results".bold(),
            self.modules_root,
            self.max_parallel
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "  {:<20} {:<6} {:<16} {:>8} {:>9}  {}",
            "SCENARIO", "RESULT", "STATE", "ATTEMPTS", "DURATION", "FAILURE"
        )?;
        writeln!(w, "  {}", "-".repeat(90))?;

        for s in &self.scenarios {
            let result = if s.passed {
                format!("{:<6}", "PASS").green()
            } else {
                format!("{:<6}", "FAIL").red().bold()
            };
            let failure = match (&s.failure_phase, &s.failure) {
                (Some(phase), Some(message)) => format!("[{phase}] {}", truncate(message, 60)),
                _ => "-".to_owned(),
            };
            writeln!(
                w,
                "  {:<20} {} {:<16} {:>8} {:>9}  {}",
                s.scenario,
                result,
                s.final_state,
                s.apply_attempts,
                format_duration(Duration::from_secs_f64(s.duration_secs)),
                failure
            )?;
            if let Some(cleanup) = &s.cleanup_error {
                writeln!(
                    w,
                    "  {:<20} {}",
                    "",
                    format!("cleanup: {}", truncate(cleanup, 80)).yellow()
                )?;
            }
        }

        writeln!(w)?;
        let total = self.passed + self.failed;
        let summary = format!("{} of {} scenario(s) passed", self.passed, total);
        if self.failed == 0 {
            writeln!(w, "{}", summary.green().bold())?;
        } else {
            writeln!(w, "{}", summary.red().bold())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use terracycle_core::config::TerracycleConfig;

    fn loaded() -> LoadedConfig {
        LoadedConfig {
            config: TerracycleConfig::default(),
            source: "(defaults)".to_owned(),
        }
    }

    fn args(scenarios: &[&str]) -> RunArgs {
        RunArgs {
            scenarios: scenarios.iter().map(|s| (*s).to_owned()).collect(),
            modules_root: None,
            max_parallel: None,
            tool_binary: None,
        }
    }

    fn result(name: &str, failure: Option<(&str, &str)>, cleanup: Option<&str>) -> ScenarioResult {
        ScenarioResult {
            scenario: name.to_owned(),
            cycle_id: "00000000-0000-0000-0000-000000000000".to_owned(),
            passed: failure.is_none(),
            final_state: "destroyed".to_owned(),
            apply_attempts: 1,
            duration_secs: 12.5,
            failure_phase: failure.map(|(p, _)| p.to_owned()),
            failure: failure.map(|(_, m)| m.to_owned()),
            cleanup_error: cleanup.map(str::to_owned),
        }
    }

    #[test]
    fn test_effective_config_applies_overrides() {
        let mut run_args = args(&[]);
        run_args.modules_root = Some(PathBuf::from("/srv/infra"));
        run_args.max_parallel = Some(2);
        run_args.tool_binary = Some("tofu".to_owned());

        let config = effective_config(&run_args, &loaded()).unwrap();
        assert_eq!(config.modules_root, PathBuf::from("/srv/infra"));
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.tool_binary, "tofu");
    }

    #[test]
    fn test_effective_config_rejects_zero_parallel() {
        let mut run_args = args(&[]);
        run_args.max_parallel = Some(0);
        let err = effective_config(&run_args, &loaded()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_select_all_scenarios_when_none_named() {
        let scenarios = select_scenarios(&[]).unwrap();
        assert_eq!(scenarios.len(), catalog::SCENARIO_NAMES.len());
    }

    #[test]
    fn test_select_scenarios_dedups_in_order() {
        let names = ["budget", "network", "budget"].map(str::to_owned);
        let scenarios = select_scenarios(&names).unwrap();
        let selected: Vec<&str> = scenarios.iter().map(|s| s.name()).collect();
        assert_eq!(selected, ["budget", "network"]);
    }

    #[test]
    fn test_select_unknown_scenario() {
        let err = select_scenarios(&["nope".to_owned()]).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("available: network"));
    }

    #[test]
    fn test_run_report_render_text() {
        let report = RunReport {
            modules_root: "/srv/infra".to_owned(),
            max_parallel: 4,
            passed: 1,
            failed: 1,
            scenarios: vec![
                result("budget", None, None),
                result(
                    "identity",
                    Some(("assert", "assertion failed for output 'role_arn': value is empty")),
                    Some("destroy failed after 3 attempt(s): DependencyViolation"),
                ),
            ],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("budget"));
        assert!(output.contains("PASS"));
        assert!(output.contains("FAIL"));
        assert!(output.contains("[assert]"));
        assert!(output.contains("cleanup: destroy failed"));
        assert!(output.contains("1 of 2 scenario(s) passed"));
    }

    #[test]
    fn test_run_report_json_skips_empty_failure() {
        let report = RunReport {
            modules_root: ".".to_owned(),
            max_parallel: 1,
            passed: 1,
            failed: 0,
            scenarios: vec![result("budget", None, None)],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenarios"][0]["passed"], true);
        assert!(json["scenarios"][0].get("failure").is_none());
        assert!(json["scenarios"][0].get("cleanup_error").is_none());
    }
}
