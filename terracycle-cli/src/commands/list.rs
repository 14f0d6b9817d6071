//! `terracycle list` command handler

use std::io::Write;

use serde::Serialize;

use terracycle_harness::{Scenario, catalog};

use crate::commands::LoadedConfig;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
pub fn execute(loaded: &LoadedConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let config = loaded.harness_config()?;
    let scenarios = catalog::all()?;
    let report = ListReport::new(&config.modules_root.display().to_string(), &scenarios, |s| {
        config.modules_root.join(s.module_dir()).display().to_string()
    });
    writer.render(&report)
}

/// One catalog scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioEntry {
    pub name: String,
    /// Module directory resolved against the modules root
    pub module_dir: String,
    pub required: Vec<String>,
    pub expectations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_retryable: Vec<String>,
}

/// Scenario listing.
#[derive(Debug, Serialize)]
pub struct ListReport {
    pub modules_root: String,
    pub scenarios: Vec<ScenarioEntry>,
}

impl ListReport {
    pub fn new(
        modules_root: &str,
        scenarios: &[Scenario],
        resolve: impl Fn(&Scenario) -> String,
    ) -> Self {
        Self {
            modules_root: modules_root.to_owned(),
            scenarios: scenarios
                .iter()
                .map(|s| ScenarioEntry {
                    name: s.name().to_owned(),
                    module_dir: resolve(s),
                    required: s.required().to_vec(),
                    expectations: s.expectations().iter().map(ToString::to_string).collect(),
                    extra_retryable: s.extra_retryable().to_vec(),
                })
                .collect(),
        }
    }
}

impl Render for ListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "{} (modules root: {})",
            "Scenarios".bold(),
            self.modules_root
        )?;
        for entry in &self.scenarios {
            writeln!(w)?;
            writeln!(w, "  {}  {}", entry.name.bold(), entry.module_dir)?;
            writeln!(w, "    requires: {}", entry.required.join(", "))?;
            for expectation in &entry.expectations {
                writeln!(w, "    expect:   {expectation}")?;
            }
            if !entry.extra_retryable.is_empty() {
                writeln!(
                    w,
                    "    retries:  {}",
                    entry.extra_retryable.join(", ").dimmed()
                )?;
            }
        }
        writeln!(w)?;
        writeln!(w, "{} scenario(s)", self.scenarios.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ListReport {
        let scenarios = catalog::all().unwrap();
        ListReport::new("/srv/infra", &scenarios, |s| {
            format!("/srv/infra/{}", s.module_dir().display())
        })
    }

    #[test]
    fn test_list_report_covers_catalog() {
        let report = report();
        let names: Vec<&str> = report.scenarios.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, catalog::SCENARIO_NAMES);
        for entry in &report.scenarios {
            assert!(entry.module_dir.starts_with("/srv/infra/"));
            assert!(!entry.expectations.is_empty(), "{}", entry.name);
        }
    }

    #[test]
    fn test_list_report_render_text() {
        let mut buffer = Vec::new();
        report().render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("network"));
        assert!(output.contains("requires: account_id, region, tags"));
        assert!(output.contains("9 scenario(s)"));
    }

    #[test]
    fn test_list_report_json() {
        let json = serde_json::to_value(report()).unwrap();
        let budget = json["scenarios"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == "budget")
            .unwrap();
        assert_eq!(budget["module_dir"], "/srv/infra/modules/budget");
        assert!(budget.get("extra_retryable").is_none());
    }
}
