//! Integration tests -- CLI command handlers
//!
//! Drives the library entry points with temporary config files and, on
//! unix, a fake `terraform` shell script.

use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use terracycle_cli::cli::{ConfigAction, ConfigArgs, OutputFormat, RunArgs};
use terracycle_cli::commands::{self, LoadedConfig, load_config};
use terracycle_cli::output::OutputWriter;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("terracycle.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn json_writer() -> OutputWriter {
    OutputWriter::new(OutputFormat::Json)
}

/// 명시한 설정 파일을 읽고 출처를 기록
#[tokio::test]
#[serial]
async fn test_load_explicit_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[tool]
binary = "tofu"

[runner]
max_parallel = 2
"#,
    );

    let loaded = load_config(Some(&path)).await.unwrap();
    assert_eq!(loaded.source, path.display().to_string());
    assert_eq!(loaded.config.tool.binary, "tofu");
    assert_eq!(loaded.config.runner.max_parallel, 2);
    assert_eq!(loaded.config.retry.max_attempts, 3);
}

/// 없는 설정 파일을 명시하면 설정 에러
#[tokio::test]
#[serial]
async fn test_missing_explicit_config_is_config_error() {
    let err = load_config(Some(Path::new("/definitely/not/terracycle.toml")))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

/// 잘못된 값은 로드 단계에서 거부
#[tokio::test]
#[serial]
async fn test_invalid_config_values_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[probe]
account_id = "not-a-number"
"#,
    );

    let err = load_config(Some(&path)).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("probe.account_id"));
}

/// 환경변수가 파일 값보다 우선
#[tokio::test]
#[serial]
async fn test_env_override_applies_to_loaded_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[runner]\nmax_parallel = 2\n");

    let original = std::env::var("TERRACYCLE_RUNNER_MAX_PARALLEL").ok();
    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TERRACYCLE_RUNNER_MAX_PARALLEL", "8");
    }

    let result = load_config(Some(&path)).await;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TERRACYCLE_RUNNER_MAX_PARALLEL", val),
            None => std::env::remove_var("TERRACYCLE_RUNNER_MAX_PARALLEL"),
        }
    }

    assert_eq!(result.unwrap().config.runner.max_parallel, 8);
}

/// config validate는 로드 실패를 보고하고 종료 코드 2
#[tokio::test]
#[serial]
async fn test_config_validate_reports_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[retry]\nmax_attempts = \"three\"\n");

    let loaded = load_config(Some(&path)).await;
    let err = commands::execute(
        terracycle_cli::cli::Commands::Config(ConfigArgs {
            action: ConfigAction::Validate,
        }),
        Some(&path),
        loaded,
        &json_writer(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

/// 정적 계정 ID가 있으면 aws CLI 없이 probe 성공
#[tokio::test]
#[serial]
async fn test_probe_with_static_account() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[probe]
account_id = "123456789012"
region = "eu-central-1"
aws_binary = "/definitely/not/aws"
"#,
    );

    let loaded = load_config(Some(&path)).await.unwrap();
    commands::probe::execute(&loaded, &json_writer())
        .await
        .unwrap();
}

/// 계정 조회 실패는 종료 코드 3
#[tokio::test]
#[serial]
async fn test_probe_failure_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[probe]
aws_binary = "/definitely/not/aws"
timeout_secs = 5
"#,
    );

    let loaded = load_config(Some(&path)).await.unwrap();
    let err = commands::probe::execute(&loaded, &json_writer())
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[cfg(unix)]
mod run_command {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const BUDGET_OUTPUTS: &str = r#"{"budget_id":{"sensitive":false,"type":"string","value":"budget-1"},"budget_arn":{"sensitive":false,"type":"string","value":"arn:aws:budgets::123456789012:budget/budget-1"},"sns_topic_arn":{"sensitive":false,"type":"string","value":"arn:aws:sns:us-east-1:123456789012:budget-alerts"}}"#;

    /// 임시 디렉토리의 가짜 terraform과 모듈 디렉토리
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let binary = dir.path().join("terraform");
            let script = format!(
                r#"#!/bin/sh
echo "$*" >> '{log}'
case "$1" in
  output) printf '%s' '{outputs}' ;;
esac
"#,
                log = dir.path().join("calls.log").display(),
                outputs = BUDGET_OUTPUTS,
            );
            std::fs::write(&binary, script).unwrap();
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

            for module in ["modules/budget", "modules/landing_zone/vpc"] {
                std::fs::create_dir_all(dir.path().join(module)).unwrap();
            }
            Self { dir }
        }

        fn loaded(&self) -> LoadedConfig {
            let body = format!(
                r#"
[tool]
binary = "{binary}"
modules_root = "{root}"
command_timeout_secs = 30

[retry]
max_attempts = 1
delay_secs = 0

[probe]
account_id = "123456789012"
"#,
                binary = self.dir.path().join("terraform").display(),
                root = self.dir.path().display(),
            );
            let mut config = terracycle_core::config::TerracycleConfig::parse(&body).unwrap();
            config.validate().unwrap();
            LoadedConfig {
                config,
                source: "test".to_owned(),
            }
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_owned)
                .collect()
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

    /// 기대 출력이 모두 맞으면 성공, destroy까지 실행
    #[tokio::test]
    async fn test_run_budget_scenario_passes() {
        let ws = Workspace::new();
        commands::run::execute(args(&["budget"]), &ws.loaded(), &json_writer())
            .await
            .unwrap();

        let calls = ws.calls();
        let subcommands: Vec<&str> = calls
            .iter()
            .filter_map(|c| c.split_whitespace().next())
            .collect();
        assert_eq!(subcommands, ["init", "apply", "output", "destroy"]);
        assert!(calls[1].contains("-var account_id=123456789012"));
    }

    /// 하나라도 실패하면 종료 코드 4, 실패한 시나리오도 destroy
    #[tokio::test]
    async fn test_run_with_failing_scenario_exit_code() {
        let ws = Workspace::new();
        let err = commands::run::execute(
            args(&["budget", "network"]),
            &ws.loaded(),
            &json_writer(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "1 of 2 scenario(s) failed");
        let destroys = ws
            .calls()
            .iter()
            .filter(|c| c.starts_with("destroy "))
            .count();
        assert_eq!(destroys, 2);
    }

    /// 알 수 없는 시나리오는 아무것도 실행하지 않음
    #[tokio::test]
    async fn test_run_unknown_scenario() {
        let ws = Workspace::new();
        let err = commands::run::execute(args(&["nope"]), &ws.loaded(), &json_writer())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(ws.calls().is_empty());
    }
}
