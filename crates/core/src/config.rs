//! 설정 관리: terracycle.toml 파싱 및 런타임 설정
//!
//! [`TerracycleConfig`]는 하네스 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TERRACYCLE_RETRY_MAX_ATTEMPTS=5` 형식)
//! 3. 설정 파일 (`terracycle.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), terracycle_core::error::TerracycleError> {
//! use terracycle_core::config::TerracycleConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TerracycleConfig::load("terracycle.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TerracycleConfig::parse("[retry]\nmax_attempts = 5")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TerracycleError};

/// terracycle 통합 설정
///
/// `terracycle.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerracycleConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 프로비저닝 도구 설정
    #[serde(default)]
    pub tool: ToolConfig,
    /// 재시도 정책 설정
    #[serde(default)]
    pub retry: RetryConfig,
    /// 계정 컨텍스트 조회 설정
    #[serde(default)]
    pub probe: ProbeConfig,
    /// 시나리오 실행기 설정
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// 재시도 횟수 상한
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
/// 재시도 간격 상한 (초)
pub const MAX_RETRY_DELAY_SECS: u64 = 300;
/// 외부 명령 타임아웃 상한 (초)
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 4 * 3600;
/// 동시 실행 시나리오 상한
pub const MAX_PARALLEL_SCENARIOS: usize = 64;

impl TerracycleConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TerracycleError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TerracycleError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TerracycleError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TerracycleError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TerracycleError> {
        toml::from_str(toml_str).map_err(|e| {
            TerracycleError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TERRACYCLE_{SECTION}_{FIELD}`
    /// 예: `TERRACYCLE_TOOL_BINARY=tofu`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TERRACYCLE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TERRACYCLE_GENERAL_LOG_FORMAT");

        // Tool
        override_string(&mut self.tool.binary, "TERRACYCLE_TOOL_BINARY");
        override_string(&mut self.tool.modules_root, "TERRACYCLE_TOOL_MODULES_ROOT");
        override_u64(
            &mut self.tool.command_timeout_secs,
            "TERRACYCLE_TOOL_COMMAND_TIMEOUT_SECS",
        );

        // Retry
        override_u32(&mut self.retry.max_attempts, "TERRACYCLE_RETRY_MAX_ATTEMPTS");
        override_u64(&mut self.retry.delay_secs, "TERRACYCLE_RETRY_DELAY_SECS");
        override_csv(
            &mut self.retry.extra_retryable_errors,
            "TERRACYCLE_RETRY_EXTRA_RETRYABLE_ERRORS",
        );

        // Probe
        override_string(&mut self.probe.aws_binary, "TERRACYCLE_PROBE_AWS_BINARY");
        override_string(&mut self.probe.region, "TERRACYCLE_PROBE_REGION");
        override_string(&mut self.probe.account_id, "TERRACYCLE_PROBE_ACCOUNT_ID");
        override_u64(&mut self.probe.timeout_secs, "TERRACYCLE_PROBE_TIMEOUT_SECS");

        // Runner
        override_usize(&mut self.runner.max_parallel, "TERRACYCLE_RUNNER_MAX_PARALLEL");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TerracycleError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.tool.binary.trim().is_empty() {
            return Err(invalid("tool.binary", "must not be empty".to_owned()));
        }

        if self.tool.command_timeout_secs == 0
            || self.tool.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            return Err(invalid(
                "tool.command_timeout_secs",
                format!("must be 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(invalid(
                "retry.max_attempts",
                format!("must be 1-{MAX_RETRY_ATTEMPTS}"),
            ));
        }

        if self.retry.delay_secs > MAX_RETRY_DELAY_SECS {
            return Err(invalid(
                "retry.delay_secs",
                format!("must be 0-{MAX_RETRY_DELAY_SECS}"),
            ));
        }

        if self
            .retry
            .extra_retryable_errors
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(invalid(
                "retry.extra_retryable_errors",
                "signatures must not be empty".to_owned(),
            ));
        }

        if self.probe.region.trim().is_empty() {
            return Err(invalid("probe.region", "must not be empty".to_owned()));
        }

        // 정적 계정 ID가 없으면 aws CLI로 조회해야 함
        if self.probe.account_id.is_empty() && self.probe.aws_binary.trim().is_empty() {
            return Err(invalid(
                "probe.aws_binary",
                "must not be empty when probe.account_id is unset".to_owned(),
            ));
        }

        if !self.probe.account_id.is_empty()
            && !self.probe.account_id.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid(
                "probe.account_id",
                "must contain only digits".to_owned(),
            ));
        }

        if self.probe.timeout_secs == 0 {
            return Err(invalid(
                "probe.timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.runner.max_parallel == 0 || self.runner.max_parallel > MAX_PARALLEL_SCENARIOS {
            return Err(invalid(
                "runner.max_parallel",
                format!("must be 1-{MAX_PARALLEL_SCENARIOS}"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> TerracycleError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 프로비저닝 도구 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// 도구 실행 파일 (PATH 검색 또는 절대 경로)
    pub binary: String,
    /// 모듈 디렉토리의 기준 경로
    pub modules_root: String,
    /// 외부 명령 1회 실행 타임아웃 (초)
    pub command_timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_owned(),
            modules_root: ".".to_owned(),
            command_timeout_secs: 1800,
        }
    }
}

/// 재시도 정책 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 시도 간 고정 대기 시간 (초)
    pub delay_secs: u64,
    /// 기본 목록에 추가할 재시도 가능 에러 문자열
    pub extra_retryable_errors: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
            extra_retryable_errors: Vec::new(),
        }
    }
}

/// 계정 컨텍스트 조회 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// aws CLI 실행 파일
    pub aws_binary: String,
    /// 대상 리전
    pub region: String,
    /// 고정 계정 ID (비어 있으면 aws CLI로 조회)
    pub account_id: String,
    /// 조회 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            aws_binary: "aws".to_owned(),
            region: "us-east-1".to_owned(),
            account_id: String::new(),
            timeout_secs: 30,
        }
    }
}

/// 시나리오 실행기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 동시에 실행할 최대 시나리오 수
    pub max_parallel: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = TerracycleConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.tool.binary, "terraform");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_secs, 5);
        assert_eq!(config.probe.region, "us-east-1");
        assert!(config.probe.account_id.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        TerracycleConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = TerracycleConfig::parse("").unwrap();
        assert_eq!(config.tool.command_timeout_secs, 1800);
        assert_eq!(config.runner.max_parallel, 4);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[retry]
max_attempts = 5

[probe]
account_id = "123456789012"
"#;
        let config = TerracycleConfig::parse(toml).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        // delay_secs는 기본값 유지
        assert_eq!(config.retry.delay_secs, 5);
        assert_eq!(config.probe.account_id, "123456789012");
        assert_eq!(config.probe.region, "us-east-1");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[tool]
binary = "/usr/local/bin/terraform"
modules_root = "/work/landing-zone"
command_timeout_secs = 900

[retry]
max_attempts = 4
delay_secs = 10
extra_retryable_errors = ["Error applying plan"]

[probe]
aws_binary = "aws2"
region = "eu-west-1"
account_id = ""
timeout_secs = 15

[runner]
max_parallel = 8
"#;
        let config = TerracycleConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.tool.modules_root, "/work/landing-zone");
        assert_eq!(config.retry.extra_retryable_errors, vec!["Error applying plan"]);
        assert_eq!(config.probe.region, "eu-west-1");
        assert_eq!(config.runner.max_parallel, 8);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = TerracycleConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            TerracycleError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = TerracycleConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = TerracycleConfig::default();
        config.retry.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn validate_rejects_too_many_attempts() {
        let mut config = TerracycleConfig::default();
        config.retry.max_attempts = MAX_RETRY_ATTEMPTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_delay() {
        let mut config = TerracycleConfig::default();
        config.retry.delay_secs = MAX_RETRY_DELAY_SECS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("delay_secs"));
    }

    #[test]
    fn validate_rejects_blank_retry_signature() {
        let mut config = TerracycleConfig::default();
        config.retry.extra_retryable_errors = vec!["  ".to_owned()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_numeric_account_id() {
        let mut config = TerracycleConfig::default();
        config.probe.account_id = "acct-123".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("account_id"));
    }

    #[test]
    fn validate_requires_aws_binary_without_static_account() {
        let mut config = TerracycleConfig::default();
        config.probe.aws_binary = String::new();
        assert!(config.validate().is_err());

        // 정적 계정 ID가 있으면 aws 바이너리가 없어도 됨
        config.probe.account_id = "123456789012".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let mut config = TerracycleConfig::default();
        config.runner.max_parallel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_command_timeout() {
        let mut config = TerracycleConfig::default();
        config.tool.command_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("command_timeout_secs"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe { std::env::set_var("TEST_TERRACYCLE_STR", "overridden") };
        override_string(&mut val, "TEST_TERRACYCLE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_TERRACYCLE_STR") };
    }

    #[test]
    #[serial]
    fn env_override_u32_invalid_keeps_original() {
        let mut val = 3u32;
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe { std::env::set_var("TEST_TERRACYCLE_U32_BAD", "three") };
        override_u32(&mut val, "TEST_TERRACYCLE_U32_BAD");
        assert_eq!(val, 3); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_TERRACYCLE_U32_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_empty_entries() {
        let mut val = Vec::new();
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe { std::env::set_var("TEST_TERRACYCLE_CSV", "Throttling, ,RequestLimitExceeded") };
        override_csv(&mut val, "TEST_TERRACYCLE_CSV");
        assert_eq!(val, vec!["Throttling", "RequestLimitExceeded"]);
        unsafe { std::env::remove_var("TEST_TERRACYCLE_CSV") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_updates_sections() {
        let mut config = TerracycleConfig::default();
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe {
            std::env::set_var("TERRACYCLE_TOOL_BINARY", "tofu");
            std::env::set_var("TERRACYCLE_RUNNER_MAX_PARALLEL", "2");
        }
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("TERRACYCLE_TOOL_BINARY");
            std::env::remove_var("TERRACYCLE_RUNNER_MAX_PARALLEL");
        }
        assert_eq!(config.tool.binary, "tofu");
        assert_eq!(config.runner.max_parallel, 2);
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 42u64;
        override_u64(&mut val, "TEST_TERRACYCLE_NONEXISTENT_12345");
        assert_eq!(val, 42);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = TerracycleConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = TerracycleConfig::parse(&toml_str).unwrap();
        assert_eq!(config.tool.binary, parsed.tool.binary);
        assert_eq!(config.retry.max_attempts, parsed.retry.max_attempts);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = TerracycleConfig::from_file("/nonexistent/path/terracycle.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TerracycleError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
