//! 하네스 설정
//!
//! [`HarnessConfig`]는 core의 [`TerracycleConfig`]에서 하네스가 쓰는 값만 골라
//! 평탄화한 설정입니다.
//!
//! # 사용 예시
//! ```
//! use terracycle_core::config::TerracycleConfig;
//! use terracycle_harness::config::HarnessConfig;
//!
//! let core_config = TerracycleConfig::default();
//! let config = HarnessConfig::from_core(&core_config);
//! assert_eq!(config.max_attempts, 3);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use terracycle_core::config::{
    MAX_COMMAND_TIMEOUT_SECS, MAX_PARALLEL_SCENARIOS, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_SECS,
    TerracycleConfig,
};

use crate::error::HarnessError;
use crate::retry::{DEFAULT_RETRYABLE_ERRORS, RetryPolicy};

/// 하네스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 프로비저닝 도구 실행 파일
    pub tool_binary: String,
    /// 모듈 디렉토리 기준 경로
    pub modules_root: PathBuf,
    /// 외부 명령 1회 실행 타임아웃 (초)
    pub command_timeout_secs: u64,
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 간 대기 시간 (초)
    pub retry_delay_secs: u64,
    /// 기본 목록에 추가할 재시도 가능 에러 문자열
    pub extra_retryable_errors: Vec<String>,
    /// aws CLI 실행 파일
    pub aws_binary: String,
    /// 대상 리전
    pub region: String,
    /// 고정 계정 ID (`None`이면 aws CLI로 조회)
    pub account_id: Option<String>,
    /// 계정 조회 타임아웃 (초)
    pub probe_timeout_secs: u64,
    /// 동시 실행 시나리오 수
    pub max_parallel: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_core(&TerracycleConfig::default())
    }
}

impl HarnessConfig {
    /// core 설정에서 하네스 설정을 생성합니다.
    pub fn from_core(core: &TerracycleConfig) -> Self {
        let account_id = if core.probe.account_id.is_empty() {
            None
        } else {
            Some(core.probe.account_id.clone())
        };

        Self {
            tool_binary: core.tool.binary.clone(),
            modules_root: PathBuf::from(&core.tool.modules_root),
            command_timeout_secs: core.tool.command_timeout_secs,
            max_attempts: core.retry.max_attempts,
            retry_delay_secs: core.retry.delay_secs,
            extra_retryable_errors: core.retry.extra_retryable_errors.clone(),
            aws_binary: core.probe.aws_binary.clone(),
            region: core.probe.region.clone(),
            account_id,
            probe_timeout_secs: core.probe.timeout_secs,
            max_parallel: core.runner.max_parallel,
        }
    }

    /// 외부 명령 타임아웃
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// 계정 조회 타임아웃
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// 설정값으로 기본 재시도 정책을 생성합니다.
    ///
    /// 기본 에러 문자열 목록 뒤에 설정의 추가 문자열이 붙습니다.
    pub fn retry_policy(&self) -> Result<RetryPolicy, HarnessError> {
        let signatures = DEFAULT_RETRYABLE_ERRORS
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        let base = RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.retry_delay_secs),
            signatures,
        )?;
        Ok(base.with_extra_signatures(self.extra_retryable_errors.iter().cloned()))
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.tool_binary.trim().is_empty() {
            return Err(config_err("tool_binary", "must not be empty".to_owned()));
        }

        if self.command_timeout_secs == 0 || self.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS {
            return Err(config_err(
                "command_timeout_secs",
                format!("must be 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }

        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(config_err(
                "max_attempts",
                format!("must be 1-{MAX_RETRY_ATTEMPTS}"),
            ));
        }

        if self.retry_delay_secs > MAX_RETRY_DELAY_SECS {
            return Err(config_err(
                "retry_delay_secs",
                format!("must be 0-{MAX_RETRY_DELAY_SECS}"),
            ));
        }

        if self.max_parallel == 0 || self.max_parallel > MAX_PARALLEL_SCENARIOS {
            return Err(config_err(
                "max_parallel",
                format!("must be 1-{MAX_PARALLEL_SCENARIOS}"),
            ));
        }

        if self.region.trim().is_empty() {
            return Err(config_err("region", "must not be empty".to_owned()));
        }

        if self.probe_timeout_secs == 0 {
            return Err(config_err(
                "probe_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.account_id.is_none() && self.aws_binary.trim().is_empty() {
            return Err(config_err(
                "aws_binary",
                "must not be empty when account_id is unset".to_owned(),
            ));
        }

        Ok(())
    }
}

fn config_err(field: &str, reason: String) -> HarnessError {
    HarnessError::Config {
        field: field.to_owned(),
        reason,
    }
}

/// 하네스 설정 빌더
#[derive(Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 도구 실행 파일을 설정합니다.
    pub fn tool_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.tool_binary = binary.into();
        self
    }

    /// 모듈 기준 경로를 설정합니다.
    pub fn modules_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.modules_root = root.into();
        self
    }

    /// 외부 명령 타임아웃(초)을 설정합니다.
    pub fn command_timeout_secs(mut self, secs: u64) -> Self {
        self.config.command_timeout_secs = secs;
        self
    }

    /// 최대 시도 횟수를 설정합니다.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// 시도 간 대기 시간(초)을 설정합니다.
    pub fn retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.retry_delay_secs = secs;
        self
    }

    /// 재시도 가능 에러 문자열을 추가합니다.
    pub fn extra_retryable_error(mut self, signature: impl Into<String>) -> Self {
        self.config.extra_retryable_errors.push(signature.into());
        self
    }

    /// aws CLI 실행 파일을 설정합니다.
    pub fn aws_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.aws_binary = binary.into();
        self
    }

    /// 리전을 설정합니다.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    /// 고정 계정 ID를 설정합니다.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.config.account_id = Some(account_id.into());
        self
    }

    /// 동시 실행 시나리오 수를 설정합니다.
    pub fn max_parallel(mut self, max: usize) -> Self {
        self.config.max_parallel = max;
        self
    }

    /// 설정을 검증하고 `HarnessConfig`를 생성합니다.
    pub fn build(self) -> Result<HarnessConfig, HarnessError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        HarnessConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = TerracycleConfig::default();
        core.tool.binary = "tofu".to_owned();
        core.tool.modules_root = "/work/infra".to_owned();
        core.retry.max_attempts = 5;
        core.retry.extra_retryable_errors = vec!["Error applying plan".to_owned()];
        core.probe.account_id = "123456789012".to_owned();
        core.runner.max_parallel = 2;

        let config = HarnessConfig::from_core(&core);
        assert_eq!(config.tool_binary, "tofu");
        assert_eq!(config.modules_root, PathBuf::from("/work/infra"));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.account_id.as_deref(), Some("123456789012"));
        assert_eq!(config.max_parallel, 2);
    }

    #[test]
    fn from_core_empty_account_id_is_none() {
        let config = HarnessConfig::from_core(&TerracycleConfig::default());
        assert!(config.account_id.is_none());
    }

    #[test]
    fn retry_policy_includes_extra_signatures() {
        let config = HarnessConfigBuilder::new()
            .extra_retryable_error("Error applying plan")
            .build()
            .unwrap();
        let policy = config.retry_policy().unwrap();
        assert!(policy.classify("Error applying plan").is_transient());
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn builder_sets_all_fields() {
        let config = HarnessConfigBuilder::new()
            .tool_binary("/opt/terraform")
            .modules_root("/srv/modules")
            .command_timeout_secs(600)
            .max_attempts(2)
            .retry_delay_secs(0)
            .aws_binary("aws2")
            .region("eu-central-1")
            .account_id("000011112222")
            .max_parallel(16)
            .build()
            .unwrap();
        assert_eq!(config.command_timeout(), Duration::from_secs(600));
        assert_eq!(config.retry_delay_secs, 0);
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.max_parallel, 16);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let result = HarnessConfigBuilder::new().command_timeout_secs(0).build();
        assert!(matches!(result, Err(HarnessError::Config { .. })));
    }

    #[test]
    fn builder_rejects_excessive_parallelism() {
        assert!(
            HarnessConfigBuilder::new()
                .max_parallel(MAX_PARALLEL_SCENARIOS + 1)
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_excessive_attempts() {
        let err = HarnessConfigBuilder::new()
            .max_attempts(MAX_RETRY_ATTEMPTS + 1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn empty_aws_binary_allowed_with_static_account() {
        HarnessConfigBuilder::new()
            .aws_binary("")
            .account_id("123456789012")
            .build()
            .unwrap();
        assert!(HarnessConfigBuilder::new().aws_binary("").build().is_err());
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = HarnessConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.tool_binary, parsed.tool_binary);
        assert_eq!(config.max_parallel, parsed.max_parallel);
    }
}
