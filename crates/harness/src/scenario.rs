//! 시나리오 정의
//!
//! [`Scenario`]는 한 번의 프로비저닝 사이클에 필요한 입력 전부입니다.
//! 빌드 후에는 변경할 수 없고 태스크 사이에서 `Arc`로 공유됩니다.
//! 계정 정보(`account_id`, `region`)는 시나리오가 아니라 사이클이 probe 결과로
//! 기본값 앞에 채워 넣습니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use terracycle_core::types::{ParamValue, ParameterSet};

use crate::assertions::ExpectedOutput;
use crate::error::HarnessError;
use crate::output::OutputSet;

type CheckFn = dyn Fn(&OutputSet) -> Result<(), String> + Send + Sync;

/// 선언형 기대 조건으로 표현하기 어려운 검사
///
/// 함수가 `Err`를 반환하거나 panic하면 assert 단계 실패로 처리됩니다.
#[derive(Clone)]
pub struct CustomCheck {
    name: String,
    func: Arc<CheckFn>,
}

impl CustomCheck {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OutputSet) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, outputs: &OutputSet) -> Result<(), String> {
        (self.func)(outputs)
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// 프로비저닝 사이클 하나의 입력
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    name: String,
    module_dir: PathBuf,
    base: ParameterSet,
    overrides: ParameterSet,
    required: Vec<String>,
    expectations: Vec<ExpectedOutput>,
    extra_retryable: Vec<String>,
    #[serde(skip)]
    custom_checks: Vec<CustomCheck>,
}

impl Scenario {
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new().name(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    pub fn base(&self) -> &ParameterSet {
        &self.base
    }

    pub fn overrides(&self) -> &ParameterSet {
        &self.overrides
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn expectations(&self) -> &[ExpectedOutput] {
        &self.expectations
    }

    /// 이 시나리오에서만 일시적으로 취급할 에러 시그니처
    pub fn extra_retryable(&self) -> &[String] {
        &self.extra_retryable
    }

    pub fn custom_checks(&self) -> &[CustomCheck] {
        &self.custom_checks
    }
}

/// [`Scenario`] 빌더
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    name: Option<String>,
    module_dir: Option<PathBuf>,
    base: ParameterSet,
    overrides: ParameterSet,
    required: Vec<String>,
    expectations: Vec<ExpectedOutput>,
    extra_retryable: Vec<String>,
    custom_checks: Vec<CustomCheck>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn module_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.module_dir = Some(dir.into());
        self
    }

    /// 기본 파라미터 하나를 추가합니다.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.base.insert(key, value);
        self
    }

    /// 기본값 위에 덮어쓸 파라미터를 추가합니다.
    pub fn override_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.overrides.insert(key, value);
        self
    }

    pub fn overrides(mut self, overrides: ParameterSet) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.required.contains(&key) {
            self.required.push(key);
        }
        self
    }

    pub fn require_all<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter().fold(self, |builder, key| builder.require(key))
    }

    pub fn expect(mut self, expected: ExpectedOutput) -> Self {
        self.expectations.push(expected);
        self
    }

    pub fn retry_on(mut self, signature: impl Into<String>) -> Self {
        self.extra_retryable.push(signature.into());
        self
    }

    pub fn check<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OutputSet) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom_checks.push(CustomCheck::new(name, func));
        self
    }

    /// 시나리오를 빌드합니다.
    ///
    /// 이름과 모듈 디렉토리는 필수이며, 기대 조건은 형태와 조건의 조합이
    /// 유효해야 합니다.
    pub fn build(self) -> Result<Scenario, HarnessError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| HarnessError::Scenario("scenario name is required".to_owned()))?;

        let module_dir = self
            .module_dir
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or_else(|| {
                HarnessError::Scenario(format!("scenario '{name}' has no module directory"))
            })?;

        for expected in &self.expectations {
            expected.validate().map_err(|e| {
                HarnessError::Scenario(format!("scenario '{name}': {e}"))
            })?;
        }

        if self.extra_retryable.iter().any(|s| s.trim().is_empty()) {
            return Err(HarnessError::Scenario(format!(
                "scenario '{name}' has a blank retryable error signature"
            )));
        }

        Ok(Scenario {
            name,
            module_dir,
            base: self.base,
            overrides: self.overrides,
            required: self.required,
            expectations: self.expectations,
            extra_retryable: self.extra_retryable,
            custom_checks: self.custom_checks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::Expectation;

    #[test]
    fn builds_complete_scenario() {
        let scenario = Scenario::builder("network")
            .module_dir("modules/landing_zone/vpc")
            .param("vpc_cidr", "10.0.0.0/16")
            .override_param("vpc_cidr", "10.1.0.0/16")
            .require_all(["account_id", "region", "account_id"])
            .expect(ExpectedOutput::scalar("vpc_id", Expectation::NonEmpty))
            .retry_on("Error applying plan")
            .build()
            .unwrap();

        assert_eq!(scenario.name(), "network");
        assert_eq!(scenario.module_dir(), Path::new("modules/landing_zone/vpc"));
        assert_eq!(scenario.required(), ["account_id", "region"]);
        assert_eq!(scenario.base().len(), 1);
        assert_eq!(scenario.overrides().len(), 1);
        assert_eq!(scenario.extra_retryable(), ["Error applying plan"]);
    }

    #[test]
    fn name_is_required() {
        let err = ScenarioBuilder::new().module_dir("m").build().unwrap_err();
        assert!(matches!(err, HarnessError::Scenario(_)));

        let err = Scenario::builder("  ").module_dir("m").build().unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn module_dir_is_required() {
        let err = Scenario::builder("network").build().unwrap_err();
        assert!(err.to_string().contains("no module directory"));
    }

    #[test]
    fn invalid_expectation_is_rejected() {
        let err = Scenario::builder("network")
            .module_dir("m")
            .expect(ExpectedOutput::scalar("vpc_id", Expectation::Len(2)))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("scenario 'network'"));
    }

    #[test]
    fn blank_retry_signature_is_rejected() {
        assert!(
            Scenario::builder("network")
                .module_dir("m")
                .retry_on(" ")
                .build()
                .is_err()
        );
    }

    #[test]
    fn custom_check_runs_against_outputs() {
        let scenario = Scenario::builder("identity")
            .module_dir("modules/iam")
            .check("has outputs", |outputs| {
                if outputs.is_empty() {
                    Err("no outputs".to_owned())
                } else {
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let check = &scenario.custom_checks()[0];
        assert_eq!(check.name(), "has outputs");
        assert_eq!(check.run(&OutputSet::new()), Err("no outputs".to_owned()));
        assert!(format!("{scenario:?}").contains("has outputs"));
    }

    #[test]
    fn serializes_without_custom_checks() {
        let scenario = Scenario::builder("budget")
            .module_dir("modules/budget")
            .check("noop", |_| Ok(()))
            .build()
            .unwrap();
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["name"], "budget");
        assert!(json.get("custom_checks").is_none());
    }
}
