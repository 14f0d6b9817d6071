//! 하네스 에러 타입
//!
//! [`HarnessError`]는 프로비저닝 사이클의 각 단계에서 발생하는 에러를 표현합니다.
//! `From<HarnessError> for TerracycleError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use terracycle_core::error::{ConfigError, CycleError, TerracycleError};
use terracycle_core::types::{OutputShape, Phase};

/// 하네스 도메인 에러
///
/// 각 변형은 [`phase()`](HarnessError::phase)로 발생 단계를 알 수 있습니다.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    /// 계정 컨텍스트 조회 실패 (아무것도 프로비저닝되지 않음)
    #[error("environment probe failed: {0}")]
    Probe(String),

    /// 필수 파라미터 누락
    #[error("missing required parameter: {key}")]
    MissingParameter {
        /// 누락된 키 (선언 순서상 첫 번째)
        key: String,
    },

    /// 도구에 넘길 수 없는 파라미터 값
    #[error("invalid parameter '{key}': {reason}")]
    InvalidParameter {
        /// 파라미터 키
        key: String,
        /// 거부 사유
        reason: String,
    },

    /// 도구 초기화 실패
    #[error("tool {operation} failed: {message}")]
    Tool {
        /// 실패한 연산 (init 등)
        operation: String,
        /// 도구가 보고한 메시지
        message: String,
    },

    /// apply 실패 (치명적 실패 또는 재시도 소진)
    #[error("apply failed after {attempts} attempt(s): {message}")]
    Apply {
        /// 수행한 시도 횟수
        attempts: u32,
        /// 마지막 실패 메시지
        message: String,
    },

    /// 요청한 출력값이 없음
    #[error("output not found: {name}")]
    OutputNotFound {
        /// 출력 이름
        name: String,
    },

    /// 출력값 형태 불일치
    #[error("output '{name}' has shape {actual}, expected {expected}")]
    OutputShapeMismatch {
        /// 출력 이름
        name: String,
        /// 요청한 형태
        expected: OutputShape,
        /// 실제 형태
        actual: OutputShape,
    },

    /// 기대값 검증 실패
    #[error("assertion failed for output '{output}': {message}")]
    Assertion {
        /// 검증 대상 출력 이름
        output: String,
        /// 실패 설명
        message: String,
    },

    /// destroy 실패 (인프라가 남아 있을 수 있음)
    #[error("destroy failed after {attempts} attempt(s): {message}")]
    Destroy {
        /// 수행한 시도 횟수
        attempts: u32,
        /// 마지막 실패 메시지
        message: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 시나리오 정의 에러
    #[error("invalid scenario: {0}")]
    Scenario(String),

    /// 사이클 실행 중 panic
    ///
    /// `phase`는 panic이 난 단계이며, 사이클 밖(실행기)에서 잡힌 경우 `Phase::Runner`입니다.
    #[error("panicked during {phase}: {message}")]
    Panicked {
        /// panic이 발생한 단계
        phase: Phase,
        /// panic 메시지
        message: String,
    },
}

impl HarnessError {
    /// 에러가 발생한 사이클 단계를 반환합니다.
    ///
    /// 설정과 시나리오 정의 에러는 프로비저닝 이전 단계이므로 `Assemble`로 분류합니다.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Probe(_) => Phase::Probe,
            Self::MissingParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::Config { .. }
            | Self::Scenario(_) => Phase::Assemble,
            Self::Tool { .. } => Phase::Initialize,
            Self::Apply { .. } => Phase::Apply,
            Self::OutputNotFound { .. } | Self::OutputShapeMismatch { .. } => Phase::Output,
            Self::Assertion { .. } => Phase::Assert,
            Self::Destroy { .. } => Phase::Destroy,
            Self::Panicked { phase, .. } => *phase,
        }
    }
}

impl From<HarnessError> for TerracycleError {
    fn from(err: HarnessError) -> Self {
        match &err {
            HarnessError::Config { field, reason } => {
                TerracycleError::Config(ConfigError::InvalidValue {
                    field: field.clone(),
                    reason: reason.clone(),
                })
            }
            HarnessError::Probe(msg) => TerracycleError::Cycle(CycleError::Probe(msg.clone())),
            HarnessError::MissingParameter { .. }
            | HarnessError::InvalidParameter { .. }
            | HarnessError::Scenario(_) => {
                TerracycleError::Cycle(CycleError::Assembly(err.to_string()))
            }
            HarnessError::Tool { .. } => TerracycleError::Cycle(CycleError::Tool(err.to_string())),
            HarnessError::Apply { .. } => {
                TerracycleError::Cycle(CycleError::Apply(err.to_string()))
            }
            HarnessError::OutputNotFound { .. } | HarnessError::OutputShapeMismatch { .. } => {
                TerracycleError::Cycle(CycleError::Output(err.to_string()))
            }
            HarnessError::Assertion { .. } => {
                TerracycleError::Cycle(CycleError::Assertion(err.to_string()))
            }
            HarnessError::Destroy { .. } => {
                TerracycleError::Cycle(CycleError::Destroy(err.to_string()))
            }
            HarnessError::Panicked { .. } => {
                TerracycleError::Cycle(CycleError::Panicked(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_display() {
        let err = HarnessError::MissingParameter {
            key: "account_id".to_owned(),
        };
        assert_eq!(err.to_string(), "missing required parameter: account_id");
    }

    #[test]
    fn apply_display_includes_attempts() {
        let err = HarnessError::Apply {
            attempts: 3,
            message: "Throttling: Rate exceeded".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("Throttling"));
    }

    #[test]
    fn shape_mismatch_display() {
        let err = HarnessError::OutputShapeMismatch {
            name: "vpc_id".to_owned(),
            expected: OutputShape::List,
            actual: OutputShape::Scalar,
        };
        assert_eq!(
            err.to_string(),
            "output 'vpc_id' has shape scalar, expected list"
        );
    }

    #[test]
    fn panic_keeps_its_phase() {
        let err = HarnessError::Panicked {
            phase: Phase::Apply,
            message: "provider plugin crashed".to_owned(),
        };
        assert_eq!(err.phase(), Phase::Apply);
        assert_eq!(err.to_string(), "panicked during apply: provider plugin crashed");
        assert!(matches!(
            TerracycleError::from(err),
            TerracycleError::Cycle(CycleError::Panicked(_))
        ));
    }

    #[test]
    fn phase_mapping() {
        assert_eq!(HarnessError::Probe("x".to_owned()).phase(), Phase::Probe);
        assert_eq!(
            HarnessError::MissingParameter { key: "k".to_owned() }.phase(),
            Phase::Assemble
        );
        assert_eq!(
            HarnessError::Tool {
                operation: "init".to_owned(),
                message: "m".to_owned()
            }
            .phase(),
            Phase::Initialize
        );
        assert_eq!(
            HarnessError::OutputNotFound { name: "n".to_owned() }.phase(),
            Phase::Output
        );
        assert_eq!(
            HarnessError::Assertion {
                output: "o".to_owned(),
                message: "m".to_owned()
            }
            .phase(),
            Phase::Assert
        );
        assert_eq!(
            HarnessError::Destroy {
                attempts: 1,
                message: "m".to_owned()
            }
            .phase(),
            Phase::Destroy
        );
    }

    #[test]
    fn converts_config_error() {
        let err: TerracycleError = HarnessError::Config {
            field: "max_parallel".to_owned(),
            reason: "must be 1-64".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            TerracycleError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn converts_destroy_error() {
        let err: TerracycleError = HarnessError::Destroy {
            attempts: 3,
            message: "BucketNotEmpty".to_owned(),
        }
        .into();
        assert!(matches!(err, TerracycleError::Cycle(CycleError::Destroy(_))));
        assert!(err.to_string().contains("BucketNotEmpty"));
    }

    #[test]
    fn converts_probe_error() {
        let err: TerracycleError = HarnessError::Probe("no credentials".to_owned()).into();
        assert!(matches!(err, TerracycleError::Cycle(CycleError::Probe(_))));
    }
}
