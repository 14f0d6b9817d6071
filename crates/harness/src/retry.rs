//! 재시도 정책 -- 실패 분류와 재시도 한도
//!
//! [`RetryPolicy`]는 최대 시도 횟수, 시도 간 고정 대기 시간, 재시도 가능 에러
//! 문자열 목록을 묶은 값입니다. 모든 사이클이 `Arc`로 읽기 전용 공유합니다.
//!
//! [`RetryPolicy::classify`]는 외부 프로세스 없이 실패 메시지만으로
//! [`FailureClass`]를 결정하는 순수 함수입니다.
//!
//! # 사용 예시
//! ```
//! use terracycle_harness::retry::{FailureClass, RetryPolicy};
//!
//! let policy = RetryPolicy::default().with_extra_signatures(["Error applying plan"]);
//! assert!(policy.classify("Error applying plan:\n1 error occurred").is_transient());
//! assert!(matches!(policy.classify("InvalidParameterValue"), FailureClass::Fatal(_)));
//! ```

use std::fmt;
use std::time::Duration;

use terracycle_core::config::{MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_SECS};

use crate::error::HarnessError;

/// 기본 최대 시도 횟수 (첫 시도 포함)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// 기본 시도 간 대기 시간
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// 기본 재시도 가능 에러 문자열
///
/// 대소문자를 구분하는 부분 문자열 일치로 비교합니다.
pub const DEFAULT_RETRYABLE_ERRORS: &[&str] = &[
    // 프로바이더/모듈 다운로드 중 네트워크 오류
    "connection reset by peer",
    "TLS handshake timeout",
    "Client.Timeout exceeded while awaiting headers",
    "net/http: request canceled while waiting for connection",
    "Failed to query available provider packages",
    "Error installing provider",
    "Could not download module",
    "The requested URL returned error: 429",
    "Failed to load state: RequestError: send request failed",
    "Failed to load backend: Error configuring the backend",
    // AWS API 스로틀링
    "Throttling",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "Rate exceeded",
    // 최종 일관성 / 동시 수정
    "ConcurrentModificationException",
    "OperationAbortedException",
    "A conflicting conditional operation is currently in progress",
    "ConflictException",
    "The role defined for the function cannot be assumed",
];

/// 실패 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// 일시적 실패 -- 일치한 재시도 가능 에러 문자열을 담습니다.
    Transient(String),
    /// 치명적 실패 -- 원래 실패 메시지를 담습니다.
    Fatal(String),
}

impl FailureClass {
    /// 재시도 대상인지 여부
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// 분류 사유
    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(reason) | Self::Fatal(reason) => reason,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(sig) => write!(f, "transient ({sig})"),
            Self::Fatal(_) => write!(f, "fatal"),
        }
    }
}

/// 재시도 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    inter_attempt_delay: Duration,
    retryable_signatures: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            inter_attempt_delay: DEFAULT_RETRY_DELAY,
            retryable_signatures: DEFAULT_RETRYABLE_ERRORS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// 검증된 재시도 정책을 생성합니다.
    pub fn new(
        max_attempts: u32,
        inter_attempt_delay: Duration,
        retryable_signatures: Vec<String>,
    ) -> Result<Self, HarnessError> {
        if max_attempts == 0 || max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(HarnessError::Config {
                field: "max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_RETRY_ATTEMPTS}"),
            });
        }
        if inter_attempt_delay > Duration::from_secs(MAX_RETRY_DELAY_SECS) {
            return Err(HarnessError::Config {
                field: "delay_secs".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_DELAY_SECS}"),
            });
        }
        if retryable_signatures.iter().any(|s| s.is_empty()) {
            // 빈 문자열은 모든 메시지와 일치하므로 거부
            return Err(HarnessError::Config {
                field: "retryable_signatures".to_owned(),
                reason: "signatures must not be empty".to_owned(),
            });
        }
        Ok(Self {
            max_attempts,
            inter_attempt_delay,
            retryable_signatures,
        })
    }

    /// 최대 시도 횟수 (첫 시도 포함)
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 시도 간 고정 대기 시간
    pub fn inter_attempt_delay(&self) -> Duration {
        self.inter_attempt_delay
    }

    /// 재시도 가능 에러 문자열 목록
    pub fn retryable_signatures(&self) -> &[String] {
        &self.retryable_signatures
    }

    /// 시나리오 전용 에러 문자열을 덧붙인 새 정책을 반환합니다.
    ///
    /// 원본 정책은 변경되지 않습니다. 이미 있는 문자열과 빈 문자열은 건너뜁니다.
    pub fn with_extra_signatures<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut derived = self.clone();
        for sig in extra {
            let sig = sig.into();
            if !sig.is_empty() && !derived.retryable_signatures.contains(&sig) {
                derived.retryable_signatures.push(sig);
            }
        }
        derived
    }

    /// 실패 메시지를 일시적/치명적으로 분류합니다.
    pub fn classify(&self, message: &str) -> FailureClass {
        match self
            .retryable_signatures
            .iter()
            .find(|sig| message.contains(sig.as_str()))
        {
            Some(sig) => FailureClass::Transient(sig.clone()),
            None => FailureClass::Fatal(message.to_owned()),
        }
    }
}
