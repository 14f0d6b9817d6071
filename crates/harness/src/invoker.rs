//! 재시도 래핑 도구 호출기
//!
//! [`RetryingInvoker`]는 [`ProvisioningTool`]의 각 연산을 재시도 정책과
//! 호출당 제한 시간으로 감쌉니다.
//!
//! # 재시도 알고리즘
//! 1. 시도 횟수는 1부터 시작
//! 2. 성공하면 즉시 반환
//! 3. 실패 메시지를 [`RetryPolicy::classify`]로 분류
//! 4. 일시적 실패이고 시도가 남았으면 고정 간격만큼 대기 후 재시도
//! 5. 치명적 실패이거나 시도를 소진하면 즉시 에러 반환
//!
//! 제한 시간을 넘긴 호출은 자식 프로세스를 종료하고 치명적 실패로 처리합니다.
//! apply가 시간 초과되면 재시도 없이 사이클의 destroy 단계로 넘어갑니다.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use terracycle_core::metrics as m;
use terracycle_core::types::ParameterSet;

use crate::error::HarnessError;
use crate::output::OutputSet;
use crate::retry::{FailureClass, RetryPolicy};
use crate::tool::{ProvisioningTool, ToolFailure, ToolOperation};

/// 재시도 소진 또는 치명적 실패
#[derive(Debug)]
struct RetryExhausted {
    attempts: u32,
    message: String,
}

/// 재시도 정책과 제한 시간을 적용하는 도구 호출기
pub struct RetryingInvoker<T: ProvisioningTool> {
    tool: Arc<T>,
    policy: Arc<RetryPolicy>,
    command_timeout: Duration,
}

impl<T: ProvisioningTool> RetryingInvoker<T> {
    /// 새 호출기를 생성합니다.
    pub fn new(tool: Arc<T>, policy: Arc<RetryPolicy>, command_timeout: Duration) -> Self {
        Self {
            tool,
            policy,
            command_timeout,
        }
    }

    /// 적용 중인 재시도 정책
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 작업 디렉토리를 초기화합니다.
    ///
    /// # Errors
    ///
    /// 재시도 소진 또는 치명적 실패 시 `HarnessError::Tool`
    pub async fn initialize(&self, dir: &Path) -> Result<(), HarnessError> {
        let tool = &self.tool;
        self.with_retry(ToolOperation::Init, move || tool.init(dir))
            .await
            .map(|(_, attempts)| {
                debug!(dir = %dir.display(), attempts, "module initialized");
            })
            .map_err(|e| HarnessError::Tool {
                operation: ToolOperation::Init.to_string(),
                message: e.message,
            })
    }

    /// apply를 수행하고 성공 시 출력값을 읽어 반환합니다.
    ///
    /// 반환값의 두 번째 요소는 성공까지 걸린 시도 횟수입니다.
    ///
    /// # Errors
    ///
    /// 재시도 소진, 치명적 실패, 출력값 조회 실패 시 `HarnessError::Apply`
    pub async fn apply(
        &self,
        dir: &Path,
        params: &ParameterSet,
    ) -> Result<(OutputSet, u32), HarnessError> {
        let tool = &self.tool;
        let attempts = match self
            .with_retry(ToolOperation::Apply, move || tool.apply(dir, params))
            .await
        {
            Ok(((), attempts)) => attempts,
            Err(e) => {
                metrics::counter!(m::APPLY_FAILURES_TOTAL).increment(1);
                return Err(HarnessError::Apply {
                    attempts: e.attempts,
                    message: e.message,
                });
            }
        };

        match self.invoke_once(ToolOperation::Output, tool.outputs(dir)).await {
            Ok(outputs) => {
                info!(
                    dir = %dir.display(),
                    attempts,
                    outputs = outputs.len(),
                    "apply succeeded"
                );
                Ok((outputs, attempts))
            }
            Err(failure) => {
                metrics::counter!(m::APPLY_FAILURES_TOTAL).increment(1);
                Err(HarnessError::Apply {
                    attempts,
                    message: format!("apply succeeded but outputs could not be read: {failure}"),
                })
            }
        }
    }

    /// 리소스를 삭제합니다.
    ///
    /// # Errors
    ///
    /// 재시도 소진 또는 치명적 실패 시 `HarnessError::Destroy`
    pub async fn destroy(&self, dir: &Path, params: &ParameterSet) -> Result<u32, HarnessError> {
        let tool = &self.tool;
        self.with_retry(ToolOperation::Destroy, move || tool.destroy(dir, params))
            .await
            .map(|(_, attempts)| attempts)
            .map_err(|e| HarnessError::Destroy {
                attempts: e.attempts,
                message: e.message,
            })
    }

    /// 단일 호출에 제한 시간을 적용하고 메트릭을 기록합니다.
    async fn invoke_once<R>(
        &self,
        operation: ToolOperation,
        call: impl Future<Output = Result<R, ToolFailure>>,
    ) -> Result<R, InvokeFailure> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.command_timeout, call).await;
        metrics::histogram!(m::TOOL_INVOCATION_DURATION_SECONDS, m::LABEL_OPERATION => operation.as_str())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(value)) => {
                metrics::counter!(
                    m::TOOL_INVOCATIONS_TOTAL,
                    m::LABEL_OPERATION => operation.as_str(),
                    m::LABEL_RESULT => "success"
                )
                .increment(1);
                Ok(value)
            }
            Ok(Err(failure)) => {
                metrics::counter!(
                    m::TOOL_INVOCATIONS_TOTAL,
                    m::LABEL_OPERATION => operation.as_str(),
                    m::LABEL_RESULT => "failure"
                )
                .increment(1);
                Err(InvokeFailure::Tool(failure))
            }
            Err(_elapsed) => {
                metrics::counter!(m::TOOL_TIMEOUTS_TOTAL, m::LABEL_OPERATION => operation.as_str())
                    .increment(1);
                Err(InvokeFailure::TimedOut(self.command_timeout))
            }
        }
    }

    /// 재시도 루프
    async fn with_retry<R, F, Fut>(
        &self,
        operation: ToolOperation,
        mut call: F,
    ) -> Result<(R, u32), RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, ToolFailure>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 1;

        loop {
            if operation == ToolOperation::Apply {
                metrics::counter!(m::APPLY_ATTEMPTS_TOTAL).increment(1);
            }
            debug!(operation = %operation, attempt, max_attempts, "invoking tool");

            let failure = match self.invoke_once(operation, call()).await {
                Ok(value) => return Ok((value, attempt)),
                Err(failure) => failure,
            };

            let class = match &failure {
                InvokeFailure::Tool(f) => self.policy.classify(&f.message),
                InvokeFailure::TimedOut(_) => FailureClass::Fatal(failure.to_string()),
            };

            match class {
                FailureClass::Transient(signature) if attempt < max_attempts => {
                    warn!(
                        operation = %operation,
                        attempt,
                        max_attempts,
                        signature = signature.as_str(),
                        delay_secs = self.policy.inter_attempt_delay().as_secs(),
                        "transient tool failure, retrying"
                    );
                    if operation == ToolOperation::Apply {
                        metrics::counter!(m::APPLY_RETRIES_TOTAL).increment(1);
                    }
                    tokio::time::sleep(self.policy.inter_attempt_delay()).await;
                    attempt += 1;
                }
                class => {
                    error!(
                        operation = %operation,
                        attempt,
                        max_attempts,
                        class = %class,
                        error = %failure,
                        "tool operation failed"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        message: failure.to_string(),
                    });
                }
            }
        }
    }
}

/// 단일 호출 실패
#[derive(Debug)]
enum InvokeFailure {
    Tool(ToolFailure),
    TimedOut(Duration),
}

impl std::fmt::Display for InvokeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tool(failure) => write!(f, "{failure}"),
            Self::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}
