//! 프로비저닝 사이클 오케스트레이터
//!
//! [`ProvisioningCycle::run`]은 시나리오 하나를 다음 상태 기계로 실행합니다.
//!
//! ```text
//! Created → Initializing → Applying → {Applied | ApplyFailed}
//!         → Asserting (Applied일 때만) → Destroying → {Destroyed | DestroyFailed} → Terminal
//! ```
//!
//! - probe, 파라미터 조립, init 단계의 실패는 아무것도 만들지 않았으므로 destroy 없이 종료
//! - apply를 시도했다면 결과와 무관하게 destroy는 정확히 한 번 실행
//! - 보고되는 실패는 단계 순서상 첫 번째 실패이며, 그 뒤의 destroy 실패는
//!   `cleanup_error`로만 붙음
//! - 도구나 계정 조회가 panic하면 해당 단계의 [`HarnessError::Panicked`]로 바뀌고
//!   위 규칙을 그대로 따름 (apply 중 panic이어도 destroy 실행)
//!
//! 사이클 future가 destroy 전에 drop되면 [`DestroyGuard`]가 남은 인프라를 에러 로그로
//! 알립니다.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Serialize, Serializer};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use terracycle_core::metrics as m;
use terracycle_core::types::{CycleState, ParameterSet, Phase};

use crate::assembler::{account_base, assemble};
use crate::assertions;
use crate::error::HarnessError;
use crate::invoker::RetryingInvoker;
use crate::output::OutputSet;
use crate::probe::AccountProbe;
use crate::retry::RetryPolicy;
use crate::scenario::Scenario;
use crate::tool::ProvisioningTool;

/// 사이클을 끝낸 실패
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub message: String,
    #[serde(skip)]
    pub error: HarnessError,
}

impl From<HarnessError> for PhaseFailure {
    fn from(error: HarnessError) -> Self {
        Self {
            phase: error.phase(),
            message: error.to_string(),
            error,
        }
    }
}

/// 사이클 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub scenario: String,
    /// `Terminal`에 들어가기 직전 상태
    pub final_state: CycleState,
    /// 거쳐 간 상태 (마지막은 항상 `Terminal`)
    pub states: Vec<CycleState>,
    pub apply_attempts: u32,
    /// apply가 성공한 경우에만 존재
    pub outputs: Option<OutputSet>,
    pub failure: Option<PhaseFailure>,
    pub cleanup_error: Option<String>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl CycleReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// destroy 단계에 진입했는지 여부
    pub fn destroy_attempted(&self) -> bool {
        self.states.contains(&CycleState::Destroying)
    }

    /// 태스크가 panic으로 끝났을 때의 보고서
    pub(crate) fn panicked(scenario: &str, message: String) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            scenario: scenario.to_owned(),
            final_state: CycleState::Created,
            states: vec![CycleState::Created, CycleState::Terminal],
            apply_attempts: 0,
            outputs: None,
            failure: Some(PhaseFailure::from(HarnessError::Panicked {
                phase: Phase::Runner,
                message,
            })),
            cleanup_error: None,
            duration: Duration::ZERO,
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// apply 시작부터 destroy 완료까지 무장되는 drop guard
struct DestroyGuard<'a> {
    cycle_id: Uuid,
    scenario: &'a str,
    module_dir: &'a Path,
    armed: bool,
}

impl<'a> DestroyGuard<'a> {
    fn arm(cycle_id: Uuid, scenario: &'a str, module_dir: &'a Path) -> Self {
        Self {
            cycle_id,
            scenario,
            module_dir,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DestroyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            error!(
                cycle_id = %self.cycle_id,
                scenario = self.scenario,
                module_dir = %self.module_dir.display(),
                "cycle dropped before destroy completed, infrastructure may be orphaned"
            );
        }
    }
}

/// 상태 전이 기록
struct StateTrail {
    states: Vec<CycleState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![CycleState::Created],
        }
    }

    fn enter(&mut self, state: CycleState) {
        debug!(state = %state, "cycle state");
        self.states.push(state);
    }

    fn current(&self) -> CycleState {
        self.states.last().copied().unwrap_or(CycleState::Created)
    }
}

/// 시나리오 하나를 끝까지 실행하는 오케스트레이터
///
/// 도구와 probe, 기본 재시도 정책만 공유하며 사이클 간에 가변 상태가 없습니다.
pub struct ProvisioningCycle<T: ProvisioningTool, P: AccountProbe> {
    tool: Arc<T>,
    probe: P,
    policy: Arc<RetryPolicy>,
    command_timeout: Duration,
    modules_root: PathBuf,
}

impl<T: ProvisioningTool, P: AccountProbe> ProvisioningCycle<T, P> {
    pub fn new(tool: Arc<T>, probe: P, policy: Arc<RetryPolicy>, command_timeout: Duration) -> Self {
        Self {
            tool,
            probe,
            policy,
            command_timeout,
            modules_root: PathBuf::new(),
        }
    }

    /// 상대 경로인 모듈 디렉토리의 기준 경로를 설정합니다.
    pub fn with_modules_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.modules_root = root.into();
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// 시나리오의 실제 작업 디렉토리
    pub fn working_dir(&self, scenario: &Scenario) -> PathBuf {
        self.modules_root.join(scenario.module_dir())
    }

    /// 시나리오를 실행하고 보고서를 반환합니다.
    ///
    /// 실패는 에러가 아니라 보고서의 `failure`로 표현됩니다.
    pub async fn run(&self, scenario: &Scenario) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle_id = %cycle_id, scenario = scenario.name());
        self.run_inner(cycle_id, scenario).instrument(span).await
    }

    async fn run_inner(&self, cycle_id: Uuid, scenario: &Scenario) -> CycleReport {
        let started = Instant::now();
        let dir = self.working_dir(scenario);
        let mut trail = StateTrail::new();
        let mut apply_attempts = 0;
        let mut outputs = None;
        let mut failure: Option<PhaseFailure> = None;
        let mut cleanup_error = None;

        info!(module_dir = %dir.display(), "cycle started");

        let params = match self.prepare(scenario).await {
            Ok(params) => params,
            Err(err) => {
                warn!(error = %err, "cycle aborted before provisioning");
                return self.finish(
                    cycle_id,
                    scenario,
                    trail,
                    0,
                    None,
                    Some(err.into()),
                    None,
                    started,
                );
            }
        };

        let policy = if scenario.extra_retryable().is_empty() {
            Arc::clone(&self.policy)
        } else {
            Arc::new(
                self.policy
                    .with_extra_signatures(scenario.extra_retryable().iter().cloned()),
            )
        };
        let invoker = RetryingInvoker::new(Arc::clone(&self.tool), policy, self.command_timeout);

        trail.enter(CycleState::Initializing);
        let initialized = guarded(Phase::Initialize, invoker.initialize(&dir))
            .await
            .and_then(|result| result);
        if let Err(err) = initialized {
            warn!(error = %err, "initialize failed, nothing to destroy");
            return self.finish(
                cycle_id,
                scenario,
                trail,
                0,
                None,
                Some(err.into()),
                None,
                started,
            );
        }

        trail.enter(CycleState::Applying);
        let guard = DestroyGuard::arm(cycle_id, scenario.name(), &dir);

        let applied = guarded(Phase::Apply, invoker.apply(&dir, &params))
            .await
            .and_then(|result| result);
        match applied {
            Ok((applied, attempts)) => {
                apply_attempts = attempts;
                trail.enter(CycleState::Applied);

                trail.enter(CycleState::Asserting);
                if let Err(err) = run_assertions(scenario, &applied) {
                    warn!(error = %err, "assertion failed");
                    failure = Some(err.into());
                }
                outputs = Some(applied);
            }
            Err(err) => {
                if let HarnessError::Apply { attempts, .. } = &err {
                    apply_attempts = *attempts;
                }
                trail.enter(CycleState::ApplyFailed);
                error!(error = %err, "apply failed");
                failure = Some(err.into());
            }
        }

        trail.enter(CycleState::Destroying);
        let destroyed = guarded(Phase::Destroy, invoker.destroy(&dir, &params))
            .await
            .and_then(|result| result);
        match destroyed {
            Ok(attempts) => {
                trail.enter(CycleState::Destroyed);
                info!(attempts, "destroy completed");
            }
            Err(err) => {
                trail.enter(CycleState::DestroyFailed);
                metrics::counter!(m::DESTROY_FAILURES_TOTAL, m::LABEL_SCENARIO => scenario.name().to_owned())
                    .increment(1);
                error!(
                    module_dir = %dir.display(),
                    error = %err,
                    "destroy failed, infrastructure may be orphaned"
                );
                if failure.is_some() {
                    cleanup_error = Some(err.to_string());
                } else {
                    failure = Some(err.into());
                }
            }
        }
        guard.disarm();

        self.finish(
            cycle_id,
            scenario,
            trail,
            apply_attempts,
            outputs,
            failure,
            cleanup_error,
            started,
        )
    }

    /// probe 결과와 시나리오 파라미터로 최종 파라미터를 만듭니다.
    async fn prepare(&self, scenario: &Scenario) -> Result<ParameterSet, HarnessError> {
        let ctx = guarded(Phase::Probe, self.probe.resolve_account_context()).await??;
        debug!(account = %ctx, "account context resolved");

        let mut base = account_base(&ctx);
        for (key, value) in scenario.base().iter() {
            base.insert(key.clone(), value.clone());
        }
        assemble(&base, scenario.overrides(), scenario.required())
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        cycle_id: Uuid,
        scenario: &Scenario,
        mut trail: StateTrail,
        apply_attempts: u32,
        outputs: Option<OutputSet>,
        failure: Option<PhaseFailure>,
        cleanup_error: Option<String>,
        started: Instant,
    ) -> CycleReport {
        let final_state = trail.current();
        trail.enter(CycleState::Terminal);
        let duration = started.elapsed();

        let result = if failure.is_none() { "passed" } else { "failed" };
        metrics::counter!(
            m::CYCLES_TOTAL,
            m::LABEL_SCENARIO => scenario.name().to_owned(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        metrics::histogram!(m::CYCLE_DURATION_SECONDS, m::LABEL_SCENARIO => scenario.name().to_owned())
            .record(duration.as_secs_f64());

        match &failure {
            None => info!(final_state = %final_state, apply_attempts, "cycle passed"),
            Some(f) => warn!(
                final_state = %final_state,
                phase = %f.phase,
                failure = %f.message,
                "cycle failed"
            ),
        }

        CycleReport {
            cycle_id,
            scenario: scenario.name().to_owned(),
            final_state,
            states: trail.states,
            apply_attempts,
            outputs,
            failure,
            cleanup_error,
            duration,
        }
    }
}

/// future의 panic을 `phase` 단계의 [`HarnessError::Panicked`]로 바꿉니다.
async fn guarded<F: Future>(phase: Phase, fut: F) -> Result<F::Output, HarnessError> {
    AssertUnwindSafe(fut).catch_unwind().await.map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!(phase = %phase, panic = %message, "panic inside cycle phase");
        HarnessError::Panicked { phase, message }
    })
}

/// 선언형 기대 조건과 사용자 검사를 실행합니다.
///
/// panic은 assert 단계 실패로 바뀌어 destroy까지 진행됩니다.
fn run_assertions(scenario: &Scenario, outputs: &OutputSet) -> Result<(), HarnessError> {
    let result = catch_unwind(AssertUnwindSafe(|| -> Result<(), HarnessError> {
        assertions::check(outputs, scenario.expectations())?;
        for check in scenario.custom_checks() {
            check.run(outputs).map_err(|message| HarnessError::Assertion {
                output: check.name().to_owned(),
                message,
            })?;
        }
        Ok(())
    }));

    match result {
        Ok(checked) => checked,
        Err(payload) => Err(HarnessError::Assertion {
            output: "<panic>".to_owned(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
