//! 병렬 시나리오 실행기
//!
//! 시나리오마다 독립된 tokio 태스크를 띄우고 `Semaphore`로 동시 실행 수를
//! 제한합니다. 태스크끼리 공유하는 것은 [`ProvisioningCycle`] (도구, probe,
//! 재시도 정책)뿐입니다.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cycle::{CycleReport, ProvisioningCycle, panic_message};
use crate::probe::AccountProbe;
use crate::scenario::Scenario;
use crate::tool::ProvisioningTool;

/// 전체 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// 시나리오 이름 순으로 정렬된 보고서
    pub reports: Vec<CycleReport>,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    fn from_reports(mut reports: Vec<CycleReport>) -> Self {
        reports.sort_by(|a, b| a.scenario.cmp(&b.scenario));
        let passed = reports.iter().filter(|r| r.passed()).count();
        let failed = reports.len() - passed;
        Self {
            reports,
            passed,
            failed,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn report(&self, scenario: &str) -> Option<&CycleReport> {
        self.reports.iter().find(|r| r.scenario == scenario)
    }
}

/// 시나리오 병렬 실행기
pub struct ScenarioRunner<T: ProvisioningTool, P: AccountProbe> {
    cycle: Arc<ProvisioningCycle<T, P>>,
    max_parallel: usize,
}

impl<T: ProvisioningTool, P: AccountProbe> ScenarioRunner<T, P> {
    /// `max_parallel`이 0이면 1로 취급합니다.
    pub fn new(cycle: ProvisioningCycle<T, P>, max_parallel: usize) -> Self {
        Self {
            cycle: Arc::new(cycle),
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub fn cycle(&self) -> &ProvisioningCycle<T, P> {
        &self.cycle
    }

    /// 모든 시나리오를 실행하고 결과를 모읍니다.
    ///
    /// 한 시나리오의 실패나 panic은 다른 시나리오에 영향을 주지 않습니다.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> RunSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        info!(
            scenarios = scenarios.len(),
            max_parallel = self.max_parallel,
            "starting scenario run"
        );

        for scenario in scenarios {
            let cycle = Arc::clone(&self.cycle);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(scenario = scenario.name(), "semaphore closed, running unbounded");
                        None
                    }
                };

                // 내부 태스크로 분리해 cycle의 panic을 시나리오 이름과 함께 잡음
                let name = scenario.name().to_owned();
                let inner = tokio::spawn(async move { cycle.run(&scenario).await });
                match inner.await {
                    Ok(report) => report,
                    Err(join_err) => {
                        let message = if join_err.is_panic() {
                            panic_message(join_err.into_panic().as_ref())
                        } else {
                            join_err.to_string()
                        };
                        error!(scenario = %name, error = %message, "cycle task failed");
                        CycleReport::panicked(&name, message)
                    }
                }
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(error = %e, "scenario task failed");
                    reports.push(CycleReport::panicked("<unknown>", e.to_string()));
                }
            }
        }

        let summary = RunSummary::from_reports(reports);
        info!(
            passed = summary.passed,
            failed = summary.failed,
            "scenario run finished"
        );
        summary
    }
}
