//! # terracycle-harness
//!
//! Terraform 모듈을 실제 계정에 프로비저닝하고, 출력값을 검증한 뒤, 반드시
//! 삭제하는 통합 테스트 하네스입니다.
//!
//! # Module Structure
//!
//! - [`ident`]: 리소스 이름용 고유 접미사
//! - [`probe`]: 계정 컨텍스트 조회 (`AccountProbe`, `AwsCliProbe`, `MemoizedProbe`)
//! - [`assembler`]: 파라미터 병합과 필수 키 검사
//! - [`retry`]: 실패 분류와 재시도 정책 (`RetryPolicy`)
//! - [`tool`]: 프로비저닝 도구 추상화 (`ProvisioningTool`, `TerraformCli`)
//! - [`invoker`]: 재시도와 제한 시간을 적용하는 호출기 (`RetryingInvoker`)
//! - [`output`]: 출력값 조회 (`OutputSet`)
//! - [`assertions`]: 선언형 출력 검증 (`ExpectedOutput`)
//! - [`scenario`]: 사이클 입력 (`Scenario`, `ScenarioBuilder`)
//! - [`cycle`]: 사이클 상태 기계 (`ProvisioningCycle`, `CycleReport`)
//! - [`runner`]: 병렬 실행 (`ScenarioRunner`, `RunSummary`)
//! - [`catalog`]: 기본 제공 시나리오
//! - [`config`]: 하네스 설정 (`HarnessConfig`, builder)
//! - [`error`]: 도메인 에러 (`HarnessError`)
//!
//! # Architecture
//!
//! ```text
//! Scenario ──> ProvisioningCycle ──> AccountProbe ──> assemble()
//!                     │
//!                     ├─> RetryingInvoker ──> ProvisioningTool (init / apply / output)
//!                     ├─> assertions::check(OutputSet)
//!                     └─> RetryingInvoker ──> ProvisioningTool (destroy)
//!                     │
//!                     v
//!                CycleReport ──> ScenarioRunner ──> RunSummary
//! ```

pub mod assembler;
pub mod assertions;
pub mod catalog;
pub mod config;
pub mod cycle;
pub mod error;
pub mod ident;
pub mod invoker;
pub mod output;
pub mod probe;
mod process;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod tool;

// --- Public API Re-exports ---

// 오케스트레이션
pub use cycle::{CycleReport, PhaseFailure, ProvisioningCycle};
pub use runner::{RunSummary, ScenarioRunner};
pub use scenario::{CustomCheck, Scenario, ScenarioBuilder};

// 설정
pub use config::{HarnessConfig, HarnessConfigBuilder};

// 에러
pub use error::HarnessError;

// 도구와 probe
pub use invoker::RetryingInvoker;
pub use probe::{AccountProbe, AwsCliProbe, ConfiguredProbe, MemoizedProbe, StaticProbe};
pub use tool::{ProvisioningTool, TerraformCli, ToolFailure, ToolOperation};

// 조립, 출력, 검증
pub use assembler::{account_base, assemble, standard_tags};
pub use assertions::{Expectation, ExpectedOutput};
pub use ident::{new_unique_suffix, unique_name};
pub use output::OutputSet;
pub use retry::{FailureClass, RetryPolicy};
