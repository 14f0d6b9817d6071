//! # terracycle-core
//!
//! terracycle 워크스페이스의 공통 기반 크레이트입니다.
//!
//! - [`types`]: 파라미터/출력값, 계정 컨텍스트, 사이클 단계와 상태
//! - [`error`]: 최상위 에러 타입
//! - [`config`]: `terracycle.toml` 설정과 환경변수 오버라이드
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, CycleError, TerracycleError};

// 설정
pub use config::TerracycleConfig;

// 도메인 타입
pub use types::{
    AccountContext, CycleState, OutputShape, OutputValue, ParamValue, ParameterSet, Phase,
};
