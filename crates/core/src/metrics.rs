//! 메트릭 상수 및 설명 등록
//!
//! 하네스가 기록하는 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 경우 기록은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `terracycle_`
//! - 영역: `tool_`, `apply_`, `cycle_`, `destroy_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(terracycle_core::metrics::APPLY_RETRIES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 도구 연산 레이블 키 (init, apply, destroy, output)
pub const LABEL_OPERATION: &str = "operation";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 시나리오 이름 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

// ─── Tool 메트릭 ─────────────────────────────────────────────────────

/// Tool: 외부 도구 호출 수 (counter, labels: operation, result)
pub const TOOL_INVOCATIONS_TOTAL: &str = "terracycle_tool_invocations_total";

/// Tool: 타임아웃으로 종료된 호출 수 (counter, label: operation)
pub const TOOL_TIMEOUTS_TOTAL: &str = "terracycle_tool_timeouts_total";

/// Tool: 호출 1회 소요 시간 (histogram, 초, label: operation)
pub const TOOL_INVOCATION_DURATION_SECONDS: &str = "terracycle_tool_invocation_duration_seconds";

// ─── Apply 메트릭 ────────────────────────────────────────────────────

/// Apply: 시도 수 (counter)
pub const APPLY_ATTEMPTS_TOTAL: &str = "terracycle_apply_attempts_total";

/// Apply: 일시적 실패로 인한 재시도 수 (counter)
pub const APPLY_RETRIES_TOTAL: &str = "terracycle_apply_retries_total";

/// Apply: 최종 실패 수 (counter)
pub const APPLY_FAILURES_TOTAL: &str = "terracycle_apply_failures_total";

// ─── Cycle 메트릭 ────────────────────────────────────────────────────

/// Cycle: 완료된 사이클 수 (counter, labels: scenario, result)
pub const CYCLES_TOTAL: &str = "terracycle_cycles_total";

/// Cycle: 사이클 전체 소요 시간 (histogram, 초)
pub const CYCLE_DURATION_SECONDS: &str = "terracycle_cycle_duration_seconds";

/// Destroy: 실패 수 (counter, label: scenario)
pub const DESTROY_FAILURES_TOTAL: &str = "terracycle_destroy_failures_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더를 설치하는 쪽에서 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        TOOL_INVOCATIONS_TOTAL,
        "Total number of external provisioning tool invocations"
    );
    describe_counter!(
        TOOL_TIMEOUTS_TOTAL,
        "Total number of tool invocations killed after exceeding the deadline"
    );
    describe_histogram!(
        TOOL_INVOCATION_DURATION_SECONDS,
        "Wall time of a single tool invocation in seconds"
    );

    describe_counter!(APPLY_ATTEMPTS_TOTAL, "Total number of apply attempts");
    describe_counter!(
        APPLY_RETRIES_TOTAL,
        "Total number of apply retries after a transient failure"
    );
    describe_counter!(
        APPLY_FAILURES_TOTAL,
        "Total number of applies that failed fatally or exhausted retries"
    );

    describe_counter!(
        CYCLES_TOTAL,
        "Total number of provisioning cycles by scenario and result"
    );
    describe_histogram!(
        CYCLE_DURATION_SECONDS,
        "Duration of a full provisioning cycle in seconds"
    );
    describe_counter!(
        DESTROY_FAILURES_TOTAL,
        "Total number of destroy failures (possible orphaned infrastructure)"
    );
}
