//! 에러 타입: 도메인별 에러 정의

/// terracycle 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TerracycleError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 프로비저닝 사이클 에러
    #[error("cycle error: {0}")]
    Cycle(#[from] CycleError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 프로비저닝 사이클 에러
///
/// 하네스 크레이트의 상세 에러가 단계(phase) 단위로 축약된 형태입니다.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// 계정 컨텍스트 조회 실패
    #[error("probe failed: {0}")]
    Probe(String),

    /// 파라미터 조립 실패 (필수 키 누락 등)
    #[error("parameter assembly failed: {0}")]
    Assembly(String),

    /// 프로비저닝 도구 초기화 실패
    #[error("tool initialization failed: {0}")]
    Tool(String),

    /// apply 실패 (재시도 소진 또는 치명적 실패)
    #[error("apply failed: {0}")]
    Apply(String),

    /// 출력값 조회 실패 또는 형태 불일치
    #[error("output error: {0}")]
    Output(String),

    /// 기대값 검증 실패
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// destroy 실패
    #[error("destroy failed: {0}")]
    Destroy(String),

    /// 사이클 실행 중 panic
    #[error("cycle panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: TerracycleError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, TerracycleError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn cycle_error_display_names_phase() {
        let err = CycleError::Destroy("bucket not empty".to_owned());
        assert_eq!(err.to_string(), "destroy failed: bucket not empty");
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TerracycleError = io.into();
        assert!(matches!(err, TerracycleError::Io(_)));
    }
}
