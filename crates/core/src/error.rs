//! 에러 타입 -- 도메인별 에러 정의

/// bomwalk 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum BomwalkError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// BOM 해석/전개 에러
    #[error("bom error: {0}")]
    Bom(#[from] BomError),

    /// 로깅 초기화 에러
    #[error("logging error: {0}")]
    Logging(String),

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

/// BOM 해석/전개 에러
///
/// 엔진 크레이트의 세부 에러가 이 분류로 매핑됩니다.
#[derive(Debug, thiserror::Error)]
pub enum BomError {
    /// BOM 또는 매니페스트 파일을 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 지원하지 않는 파일 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 구조가 올바르지 않은 문서
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// 최대 전개 깊이 초과
    #[error("max depth exceeded: depth {depth} (max: {max_depth})")]
    DepthExceeded { depth: usize, max_depth: usize },

    /// 로딩 실패 (I/O, 취소, 크기 초과 등)
    #[error("load failed: {0}")]
    Load(String),
}
