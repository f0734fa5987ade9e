//! BOM 엔진 에러 타입
//!
//! [`BomEngineError`]는 BOM 해석/전개 과정에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<BomEngineError> for BomwalkError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **깊이 상한**: `DepthExceeded` (전개 호출에 치명적, 호출자에게 전달)
//! - **BOM 소스**: `NotFound`, `UnsupportedFormat`, `InvalidFormat`, `FileTooBig`, `Io`
//!   (내장 부품으로 대체하여 복구)
//! - **참조 해석**: `ManifestParse`, `Cancelled` (컴포넌트별로 복구)
//! - **설정**: `Config`

use bomwalk_core::error::{BomError, BomwalkError, ConfigError};

/// BOM 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum BomEngineError {
    /// 파일을 어떤 소스에서도 찾을 수 없음
    #[error("file not found: {path}")]
    NotFound {
        /// 찾으려던 경로
        path: String,
    },

    /// 지원하지 않는 파일 확장자
    #[error("unsupported format: {path}: '{extension}'")]
    UnsupportedFormat {
        /// 파일 경로
        path: String,
        /// 파일 확장자 (없으면 빈 문자열)
        extension: String,
    },

    /// 문서 구조가 BOM 형식이 아님
    #[error("invalid bom format: {path}: {reason}")]
    InvalidFormat {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 매니페스트 문서 파싱 실패
    #[error("manifest parse error: {path}: {reason}")]
    ManifestParse {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 최대 전개 깊이 도달
    #[error("max depth exceeded: depth {depth} (max: {max_depth})")]
    DepthExceeded {
        /// 전개를 시도한 깊이
        depth: usize,
        /// 설정된 최대 깊이
        max_depth: usize,
    },

    /// 로딩 도중 취소됨
    #[error("load cancelled")]
    Cancelled,

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<BomEngineError> for BomwalkError {
    fn from(err: BomEngineError) -> Self {
        match err {
            BomEngineError::NotFound { path } => BomwalkError::Bom(BomError::NotFound(path)),
            BomEngineError::UnsupportedFormat { path, extension } => BomwalkError::Bom(
                BomError::UnsupportedFormat(format!("{path}: '{extension}'")),
            ),
            BomEngineError::InvalidFormat { path, reason } => {
                BomwalkError::Bom(BomError::InvalidFormat(format!("{path}: {reason}")))
            }
            BomEngineError::ManifestParse { path, reason } => BomwalkError::Bom(
                BomError::InvalidFormat(format!("manifest {path}: {reason}")),
            ),
            BomEngineError::DepthExceeded { depth, max_depth } => {
                BomwalkError::Bom(BomError::DepthExceeded { depth, max_depth })
            }
            BomEngineError::Cancelled => BomwalkError::Bom(BomError::Load("cancelled".to_owned())),
            BomEngineError::FileTooBig { path, size, max } => BomwalkError::Bom(BomError::Load(
                format!("file too large: {path}: {size} bytes (max: {max})"),
            )),
            BomEngineError::Config { field, reason } => {
                BomwalkError::Config(ConfigError::InvalidValue { field, reason })
            }
            BomEngineError::Io { path, source } => {
                BomwalkError::Bom(BomError::Load(format!("io error: {path}: {source}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = BomEngineError::NotFound {
            path: "/okh/bom.json".to_owned(),
        };
        assert!(err.to_string().contains("/okh/bom.json"));
    }

    #[test]
    fn unsupported_format_display() {
        let err = BomEngineError::UnsupportedFormat {
            path: "bom.md".to_owned(),
            extension: "md".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bom.md"));
        assert!(msg.contains("'md'"));
    }

    #[test]
    fn depth_exceeded_display() {
        let err = BomEngineError::DepthExceeded {
            depth: 3,
            max_depth: 3,
        };
        assert!(err.to_string().contains("max: 3"));
    }

    #[test]
    fn file_too_big_display() {
        let err = BomEngineError::FileTooBig {
            path: "bom.yaml".to_owned(),
            size: 20_000_000,
            max: 10_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000000"));
        assert!(msg.contains("10000000"));
    }

    #[test]
    fn cancelled_converts_to_load_error() {
        let err: BomwalkError = BomEngineError::Cancelled.into();
        assert!(matches!(err, BomwalkError::Bom(BomError::Load(_))));
    }

    #[test]
    fn converts_to_bomwalk_error_depth() {
        let err: BomwalkError = BomEngineError::DepthExceeded {
            depth: 5,
            max_depth: 5,
        }
        .into();
        assert!(matches!(
            err,
            BomwalkError::Bom(BomError::DepthExceeded {
                depth: 5,
                max_depth: 5
            })
        ));
    }

    #[test]
    fn converts_to_bomwalk_error_invalid_format() {
        let err: BomwalkError = BomEngineError::InvalidFormat {
            path: "bom.json".to_owned(),
            reason: "missing 'components' or 'name'".to_owned(),
        }
        .into();
        assert!(matches!(err, BomwalkError::Bom(BomError::InvalidFormat(_))));
    }

    #[test]
    fn converts_to_bomwalk_error_config() {
        let err: BomwalkError = BomEngineError::Config {
            field: "max_depth".to_owned(),
            reason: "must be 1-64".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            BomwalkError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
