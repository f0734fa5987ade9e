//! 문서 형식 판별 및 파싱
//!
//! 파일 확장자로 [`DocumentFormat`]을 결정하고, 내용을 `serde_json::Value`
//! 또는 임의의 역직렬화 가능한 타입으로 파싱합니다.
//!
//! # 지원 형식
//!
//! - `.json` -- JSON
//! - `.yaml` / `.yml` -- YAML
//! - `.toml` -- TOML (매니페스트 전용, 외부 BOM 파일에는 허용되지 않음)

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::BomEngineError;

/// 문서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// JSON
    Json,
    /// YAML
    Yaml,
    /// TOML
    Toml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

impl DocumentFormat {
    /// 파일 확장자로 형식을 판별합니다 (대소문자 구분 없음).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// 외부 BOM 파일 형식으로 허용되는지 확인합니다.
    pub fn is_bom_format(&self) -> bool {
        matches!(self, Self::Json | Self::Yaml)
    }

    /// 내용을 파싱합니다.
    ///
    /// 파싱 실패 사유는 문자열로 반환하며, 호출자가 적절한 에러 변형으로 감쌉니다.
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| format!("JSON parse error: {e}")),
            Self::Yaml => {
                serde_yaml::from_str(content).map_err(|e| format!("YAML parse error: {e}"))
            }
            Self::Toml => toml::from_str(content).map_err(|e| format!("TOML parse error: {e}")),
        }
    }
}

/// 경로의 형식을 판별하고, 판별할 수 없으면 `UnsupportedFormat` 에러를 반환합니다.
pub fn detect_format(path: &Path) -> Result<DocumentFormat, BomEngineError> {
    DocumentFormat::from_path(path).ok_or_else(|| BomEngineError::UnsupportedFormat {
        path: path.display().to_string(),
        extension: extension_of(path),
    })
}

/// 경로의 확장자를 문자열로 반환합니다 (없으면 빈 문자열).
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_owned()
}
