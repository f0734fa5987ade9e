//! 설정 관리 -- bomwalk.toml 파싱 및 런타임 설정
//!
//! [`BomwalkConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 호출자가 직접 지정한 값 (최고 우선)
//! 2. 환경변수 (`BOMWALK_BOM_MAX_DEPTH=8` 형식)
//! 3. 설정 파일 (`bomwalk.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), bomwalk_core::error::BomwalkError> {
//! use bomwalk_core::config::BomwalkConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = BomwalkConfig::load("bomwalk.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = BomwalkConfig::parse("[bom]\nmax_depth = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BomwalkError, ConfigError};

/// bomwalk 통합 설정
///
/// `bomwalk.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BomwalkConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// BOM 엔진 설정
    #[serde(default)]
    pub bom: BomConfig,
}

impl BomwalkConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BomwalkError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BomwalkError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BomwalkError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                BomwalkError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, BomwalkError> {
        toml::from_str(toml_str).map_err(|e| {
            BomwalkError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `BOMWALK_{SECTION}_{FIELD}`
    /// 예: `BOMWALK_BOM_MAX_DEPTH=8`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "BOMWALK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "BOMWALK_GENERAL_LOG_FORMAT");

        // BOM
        override_usize(&mut self.bom.max_depth, "BOMWALK_BOM_MAX_DEPTH");
        override_usize(&mut self.bom.max_file_size, "BOMWALK_BOM_MAX_FILE_SIZE");
        override_usize(
            &mut self.bom.max_concurrent_loads,
            "BOMWALK_BOM_MAX_CONCURRENT_LOADS",
        );
        override_bool(
            &mut self.bom.fallback_on_empty_external,
            "BOMWALK_BOM_FALLBACK_ON_EMPTY_EXTERNAL",
        );
        override_csv(&mut self.bom.manifest_dirs, "BOMWALK_BOM_MANIFEST_DIRS");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 여기서는 문자열 enum 형태의 값만 확인합니다. 수치 범위 검증은
    /// 엔진 크레이트의 `BomEngineConfig::validate()`가 담당합니다.
    pub fn validate(&self) -> Result<(), BomwalkError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.bom.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bom.max_depth".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// BOM 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BomConfig {
    /// 기본 최대 전개 깊이
    pub max_depth: usize,
    /// BOM/매니페스트 파일 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 동시 콘텐츠 로딩 수 상한
    pub max_concurrent_loads: usize,
    /// 외부 BOM이 비어 있을 때 내장 부품으로 대체할지 여부
    pub fallback_on_empty_external: bool,
    /// 매니페스트 ID 조회 시 검색할 디렉토리 목록
    pub manifest_dirs: Vec<String>,
}

impl Default for BomConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_file_size: 10 * 1024 * 1024, // 10 MB
            max_concurrent_loads: 8,
            fallback_on_empty_external: true,
            manifest_dirs: Vec::new(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
