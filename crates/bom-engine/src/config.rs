//! BOM 엔진 설정
//!
//! [`BomEngineConfig`]는 core의 [`BomConfig`](bomwalk_core::config::BomConfig)에서
//! 파생되며, 엔진이 실제로 사용하는 값(깊이 상한, 파일 크기 제한, 동시 로딩 수,
//! 빈 외부 BOM 대체 정책, 매니페스트 검색 디렉토리)을 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use bomwalk_bom_engine::{BomEngineConfig, BomEngineConfigBuilder};
//!
//! let config = BomEngineConfig::default();
//! config.validate().unwrap();
//!
//! let config = BomEngineConfigBuilder::new()
//!     .max_depth(8)
//!     .max_concurrent_loads(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_depth, 8);
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BomEngineError;

/// 설정 상한값 상수
const MAX_DEPTH_LIMIT: usize = 64;
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB
const MAX_CONCURRENT_LOADS_LIMIT: usize = 256;
const MAX_PATH_LEN: usize = 4096;

/// 최대 전개 깊이가 허용 범위(1-64)인지 확인합니다.
///
/// 설정 검증과 전개 호출 진입 시 모두 사용됩니다.
pub(crate) fn check_max_depth(max_depth: usize) -> Result<(), BomEngineError> {
    if max_depth == 0 || max_depth > MAX_DEPTH_LIMIT {
        return Err(BomEngineError::Config {
            field: "max_depth".to_owned(),
            reason: format!("must be 1-{MAX_DEPTH_LIMIT}"),
        });
    }
    Ok(())
}

/// BOM 엔진 설정
///
/// # 필드
///
/// - **max_depth**: 기본 최대 전개 깊이 (전개 호출마다 명시적으로 전달됨)
/// - **max_file_size**: BOM/매니페스트 파일 최대 크기 (바이트)
/// - **max_concurrent_loads**: 동시 콘텐츠 로딩 수 상한
/// - **fallback_on_empty_external**: 외부 BOM이 비어 있을 때 내장 부품으로 대체할지 여부
/// - **manifest_dirs**: 파일시스템 콘텐츠 소스의 검색 루트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEngineConfig {
    /// 기본 최대 전개 깊이
    pub max_depth: usize,
    /// 파일 최대 허용 크기 (바이트)
    pub max_file_size: usize,
    /// 동시 로딩 수 상한
    pub max_concurrent_loads: usize,
    /// 빈 외부 BOM 대체 여부
    pub fallback_on_empty_external: bool,
    /// 매니페스트 검색 디렉토리
    pub manifest_dirs: Vec<String>,
}

impl Default for BomEngineConfig {
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

impl BomEngineConfig {
    /// core의 `BomConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &bomwalk_core::config::BomConfig) -> Self {
        Self {
            max_depth: core.max_depth,
            max_file_size: core.max_file_size,
            max_concurrent_loads: core.max_concurrent_loads,
            fallback_on_empty_external: core.fallback_on_empty_external,
            manifest_dirs: core.manifest_dirs.clone(),
        }
    }

    /// 매니페스트 검색 디렉토리를 경로 목록으로 반환합니다.
    pub fn manifest_roots(&self) -> Vec<PathBuf> {
        self.manifest_dirs.iter().map(PathBuf::from).collect()
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `max_depth`: 1-64
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - `max_concurrent_loads`: 1-256
    /// - `manifest_dirs`: 빈 경로, `..` 컴포넌트, 4096자 초과 경로 금지
    pub fn validate(&self) -> Result<(), BomEngineError> {
        check_max_depth(self.max_depth)?;

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(BomEngineError::Config {
                field: "max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE}"),
            });
        }

        if self.max_concurrent_loads == 0 || self.max_concurrent_loads > MAX_CONCURRENT_LOADS_LIMIT
        {
            return Err(BomEngineError::Config {
                field: "max_concurrent_loads".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENT_LOADS_LIMIT}"),
            });
        }

        for dir in &self.manifest_dirs {
            if dir.trim().is_empty() {
                return Err(BomEngineError::Config {
                    field: "manifest_dirs".to_owned(),
                    reason: "manifest directory path must not be empty".to_owned(),
                });
            }

            if Path::new(dir)
                .components()
                .any(|c| c == Component::ParentDir)
            {
                return Err(BomEngineError::Config {
                    field: "manifest_dirs".to_owned(),
                    reason: format!("manifest directory '{dir}' contains path traversal pattern '..'"),
                });
            }

            if dir.len() > MAX_PATH_LEN {
                return Err(BomEngineError::Config {
                    field: "manifest_dirs".to_owned(),
                    reason: format!("manifest directory path exceeds maximum length {MAX_PATH_LEN}"),
                });
            }
        }

        Ok(())
    }
}

/// [`BomEngineConfig`] 빌더
///
/// 빌드 시 유효성을 검증합니다.
#[derive(Default)]
pub struct BomEngineConfigBuilder {
    config: BomEngineConfig,
}

impl BomEngineConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 최대 전개 깊이를 설정합니다.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 동시 로딩 수 상한을 설정합니다.
    pub fn max_concurrent_loads(mut self, max: usize) -> Self {
        self.config.max_concurrent_loads = max;
        self
    }

    /// 빈 외부 BOM 대체 정책을 설정합니다.
    pub fn fallback_on_empty_external(mut self, fallback: bool) -> Self {
        self.config.fallback_on_empty_external = fallback;
        self
    }

    /// 매니페스트 검색 디렉토리를 설정합니다.
    pub fn manifest_dirs(mut self, dirs: Vec<String>) -> Self {
        self.config.manifest_dirs = dirs;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `BomEngineError::Config` 반환
    pub fn build(self) -> Result<BomEngineConfig, BomEngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
