//! BOM 소스 탐지기
//!
//! 매니페스트의 BOM 선언을 [`BomSource`]로 분류합니다. I/O가 없는 순수 함수입니다.
//!
//! # 우선순위
//!
//! 1. 비어 있지 않은 문자열 `bom` 또는 `external_file`을 가진 구조화된 `bom` -> 외부
//! 2. 최상위 부품 또는 하위 부품이 하나 이상 -> 내장
//! 3. 그 외 -> 없음
//!
//! 외부 BOM 포인터와 내장 부품이 모두 있으면 외부로 분류됩니다.
//! 내장 부품은 이후 병합 단계([`crate::merge`])에서 다시 합쳐집니다.

use std::fmt;

use crate::manifest::{BomDeclaration, ExternalBomFile, Manifest};

/// BOM 소스 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BomSourceKind {
    /// 매니페스트 안에 선언된 부품
    Embedded,
    /// 별도 파일에 저장된 BOM
    External,
    /// BOM 데이터 없음
    None,
}

impl fmt::Display for BomSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::External => write!(f, "external"),
            Self::None => write!(f, "none"),
        }
    }
}

/// 탐지 결과
#[derive(Debug, Clone, PartialEq)]
pub enum BomSource {
    /// BOM 데이터 없음
    NoBom,
    /// 문자열 형태의 외부 BOM 경로
    ExternalPath(String),
    /// 구조화된 외부 BOM 선언
    ExternalRef(ExternalBomFile),
    /// 내장 부품
    Embedded,
}

impl BomSource {
    /// 분류 종류를 반환합니다.
    pub fn kind(&self) -> BomSourceKind {
        match self {
            Self::NoBom => BomSourceKind::None,
            Self::ExternalPath(_) | Self::ExternalRef(_) => BomSourceKind::External,
            Self::Embedded => BomSourceKind::Embedded,
        }
    }

    /// 외부 BOM 파일 경로를 반환합니다.
    pub fn external_path(&self) -> Option<&str> {
        match self {
            Self::ExternalPath(path) => Some(path),
            Self::ExternalRef(file) => file.path(),
            Self::NoBom | Self::Embedded => None,
        }
    }
}

/// BOM 소스 탐지기
pub struct BomSourceDetector;

impl BomSourceDetector {
    /// 매니페스트의 BOM 소스를 분류합니다.
    pub fn detect(manifest: &Manifest) -> BomSource {
        match &manifest.bom {
            Some(BomDeclaration::Path(path)) if !path.trim().is_empty() => {
                return BomSource::ExternalPath(path.trim().to_owned());
            }
            Some(BomDeclaration::File(file)) if file.path().is_some() => {
                return BomSource::ExternalRef(file.clone());
            }
            _ => {}
        }

        if manifest.has_embedded_parts() {
            BomSource::Embedded
        } else {
            BomSource::NoBom
        }
    }
}
