//! OKH 매니페스트 -- 엔진이 읽는 BOM 관련 필드만 모델링
//!
//! 매니페스트 저장/조회와 전체 직렬화 형식은 외부 협력자의 책임입니다.
//! 엔진은 매니페스트를 변경하지 않으며, 아래 필드만 읽습니다.
//!
//! ```yaml
//! id: 0b5c1f38-2f6e-4f57-8a3b-0c6a3f4d2e10
//! title: Open Microscope
//! bom: bom/parts.yaml            # 또는 { external_file: bom/parts.yaml }
//! parts:
//!   - name: Housing
//!     material: PLA
//! sub_parts:
//!   - name: Optics
//!     reference: { path: optics/okh.toml }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::BomEngineError;
use crate::format::detect_format;

/// 구조화된 외부 BOM 선언
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalBomFile {
    /// 외부 BOM 파일 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file: Option<String>,
    /// 그 외 키
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExternalBomFile {
    /// 비어 있지 않은 외부 파일 경로를 반환합니다.
    pub fn path(&self) -> Option<&str> {
        self.external_file
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// 매니페스트의 `bom` 필드
///
/// 문자열(외부 파일 경로) 또는 `external_file`을 가진 객체입니다.
/// 그 외 형태는 `Other`로 보존되며 외부 BOM으로 취급되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BomDeclaration {
    /// 외부 BOM 파일 경로
    Path(String),
    /// 구조화된 외부 BOM 선언
    File(ExternalBomFile),
    /// 인식되지 않는 형태
    Other(Value),
}

/// 문자열 하나 또는 문자열 목록을 목록으로 역직렬화합니다.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    })
}

/// 스칼라 값을 문자열로 역직렬화합니다. 그 외 형태는 기본값(빈 문자열)이 됩니다.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

/// 문자열 또는 숫자를 문자열로 역직렬화합니다. 그 외 형태와 빈 문자열은 `None`입니다.
fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// 매핑만 받아들입니다. 그 외 형태는 빈 매핑이 됩니다.
fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

/// 매니페스트에 선언된 최상위 부품 (OKH `part`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    /// 부품 이름
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// 부품 ID
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// 원본 설계 파일 목록
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,
    /// 내보내기 파일 목록
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub export: Vec<String>,
    /// 기술 문서 분류 코드 (TsDC)
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub tsdc: Vec<String>,
    /// 재질
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Value>,
    /// 외형 치수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_dimensions: Option<Value>,
    /// 질량
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<Value>,
    /// 제조 파라미터 (수량/단위 오버라이드 포함)
    #[serde(
        default,
        deserialize_with = "lenient_map",
        skip_serializing_if = "Map::is_empty"
    )]
    pub manufacturing_params: Map<String, Value>,
}

impl PartSpec {
    /// 이름만 가진 부품을 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// OKH 매니페스트 (엔진이 읽는 부분)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// 매니페스트 ID (보통 UUID 문자열)
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// 제목
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// BOM 선언
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom: Option<BomDeclaration>,
    /// 최상위 부품 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartSpec>,
    /// 자유 형식 하위 부품 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_parts: Vec<Value>,
    /// 매니페스트 파일 위치 (외부 BOM 상대 경로 해석용)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Manifest {
    /// 제목만 가진 매니페스트를 생성합니다.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// 매니페스트 문서를 파싱합니다.
    ///
    /// 형식은 `path`의 확장자(json/yaml/yml/toml)로 결정하며,
    /// 파싱된 매니페스트의 `source_path`는 `path`로 설정됩니다.
    pub fn parse(content: &str, path: &Path) -> Result<Self, BomEngineError> {
        let format = detect_format(path)?;
        let mut manifest: Manifest =
            format
                .parse(content)
                .map_err(|reason| BomEngineError::ManifestParse {
                    path: path.display().to_string(),
                    reason,
                })?;
        manifest.source_path = Some(path.to_path_buf());
        Ok(manifest)
    }

    /// ID를 UUID로 파싱합니다.
    pub fn uuid(&self) -> Option<Uuid> {
        self.id.as_deref().and_then(|id| Uuid::parse_str(id).ok())
    }

    /// 매니페스트 파일이 있는 디렉토리를 반환합니다.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// 내장 부품 또는 하위 부품이 하나라도 있는지 확인합니다.
    pub fn has_embedded_parts(&self) -> bool {
        !self.parts.is_empty() || !self.sub_parts.is_empty()
    }
}
