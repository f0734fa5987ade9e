//! 외부 BOM 로더
//!
//! 매니페스트의 외부 BOM 선언을 따라 파일을 찾아 읽고, [`BillOfMaterials`]로 파싱합니다.
//!
//! # 로딩 순서
//!
//! 1. 외부 경로 추출 (문자열 `bom` 또는 `bom.external_file`)
//! 2. 상대 경로면 매니페스트 파일이 있는 디렉토리 기준으로 해석
//! 3. 파일시스템 직접 읽기 -> 실패 시 [`ContentSource::load_file`]에 위임
//! 4. 확장자에 따라 JSON/YAML 파싱 (그 외 확장자는 `UnsupportedFormat`)
//! 5. 최상위가 `components` 또는 `name` 키를 가진 매핑인지 검증
//!
//! 모든 실패는 타입이 있는 에러로 반환되며, 오케스트레이터가 소프트 실패로 처리합니다.

use std::path::Path;

use serde_json::Value;

use crate::detect::BomSourceDetector;
use crate::error::BomEngineError;
use crate::format::{detect_format, extension_of};
use crate::manifest::Manifest;
use crate::source::{ContentSource, load_text};
use crate::types::BillOfMaterials;

/// 외부 BOM 로더
pub struct ExternalBomLoader<'a> {
    source: Option<&'a dyn ContentSource>,
    max_file_size: usize,
}

impl<'a> ExternalBomLoader<'a> {
    /// 로더를 생성합니다.
    ///
    /// `source`가 없으면 파일시스템 직접 읽기만 시도합니다.
    pub fn new(source: Option<&'a dyn ContentSource>, max_file_size: usize) -> Self {
        Self {
            source,
            max_file_size,
        }
    }

    /// 매니페스트의 외부 BOM을 로드합니다.
    pub async fn load(&self, manifest: &Manifest) -> Result<BillOfMaterials, BomEngineError> {
        let detected = BomSourceDetector::detect(manifest);
        let external = detected
            .external_path()
            .ok_or_else(|| BomEngineError::InvalidFormat {
                path: manifest.title.clone(),
                reason: "manifest has no external bom declaration".to_owned(),
            })?;

        let path = Path::new(external);
        let content =
            load_text(path, manifest.base_dir(), self.source, self.max_file_size).await?;
        parse_bom_document(&content, path)
    }
}

/// BOM 문서 내용을 파싱합니다.
///
/// 형식은 `path`의 확장자로 결정합니다. JSON/YAML만 허용됩니다.
/// `name`이 없으면 파일 이름(확장자 제외)을 BOM 이름으로 사용합니다.
pub fn parse_bom_document(content: &str, path: &Path) -> Result<BillOfMaterials, BomEngineError> {
    let path_str = path.display().to_string();
    let format = detect_format(path)?;
    if !format.is_bom_format() {
        return Err(BomEngineError::UnsupportedFormat {
            path: path_str,
            extension: extension_of(path),
        });
    }

    let value: Value = format
        .parse(content)
        .map_err(|reason| BomEngineError::InvalidFormat {
            path: path_str.clone(),
            reason,
        })?;

    let Value::Object(ref map) = value else {
        return Err(BomEngineError::InvalidFormat {
            path: path_str,
            reason: "top-level document must be a mapping".to_owned(),
        });
    };

    if !map.contains_key("components") && !map.contains_key("name") {
        return Err(BomEngineError::InvalidFormat {
            path: path_str,
            reason: "mapping must contain 'components' or 'name'".to_owned(),
        });
    }

    let has_name = map.get("name").is_some_and(|n| !n.is_null());

    let mut bom: BillOfMaterials =
        serde_json::from_value(value).map_err(|e| BomEngineError::InvalidFormat {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

    if !has_name {
        bom.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
    }

    Ok(bom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BomDeclaration;
    use crate::source::MemoryContentSource;

    const SAMPLE_BOM_JSON: &str = r#"{
  "name": "Frame kit",
  "components": [
    { "id": "rail", "name": "Rail", "quantity": 4, "unit": "pieces" },
    { "id": "corner", "name": "Corner bracket", "quantity": 8,
      "requirements": { "material": "steel" } }
  ],
  "metadata": { "revision": "B" }
}"#;

    const SAMPLE_BOM_YAML: &str = r#"
name: Electronics
components:
  - id: pcb
    name: Main board
    sub_components:
      - name: MCU
  - id: psu
    name: Power supply
    reference:
      path: ../psu/okh.yaml
"#;

    #[test]
    fn parse_json_bom() {
        let bom = parse_bom_document(SAMPLE_BOM_JSON, Path::new("bom.json")).unwrap();
        assert_eq!(bom.name, "Frame kit");
        assert_eq!(bom.component_count(), 2);
        assert_eq!(bom.components[0].quantity, 4.0);
        assert_eq!(bom.components[1].unit, "pieces");
        assert_eq!(bom.metadata["revision"], "B");
    }

    #[test]
    fn parse_yaml_bom_with_nesting_and_reference() {
        let bom = parse_bom_document(SAMPLE_BOM_YAML, Path::new("bom.yml")).unwrap();
        assert_eq!(bom.name, "Electronics");
        assert_eq!(bom.components[0].sub_components.len(), 1);
        let reference = bom.components[1].reference.as_ref().unwrap();
        assert_eq!(reference.path.as_deref(), Some("../psu/okh.yaml"));
    }

    #[test]
    fn components_only_uses_file_stem_as_name() {
        let bom = parse_bom_document(r#"{"components": []}"#, Path::new("/x/parts.json")).unwrap();
        assert_eq!(bom.name, "parts");
        assert!(bom.is_empty());
    }

    #[test]
    fn rejects_markdown() {
        let err = parse_bom_document("# BOM\n- screw", Path::new("bom.md")).unwrap_err();
        assert!(matches!(err, BomEngineError::UnsupportedFormat { .. }));
    }

    #[test]
    fn rejects_toml_bom() {
        let err = parse_bom_document("name = \"x\"", Path::new("bom.toml")).unwrap_err();
        assert!(matches!(err, BomEngineError::UnsupportedFormat { .. }));
    }

    #[test]
    fn rejects_mapping_without_required_keys() {
        let err = parse_bom_document(r#"{"parts": []}"#, Path::new("bom.json")).unwrap_err();
        assert!(matches!(err, BomEngineError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_non_mapping() {
        let err = parse_bom_document("- a\n- b\n", Path::new("bom.yaml")).unwrap_err();
        assert!(matches!(err, BomEngineError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_unparsable_content() {
        let err = parse_bom_document("{{{ not json", Path::new("bom.json")).unwrap_err();
        assert!(matches!(err, BomEngineError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_wrongly_typed_components() {
        let err =
            parse_bom_document(r#"{"components": "rail"}"#, Path::new("bom.json")).unwrap_err();
        assert!(matches!(err, BomEngineError::InvalidFormat { .. }));
    }

    #[tokio::test]
    async fn load_relative_to_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bom")).unwrap();
        std::fs::write(dir.path().join("bom/parts.json"), SAMPLE_BOM_JSON).unwrap();

        let mut manifest = Manifest::new("Printer");
        manifest.bom = Some(BomDeclaration::Path("bom/parts.json".to_owned()));
        manifest.source_path = Some(dir.path().join("okh.yaml"));

        let loader = ExternalBomLoader::new(None, 1024 * 1024);
        let bom = loader.load(&manifest).await.unwrap();
        assert_eq!(bom.component_count(), 2);
    }

    #[tokio::test]
    async fn load_falls_back_to_content_source() {
        let source = MemoryContentSource::new().with_file("store/bom.yaml", SAMPLE_BOM_YAML);

        let mut manifest = Manifest::new("Printer");
        manifest.bom = Some(BomDeclaration::Path("store/bom.yaml".to_owned()));

        let loader = ExternalBomLoader::new(Some(&source), 1024 * 1024);
        let bom = loader.load(&manifest).await.unwrap();
        assert_eq!(bom.name, "Electronics");
    }

    #[tokio::test]
    async fn load_missing_everywhere_is_not_found() {
        let source = MemoryContentSource::new();
        let mut manifest = Manifest::new("Printer");
        manifest.bom = Some(BomDeclaration::Path("/nonexistent/bom.json".to_owned()));

        let loader = ExternalBomLoader::new(Some(&source), 1024 * 1024);
        let err = loader.load(&manifest).await.unwrap_err();
        assert!(matches!(err, BomEngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_without_external_declaration_fails() {
        let loader = ExternalBomLoader::new(None, 1024);
        let err = loader.load(&Manifest::new("Bare")).await.unwrap_err();
        assert!(matches!(err, BomEngineError::InvalidFormat { .. }));
    }
}
