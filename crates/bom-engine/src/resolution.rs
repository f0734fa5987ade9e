//! 매니페스트 BOM 해석 -- 탐지, 로딩, 변환, 병합을 하나로 묶음
//!
//! ```text
//! Manifest ─> BomSourceDetector ─┬─ External ─> ExternalBomLoader ─┬─ ok ──> merge_boms (내장 부품이 있으면)
//!                                │                                  └─ err ─> 내장 부품 대체 / 빈 BOM
//!                                ├─ Embedded ─> EmbeddedBomConverter
//!                                └─ NoBom ────> 빈 BOM
//! ```
//!
//! 소스 에러는 여기서 복구되며, 결과 BOM의 `source` 메타데이터로 어느 경로를
//! 거쳤는지 기록합니다. 복구된 에러는 진단용으로 [`ResolvedBom::source_error`]에 남습니다.

use tracing::{debug, warn};

use bomwalk_core::metrics as m;

use crate::convert::EmbeddedBomConverter;
use crate::detect::{BomSource, BomSourceDetector};
use crate::error::BomEngineError;
use crate::loader::ExternalBomLoader;
use crate::manifest::Manifest;
use crate::merge::merge_boms;
use crate::source::ContentSource;
use crate::types::BillOfMaterials;

/// `source` 메타데이터 값
pub mod source_tag {
    /// 외부 BOM만 사용
    pub const EXTERNAL: &str = "external";
    /// 내장 부품만 사용
    pub const EMBEDDED: &str = "embedded";
    /// 외부 실패/빈 결과로 내장 부품 사용
    pub const EMBEDDED_FALLBACK: &str = "embedded_fallback";
    /// BOM 데이터 없음
    pub const NONE: &str = "none";
}

/// `fallback_reason` 메타데이터 값
pub mod fallback_reason {
    /// 외부 BOM이 유효하지만 비어 있음
    pub const EXTERNAL_EMPTY: &str = "external_empty";
    /// 외부 BOM 로딩/파싱 실패
    pub const EXTERNAL_FAILED: &str = "external_failed";
}

/// BOM 해석 결과
#[derive(Debug)]
pub struct ResolvedBom {
    /// 해석된 BOM (실패 시에도 항상 존재, 비어 있을 수 있음)
    pub bom: BillOfMaterials,
    /// 복구된 외부 BOM 에러
    pub source_error: Option<BomEngineError>,
}

impl ResolvedBom {
    fn ok(bom: BillOfMaterials) -> Self {
        Self {
            bom,
            source_error: None,
        }
    }

    /// `source` 메타데이터 값을 반환합니다.
    pub fn source(&self) -> &str {
        self.bom
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or(source_tag::EXTERNAL)
    }
}

/// 매니페스트 BOM 해석기
pub struct BomResolution<'a> {
    source: Option<&'a dyn ContentSource>,
    max_file_size: usize,
    fallback_on_empty_external: bool,
}

impl<'a> BomResolution<'a> {
    /// 해석기를 생성합니다.
    pub fn new(
        source: Option<&'a dyn ContentSource>,
        max_file_size: usize,
        fallback_on_empty_external: bool,
    ) -> Self {
        Self {
            source,
            max_file_size,
            fallback_on_empty_external,
        }
    }

    /// 매니페스트의 BOM을 해석합니다. 실패하지 않습니다.
    pub async fn resolve(&self, manifest: &Manifest) -> ResolvedBom {
        let detected = BomSourceDetector::detect(manifest);
        debug!(manifest = %manifest.title, source = %detected.kind(), "bom source detected");

        let resolved = match detected {
            BomSource::NoBom => ResolvedBom::ok(empty_bom(manifest)),
            BomSource::Embedded => {
                let mut bom = EmbeddedBomConverter::convert(manifest);
                bom.set_metadata("source", source_tag::EMBEDDED);
                bom.set_metadata("component_count", bom.component_count());
                ResolvedBom::ok(bom)
            }
            BomSource::ExternalPath(_) | BomSource::ExternalRef(_) => {
                self.resolve_external(manifest).await
            }
        };

        metrics::counter!(m::BOM_RESOLUTIONS_TOTAL, m::LABEL_SOURCE => resolved.source().to_owned())
            .increment(1);
        resolved
    }

    async fn resolve_external(&self, manifest: &Manifest) -> ResolvedBom {
        let loader = ExternalBomLoader::new(self.source, self.max_file_size);

        match loader.load(manifest).await {
            Ok(external) => {
                metrics::counter!(m::BOM_EXTERNAL_LOADS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);

                if external.is_empty() {
                    if self.fallback_on_empty_external && manifest.has_embedded_parts() {
                        debug!(manifest = %manifest.title, "external bom is empty, using embedded parts");
                        return ResolvedBom::ok(embedded_fallback(
                            manifest,
                            fallback_reason::EXTERNAL_EMPTY,
                            None,
                        ));
                    }
                    return ResolvedBom::ok(external);
                }

                if manifest.has_embedded_parts() {
                    ResolvedBom::ok(merge_boms(EmbeddedBomConverter::convert(manifest), external))
                } else {
                    ResolvedBom::ok(external)
                }
            }
            Err(e) => {
                metrics::counter!(m::BOM_EXTERNAL_LOADS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                warn!(manifest = %manifest.title, error = %e, "external bom unavailable");

                let bom = if manifest.has_embedded_parts() {
                    embedded_fallback(manifest, fallback_reason::EXTERNAL_FAILED, Some(&e))
                } else {
                    let mut bom = empty_bom(manifest);
                    bom.set_metadata("fallback_reason", fallback_reason::EXTERNAL_FAILED);
                    bom.set_metadata("external_error", e.to_string());
                    bom
                };

                ResolvedBom {
                    bom,
                    source_error: Some(e),
                }
            }
        }
    }
}

fn empty_bom(manifest: &Manifest) -> BillOfMaterials {
    let mut bom = BillOfMaterials::new(manifest.title.clone());
    bom.set_metadata("source", source_tag::NONE);
    bom
}

fn embedded_fallback(
    manifest: &Manifest,
    reason: &str,
    error: Option<&BomEngineError>,
) -> BillOfMaterials {
    let mut bom = EmbeddedBomConverter::convert(manifest);
    bom.set_metadata("source", source_tag::EMBEDDED_FALLBACK);
    bom.set_metadata("fallback_reason", reason);
    bom.set_metadata("component_count", bom.component_count());
    if let Some(e) = error {
        bom.set_metadata("external_error", e.to_string());
    }
    bom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{BomDeclaration, PartSpec};
    use crate::merge::MERGED_SOURCE;
    use crate::source::MemoryContentSource;

    const MAX: usize = 1024 * 1024;

    fn manifest_with_external(path: &str) -> Manifest {
        let mut manifest = Manifest::new("Printer");
        manifest.bom = Some(BomDeclaration::Path(path.to_owned()));
        manifest
    }

    fn with_part(mut manifest: Manifest, name: &str, id: &str) -> Manifest {
        let mut part = PartSpec::new(name);
        part.id = Some(id.to_owned());
        manifest.parts.push(part);
        manifest
    }

    #[tokio::test]
    async fn no_bom_yields_empty_bom() {
        let resolved = BomResolution::new(None, MAX, true)
            .resolve(&Manifest::new("Bare"))
            .await;
        assert!(resolved.bom.is_empty());
        assert_eq!(resolved.bom.name, "Bare");
        assert_eq!(resolved.source(), source_tag::NONE);
        assert!(resolved.source_error.is_none());
    }

    #[tokio::test]
    async fn embedded_only() {
        let manifest = with_part(Manifest::new("Printer"), "Housing", "housing");
        let resolved = BomResolution::new(None, MAX, true).resolve(&manifest).await;
        assert_eq!(resolved.source(), source_tag::EMBEDDED);
        assert_eq!(resolved.bom.metadata["component_count"], 1);
    }

    #[tokio::test]
    async fn external_only_is_returned_unmodified() {
        let source = MemoryContentSource::new().with_file(
            "bom.json",
            r#"{"name": "Kit", "components": [{"id": "a", "name": "A"}], "metadata": {"rev": 2}}"#,
        );
        let resolved = BomResolution::new(Some(&source), MAX, true)
            .resolve(&manifest_with_external("bom.json"))
            .await;
        assert_eq!(resolved.bom.name, "Kit");
        assert_eq!(resolved.bom.component_count(), 1);
        assert_eq!(resolved.bom.metadata.len(), 1);
        assert_eq!(resolved.bom.metadata["rev"], 2);
    }

    #[tokio::test]
    async fn external_and_embedded_are_merged() {
        let source = MemoryContentSource::new().with_file(
            "bom.json",
            r#"{"components": [{"id": "housing", "name": "Housing"}, {"id": "motor", "name": "Motor"}]}"#,
        );
        let manifest = with_part(manifest_with_external("bom.json"), "Housing", "housing");
        let resolved = BomResolution::new(Some(&source), MAX, true)
            .resolve(&manifest)
            .await;

        assert_eq!(resolved.source(), MERGED_SOURCE);
        assert_eq!(resolved.bom.component_count(), 2);
        assert_eq!(resolved.bom.metadata["embedded_count"], 1);
        assert_eq!(resolved.bom.metadata["external_count"], 2);
    }

    #[tokio::test]
    async fn failed_external_falls_back_to_embedded() {
        let source = MemoryContentSource::new().with_file("bom.json", "not json at all {");
        let manifest = with_part(manifest_with_external("bom.json"), "Housing", "housing");
        let resolved = BomResolution::new(Some(&source), MAX, true)
            .resolve(&manifest)
            .await;

        assert_eq!(resolved.source(), source_tag::EMBEDDED_FALLBACK);
        assert_eq!(
            resolved.bom.metadata["fallback_reason"],
            fallback_reason::EXTERNAL_FAILED
        );
        assert_eq!(resolved.bom.component_count(), 1);
        assert!(matches!(
            resolved.source_error,
            Some(BomEngineError::InvalidFormat { .. })
        ));
    }

    #[tokio::test]
    async fn failed_external_without_embedded_is_empty() {
        let source = MemoryContentSource::new().with_file("bom.yaml", "components: [unclosed");
        let resolved = BomResolution::new(Some(&source), MAX, true)
            .resolve(&manifest_with_external("bom.yaml"))
            .await;
        assert!(resolved.bom.is_empty());
        assert_eq!(resolved.source(), source_tag::NONE);
        assert!(resolved.source_error.is_some());
    }

    #[tokio::test]
    async fn empty_external_falls_back_when_enabled() {
        let source = MemoryContentSource::new().with_file("bom.json", r#"{"name": "Empty"}"#);
        let manifest = with_part(manifest_with_external("bom.json"), "Housing", "housing");

        let resolved = BomResolution::new(Some(&source), MAX, true)
            .resolve(&manifest)
            .await;
        assert_eq!(resolved.source(), source_tag::EMBEDDED_FALLBACK);
        assert_eq!(
            resolved.bom.metadata["fallback_reason"],
            fallback_reason::EXTERNAL_EMPTY
        );
        assert!(resolved.source_error.is_none());
    }

    #[tokio::test]
    async fn empty_external_is_kept_when_fallback_disabled() {
        let source = MemoryContentSource::new().with_file("bom.json", r#"{"name": "Empty"}"#);
        let manifest = with_part(manifest_with_external("bom.json"), "Housing", "housing");

        let resolved = BomResolution::new(Some(&source), MAX, false)
            .resolve(&manifest)
            .await;
        assert_eq!(resolved.bom.name, "Empty");
        assert!(resolved.bom.is_empty());
    }
}
