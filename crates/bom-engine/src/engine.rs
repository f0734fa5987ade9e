//! BOM 엔진 -- 해석과 전개의 진입점
//!
//! [`BomEngine`]은 설정과 콘텐츠 소스를 묶어 두 가지 연산을 제공합니다.
//!
//! - [`BomEngine::resolve_bom`]: 매니페스트 -> BOM (탐지, 외부 로딩, 내장 변환, 병합, 대체)
//! - [`BomEngine::explode`]: BOM -> 평탄화된 [`ComponentMatch`](crate::types::ComponentMatch) 목록
//!
//! # 사용 예시
//!
//! ```
//! use bomwalk_bom_engine::{BomEngine, ExplodeOptions, Manifest, PartSpec};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = BomEngine::builder().build().unwrap();
//!
//! let mut manifest = Manifest::new("Printer");
//! manifest.parts.push(PartSpec::new("Housing"));
//!
//! let explosion = engine
//!     .explode_manifest(&manifest, &ExplodeOptions::new(5))
//!     .await
//!     .unwrap();
//! assert_eq!(explosion.total_matches(), 1);
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use bomwalk_core::metrics as m;

use crate::config::{BomEngineConfig, check_max_depth};
use crate::detect::{BomSource, BomSourceDetector};
use crate::error::BomEngineError;
use crate::explode::{ExplodeOptions, Exploder, Explosion};
use crate::manifest::Manifest;
use crate::resolution::{BomResolution, ResolvedBom};
use crate::source::{ContentSource, FsContentSource};
use crate::types::BillOfMaterials;

/// BOM 해석 및 전개 엔진
pub struct BomEngine {
    config: BomEngineConfig,
    source: Option<Arc<dyn ContentSource>>,
}

impl BomEngine {
    /// 빌더를 생성합니다.
    pub fn builder() -> BomEngineBuilder {
        BomEngineBuilder::new()
    }

    /// 엔진 설정을 반환합니다.
    pub fn config(&self) -> &BomEngineConfig {
        &self.config
    }

    /// 콘텐츠 소스 이름을 반환합니다 (없으면 None).
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().map(|source| source.name())
    }

    /// 설정의 기본 최대 깊이로 전개 옵션을 생성합니다.
    pub fn default_options(&self) -> ExplodeOptions {
        ExplodeOptions::new(self.config.max_depth)
    }

    /// 매니페스트의 BOM 소스를 분류합니다.
    pub fn detect(&self, manifest: &Manifest) -> BomSource {
        BomSourceDetector::detect(manifest)
    }

    /// 매니페스트의 BOM을 해석합니다.
    ///
    /// 소스 에러는 내장 부품 대체 또는 빈 BOM으로 복구되므로 실패하지 않습니다.
    pub async fn resolve_bom(&self, manifest: &Manifest) -> BillOfMaterials {
        self.resolve_bom_detailed(manifest).await.bom
    }

    /// 매니페스트의 BOM을 해석하고, 복구된 에러도 함께 반환합니다.
    pub async fn resolve_bom_detailed(&self, manifest: &Manifest) -> ResolvedBom {
        self.resolution().resolve(manifest).await
    }

    /// BOM을 깊이 0부터 전개합니다.
    #[instrument(skip_all, fields(bom = %bom.name, max_depth = options.max_depth))]
    pub async fn explode(
        &self,
        bom: &BillOfMaterials,
        options: &ExplodeOptions,
    ) -> Result<Explosion, BomEngineError> {
        self.explode_at(bom, options, 0, None, &[]).await
    }

    /// 주어진 깊이, 부모, 이름 경로에서 BOM을 전개합니다.
    ///
    /// `options.max_depth`가 1-64 범위를 벗어나면 `Config`,
    /// `depth >= options.max_depth`이면 결과 없이 `DepthExceeded`를 반환합니다.
    pub async fn explode_at(
        &self,
        bom: &BillOfMaterials,
        options: &ExplodeOptions,
        depth: usize,
        parent_id: Option<&str>,
        path: &[String],
    ) -> Result<Explosion, BomEngineError> {
        check_max_depth(options.max_depth)?;

        let started = Instant::now();
        let exploder = Exploder::new(self.source.as_deref(), &self.config, options);

        let result = exploder
            .explode(bom, depth, parent_id, path, options.base_dir.as_deref())
            .await;

        metrics::histogram!(m::BOM_EXPLOSION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(explosion) => {
                metrics::counter!(m::BOM_EXPLOSIONS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                metrics::counter!(m::BOM_COMPONENTS_EMITTED_TOTAL)
                    .increment(explosion.total_matches() as u64);
                info!(
                    bom = %bom.name,
                    matches = explosion.total_matches(),
                    unresolved = explosion.unresolved_count(),
                    diagnostics = explosion.diagnostics.len(),
                    "bom exploded"
                );
                Ok(explosion)
            }
            Err(e) => {
                metrics::counter!(m::BOM_EXPLOSIONS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                Err(e)
            }
        }
    }

    /// 매니페스트의 BOM을 해석한 뒤 전개합니다.
    ///
    /// 옵션에 기준 디렉토리가 없으면 매니페스트 파일의 디렉토리를 사용합니다.
    pub async fn explode_manifest(
        &self,
        manifest: &Manifest,
        options: &ExplodeOptions,
    ) -> Result<Explosion, BomEngineError> {
        let bom = self.resolve_bom(manifest).await;

        match (&options.base_dir, manifest.base_dir()) {
            (None, Some(dir)) => {
                let options = options.clone().with_base_dir(dir);
                self.explode(&bom, &options).await
            }
            _ => self.explode(&bom, options).await,
        }
    }

    fn resolution(&self) -> BomResolution<'_> {
        BomResolution::new(
            self.source.as_deref(),
            self.config.max_file_size,
            self.config.fallback_on_empty_external,
        )
    }
}

/// [`BomEngine`] 빌더
pub struct BomEngineBuilder {
    config: BomEngineConfig,
    source: Option<Arc<dyn ContentSource>>,
    filesystem_source: bool,
}

impl BomEngineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: BomEngineConfig::default(),
            source: None,
            filesystem_source: false,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: BomEngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 콘텐츠 소스를 지정합니다.
    pub fn content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// 설정의 `manifest_dirs`를 검색하는 파일시스템 소스를 사용합니다.
    ///
    /// `content_source`가 지정되어 있으면 무시됩니다.
    pub fn filesystem_source(mut self) -> Self {
        self.filesystem_source = true;
        self
    }

    /// 엔진을 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패 시 `BomEngineError::Config` 반환
    pub fn build(self) -> Result<BomEngine, BomEngineError> {
        self.config.validate()?;

        let source = match self.source {
            Some(source) => Some(source),
            None if self.filesystem_source => Some(Arc::new(FsContentSource::new(
                self.config.manifest_roots(),
                self.config.max_file_size,
            )) as Arc<dyn ContentSource>),
            None => None,
        };

        Ok(BomEngine {
            config: self.config,
            source,
        })
    }
}

impl Default for BomEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 매니페스트 파일을 읽어 파싱합니다 (크기 제한 적용).
pub async fn load_manifest_file(
    path: &Path,
    max_file_size: usize,
) -> Result<Manifest, BomEngineError> {
    let content = crate::source::read_file_capped(path, max_file_size).await?;
    Manifest::parse(&content, path)
}
