//! 재귀 컴포넌트 전개
//!
//! BOM을 내장 하위 컴포넌트와 참조된 매니페스트를 따라 내려가며 평탄한
//! [`ComponentMatch`] 목록으로 펼칩니다.
//!
//! # 순서 보장
//!
//! - 형제 컴포넌트는 선언 순서대로 결과에 나타납니다 (동시 전개 후 순서대로 합침).
//! - 컴포넌트의 자손(참조 전개 결과, 내장 하위 컴포넌트 결과 순)은 그 컴포넌트보다 앞에 옵니다.
//! - `depth == path.len() - 1`
//!
//! # 실패 처리
//!
//! 진입 깊이가 `max_depth` 이상인 호출만 `DepthExceeded`로 실패합니다.
//! 그 외 실패(참조 해석 실패, 하위 BOM 로딩 실패, 취소, 깊이 상한에 걸린 자식)는
//! [`Diagnostic`]으로 기록되고 전개는 계속됩니다. 순환 참조는 깊이 상한으로만 멈춥니다.

use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use bomwalk_core::future::BoxFuture;
use bomwalk_core::metrics as m;

use crate::config::BomEngineConfig;
use crate::error::BomEngineError;
use crate::manifest::Manifest;
use crate::resolution::BomResolution;
use crate::resolver::{ReferenceResolver, ResolveOutcome};
use crate::source::ContentSource;
use crate::types::{BillOfMaterials, Component, ComponentMatch, ComponentReference};

/// 전개 호출 옵션
///
/// 최대 깊이는 설정에서 읽지 않고 호출마다 명시적으로 전달됩니다.
#[derive(Debug, Clone)]
pub struct ExplodeOptions {
    /// 최대 전개 깊이
    pub max_depth: usize,
    /// 최상위 BOM의 상대 경로 참조 기준 디렉토리
    pub base_dir: Option<PathBuf>,
    /// 취소 토큰
    pub cancel: Option<CancellationToken>,
}

impl ExplodeOptions {
    /// 최대 깊이만 지정한 옵션을 생성합니다.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            base_dir: None,
            cancel: None,
        }
    }

    /// 기준 디렉토리를 지정합니다.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// 취소 토큰을 지정합니다.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// 진단 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// 참조를 찾지 못했거나 지원하지 않는 형식
    UnresolvedReference,
    /// 참조 로딩/파싱 실패
    ResolutionFailed,
    /// 로딩 도중 취소
    Cancelled,
    /// 참조된 매니페스트의 BOM 로딩 또는 전개 실패
    NestedBomFailed,
    /// 깊이 상한 때문에 자식을 전개하지 않음
    DepthCeiling,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference => write!(f, "unresolved_reference"),
            Self::ResolutionFailed => write!(f, "resolution_failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::NestedBomFailed => write!(f, "nested_bom_failed"),
            Self::DepthCeiling => write!(f, "depth_ceiling"),
        }
    }
}

/// 전개 중 복구된 소프트 실패
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 관련 컴포넌트의 이름 경로
    pub path: Vec<String>,
    /// 종류
    pub kind: DiagnosticKind,
    /// 사람이 읽을 수 있는 설명
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path.join(" > "), self.message)
    }
}

/// 전개 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explosion {
    /// 평탄화된 전개 결과 (자식이 부모보다 먼저)
    pub matches: Vec<ComponentMatch>,
    /// 복구된 실패 목록
    pub diagnostics: Vec<Diagnostic>,
}

impl Explosion {
    /// 전체 결과 수
    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }

    /// 결과 중 가장 깊은 깊이 (결과가 없으면 None)
    pub fn max_depth_reached(&self) -> Option<usize> {
        self.matches.iter().map(|m| m.depth).max()
    }

    /// 해석되지 않은 참조를 가진 결과 수
    pub fn unresolved_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.has_unresolved_reference)
            .count()
    }

    /// 최상위(깊이 0) 결과
    pub fn roots(&self) -> impl Iterator<Item = &ComponentMatch> {
        self.matches.iter().filter(|m| m.is_root())
    }

    /// 진단 없이 끝났는지 확인합니다.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 결과 목록만 꺼냅니다.
    pub fn into_matches(self) -> Vec<ComponentMatch> {
        self.matches
    }

    fn append(&mut self, other: Explosion) {
        self.matches.extend(other.matches);
        self.diagnostics.extend(other.diagnostics);
    }

    fn push_diagnostic(&mut self, path: &[String], kind: DiagnosticKind, message: String) {
        self.diagnostics.push(Diagnostic {
            path: path.to_vec(),
            kind,
            message,
        });
    }
}

/// 전개 실행기 (전개 호출 하나의 수명 동안 유지)
pub(crate) struct Exploder<'a> {
    source: Option<&'a dyn ContentSource>,
    resolution: BomResolution<'a>,
    max_file_size: usize,
    max_depth: usize,
    cancel: Option<&'a CancellationToken>,
    loads: Semaphore,
}

impl<'a> Exploder<'a> {
    pub(crate) fn new(
        source: Option<&'a dyn ContentSource>,
        config: &BomEngineConfig,
        options: &'a ExplodeOptions,
    ) -> Self {
        Self {
            source,
            resolution: BomResolution::new(
                source,
                config.max_file_size,
                config.fallback_on_empty_external,
            ),
            max_file_size: config.max_file_size,
            max_depth: options.max_depth,
            cancel: options.cancel.as_ref(),
            loads: Semaphore::new(config.max_concurrent_loads.max(1)),
        }
    }

    /// `depth`에서 BOM을 전개합니다.
    ///
    /// 형제 컴포넌트는 동시에 전개되며 결과는 선언 순서대로 합쳐집니다.
    pub(crate) fn explode<'s>(
        &'s self,
        bom: &'s BillOfMaterials,
        depth: usize,
        parent_id: Option<&'s str>,
        parent_path: &'s [String],
        base: Option<&'s Path>,
    ) -> BoxFuture<'s, Result<Explosion, BomEngineError>> {
        Box::pin(async move {
            if depth >= self.max_depth {
                return Err(BomEngineError::DepthExceeded {
                    depth,
                    max_depth: self.max_depth,
                });
            }

            let branches = bom.components.iter().map(|component| {
                Box::pin(self.explode_component(component, depth, parent_id, parent_path, base))
            });

            let mut explosion = Explosion::default();
            for branch in join_all(branches).await {
                explosion.append(branch);
            }
            Ok(explosion)
        })
    }

    async fn explode_component(
        &self,
        component: &Component,
        depth: usize,
        parent_id: Option<&str>,
        parent_path: &[String],
        base: Option<&Path>,
    ) -> Explosion {
        let mut path = Vec::with_capacity(parent_path.len() + 1);
        path.extend_from_slice(parent_path);
        path.push(component.name.clone());

        let mut own = ComponentMatch::new(
            component.clone(),
            depth,
            parent_id.map(str::to_owned),
            path.clone(),
        );
        let mut explosion = Explosion::default();
        let children_fit = depth + 1 < self.max_depth;

        if let Some(reference) = component.reference.as_ref() {
            match self.source {
                Some(source) => match self.resolve_reference(source, reference, base).await {
                    ResolveOutcome::Resolved(manifest) => {
                        if children_fit {
                            self.explode_referenced(&manifest, component, depth, &path, &mut explosion)
                                .await;
                        } else {
                            explosion.push_diagnostic(
                                &path,
                                DiagnosticKind::DepthCeiling,
                                format!(
                                    "referenced manifest '{}' not expanded: depth {} reaches max depth {}",
                                    manifest.title,
                                    depth + 1,
                                    self.max_depth
                                ),
                            );
                        }
                        own.resolved_manifest = Some(manifest);
                    }
                    outcome => {
                        debug!(
                            component = %component.name,
                            reference = %reference,
                            outcome = %outcome,
                            "reference unresolved, continuing with inline data"
                        );
                        metrics::counter!(m::BOM_UNRESOLVED_REFERENCES_TOTAL).increment(1);
                        let kind = match outcome {
                            ResolveOutcome::Failed(_) => DiagnosticKind::ResolutionFailed,
                            ResolveOutcome::Cancelled => DiagnosticKind::Cancelled,
                            _ => DiagnosticKind::UnresolvedReference,
                        };
                        explosion.push_diagnostic(&path, kind, outcome.to_string());
                        own.mark_unresolved(reference.clone());
                    }
                },
                None => {
                    debug!(component = %component.name, "no content source, reference not followed");
                }
            }
        }

        if !component.sub_components.is_empty() {
            if children_fit {
                let singles: Vec<BillOfMaterials> = component
                    .sub_components
                    .iter()
                    .cloned()
                    .map(BillOfMaterials::singleton)
                    .collect();
                let branches = singles.iter().map(|single| {
                    self.explode(single, depth + 1, Some(component.id.as_str()), &path, base)
                });

                for (single, result) in singles.iter().zip(join_all(branches).await) {
                    match result {
                        Ok(sub) => explosion.append(sub),
                        Err(e) => {
                            warn!(component = %single.name, error = %e, "sub-component explosion failed");
                            explosion.push_diagnostic(
                                &path,
                                DiagnosticKind::NestedBomFailed,
                                format!("sub-component '{}': {e}", single.name),
                            );
                        }
                    }
                }
            } else {
                explosion.push_diagnostic(
                    &path,
                    DiagnosticKind::DepthCeiling,
                    format!(
                        "{} sub-components not expanded: depth {} reaches max depth {}",
                        component.sub_components.len(),
                        depth + 1,
                        self.max_depth
                    ),
                );
            }
        }

        explosion.matches.push(own);
        explosion
    }

    async fn resolve_reference(
        &self,
        source: &dyn ContentSource,
        reference: &ComponentReference,
        base: Option<&Path>,
    ) -> ResolveOutcome {
        let Ok(_permit) = self.acquire_load().await else {
            return ResolveOutcome::Cancelled;
        };
        ReferenceResolver::new(source, self.max_file_size)
            .with_cancellation(self.cancel)
            .resolve(Some(reference), base)
            .await
    }

    /// 참조된 매니페스트의 BOM을 해석하여 한 단계 아래에서 전개합니다.
    async fn explode_referenced(
        &self,
        manifest: &Manifest,
        component: &Component,
        depth: usize,
        path: &[String],
        explosion: &mut Explosion,
    ) {
        let load = async {
            let _permit = self.acquire_load().await?;
            Ok::<_, BomEngineError>(self.resolution.resolve(manifest).await)
        };
        let Some(Ok(resolved)) = self.cancellable(load).await else {
            explosion.push_diagnostic(
                path,
                DiagnosticKind::Cancelled,
                format!("loading bom of '{}' cancelled", manifest.title),
            );
            return;
        };

        if let Some(ref e) = resolved.source_error {
            explosion.push_diagnostic(
                path,
                DiagnosticKind::NestedBomFailed,
                format!("bom of '{}' unavailable: {e}", manifest.title),
            );
        }

        let nested = self
            .explode(
                &resolved.bom,
                depth + 1,
                Some(component.id.as_str()),
                path,
                manifest.base_dir(),
            )
            .await;

        match nested {
            Ok(sub) => explosion.append(sub),
            Err(e) => {
                warn!(component = %component.name, manifest = %manifest.title, error = %e, "nested bom explosion failed");
                explosion.push_diagnostic(
                    path,
                    DiagnosticKind::NestedBomFailed,
                    format!("explosion of '{}' failed: {e}", manifest.title),
                );
            }
        }
    }

    /// 로딩 슬롯을 얻습니다. 닫힌 세마포어는 취소로 취급합니다.
    async fn acquire_load(&self) -> Result<SemaphorePermit<'_>, BomEngineError> {
        self.loads
            .acquire()
            .await
            .map_err(|_| BomEngineError::Cancelled)
    }

    async fn cancellable<F: Future>(&self, work: F) -> Option<F::Output> {
        match self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    output = work => Some(output),
                }
            }
            None => Some(work.await),
        }
    }
}
