//! 컴포넌트 참조 해석기
//!
//! [`ComponentReference`]를 따라 참조된 매니페스트를 찾습니다.
//! 해석 실패는 에러가 아니라 [`ResolveOutcome`]의 한 경우입니다.
//!
//! # 해석 순서
//!
//! 1. `okh_id` -- UUID로 파싱 후 [`ContentSource::load_manifest`]. 파싱 실패는 기록 후 다음 단계로
//! 2. `path` -- 기준 경로로 해석, 파일 로드 후 [`Manifest::parse`] (JSON/YAML/TOML)
//! 3. `url` -- 지원하지 않음
//! 4. 인식 가능한 키가 없으면 지원하지 않는 참조 형식
//!
//! 취소 토큰이 주어지면 로딩 도중 취소를 감지하여 `Cancelled`를 돌려줍니다.

use std::fmt;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BomEngineError;
use crate::manifest::Manifest;
use crate::source::{ContentSource, load_text, resolve_path};
use crate::types::ComponentReference;

/// 참조 해석 결과
#[derive(Debug)]
pub enum ResolveOutcome {
    /// 매니페스트를 찾음
    Resolved(Box<Manifest>),
    /// ID 또는 경로로 찾지 못함
    NotFound,
    /// URL 참조 또는 인식 가능한 키가 없는 참조
    Unsupported,
    /// 로딩/파싱 도중 실패
    Failed(BomEngineError),
    /// 로딩 도중 취소됨
    Cancelled,
}

impl ResolveOutcome {
    /// 해석된 매니페스트를 꺼냅니다. 그 외 결과는 모두 `None`입니다.
    pub fn into_manifest(self) -> Option<Manifest> {
        match self {
            Self::Resolved(manifest) => Some(*manifest),
            _ => None,
        }
    }

    /// 해석에 성공했는지 확인합니다.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(manifest) => write!(f, "resolved '{}'", manifest.title),
            Self::NotFound => write!(f, "referenced manifest not found"),
            Self::Unsupported => write!(f, "unsupported reference format"),
            Self::Failed(e) => write!(f, "resolution failed: {e}"),
            Self::Cancelled => write!(f, "resolution cancelled"),
        }
    }
}

/// 컴포넌트 참조 해석기
pub struct ReferenceResolver<'a> {
    source: &'a dyn ContentSource,
    max_file_size: usize,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> ReferenceResolver<'a> {
    /// 해석기를 생성합니다.
    pub fn new(source: &'a dyn ContentSource, max_file_size: usize) -> Self {
        Self {
            source,
            max_file_size,
            cancel: None,
        }
    }

    /// 취소 토큰을 지정합니다.
    pub fn with_cancellation(mut self, cancel: Option<&'a CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 참조를 해석합니다.
    ///
    /// `base`는 상대 경로 참조의 기준 디렉토리입니다. 참조가 없으면 `NotFound`입니다.
    pub async fn resolve(
        &self,
        reference: Option<&ComponentReference>,
        base: Option<&Path>,
    ) -> ResolveOutcome {
        let Some(reference) = reference else {
            return ResolveOutcome::NotFound;
        };

        if !reference.has_recognized_key() {
            debug!(reference = %reference, "unsupported reference format");
            return ResolveOutcome::Unsupported;
        }

        let mut last = ResolveOutcome::NotFound;

        if let Some(ref id) = reference.okh_id {
            match Uuid::parse_str(id.trim()) {
                Ok(uuid) => {
                    let outcome = self.by_id(uuid).await;
                    if outcome.is_resolved() || matches!(outcome, ResolveOutcome::Cancelled) {
                        return outcome;
                    }
                    last = outcome;
                }
                Err(e) => {
                    warn!(okh_id = %id, error = %e, "reference id is not a valid uuid, trying other keys");
                }
            }
        }

        if let Some(ref path) = reference.path {
            return self.by_path(Path::new(path.trim()), base).await;
        }

        if let Some(ref url) = reference.url {
            debug!(url = %url, "url references are not supported");
            if matches!(last, ResolveOutcome::NotFound) {
                return ResolveOutcome::Unsupported;
            }
        }

        last
    }

    async fn by_id(&self, id: Uuid) -> ResolveOutcome {
        match self.cancellable(self.source.load_manifest(id)).await {
            Err(BomEngineError::Cancelled) => ResolveOutcome::Cancelled,
            Ok(Some(manifest)) => ResolveOutcome::Resolved(Box::new(manifest)),
            Ok(None) => {
                debug!(okh_id = %id, source = self.source.name(), "manifest not found by id");
                ResolveOutcome::NotFound
            }
            Err(e) => {
                debug!(okh_id = %id, error = %e, "manifest lookup by id failed");
                ResolveOutcome::Failed(e)
            }
        }
    }

    async fn by_path(&self, path: &Path, base: Option<&Path>) -> ResolveOutcome {
        let resolved = resolve_path(path, base);
        let load = load_text(path, base, Some(self.source), self.max_file_size);

        let content = match self.cancellable(load).await {
            Ok(content) => content,
            Err(BomEngineError::Cancelled) => return ResolveOutcome::Cancelled,
            Err(BomEngineError::NotFound { .. }) => {
                debug!(path = %resolved.display(), "referenced manifest file not found");
                return ResolveOutcome::NotFound;
            }
            Err(e) => return ResolveOutcome::Failed(e),
        };

        match Manifest::parse(&content, &resolved) {
            Ok(manifest) => ResolveOutcome::Resolved(Box::new(manifest)),
            Err(e) => {
                debug!(path = %resolved.display(), error = %e, "referenced manifest could not be parsed");
                ResolveOutcome::Failed(e)
            }
        }
    }

    /// 취소 토큰이 있으면 로딩과 경합시킵니다.
    async fn cancellable<T, F>(&self, load: F) -> Result<T, BomEngineError>
    where
        F: Future<Output = Result<T, BomEngineError>>,
    {
        match self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(BomEngineError::Cancelled),
                    result = load => result,
                }
            }
            None => load.await,
        }
    }
}
