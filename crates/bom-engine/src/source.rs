//! 콘텐츠 로딩 협력자 -- 매니페스트와 파일을 어디서 가져올지 추상화
//!
//! [`ContentSource`] trait은 엔진이 외부 저장소에 접근하는 유일한 경계입니다.
//! 엔진은 이 trait의 모든 실패를 소프트 실패로 다루며 상위로 전파하지 않습니다.
//!
//! # 구현체
//!
//! - [`MemoryContentSource`]: ID별 매니페스트 + 논리 경로별 파일 (테스트, 임베딩용)
//! - [`FsContentSource`]: 설정된 디렉토리에서 파일 읽기 및 매니페스트 ID 검색
//!
//! 구현체는 여러 분기에서 동시에 호출될 수 있으므로 재진입 가능해야 합니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use bomwalk_core::future::BoxFuture;

use crate::error::BomEngineError;
use crate::format::DocumentFormat;
use crate::manifest::Manifest;

/// 매니페스트 검색 시 내려가는 최대 디렉토리 깊이
const MAX_MANIFEST_SCAN_DEPTH: usize = 2;

/// 콘텐츠 로딩 협력자
pub trait ContentSource: Send + Sync {
    /// 소스 이름 (로그용)
    fn name(&self) -> &str;

    /// ID로 매니페스트를 로드합니다.
    ///
    /// 찾지 못하면 `Ok(None)`을 반환합니다.
    fn load_manifest(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Manifest>, BomEngineError>>;

    /// 파일 내용을 로드합니다.
    ///
    /// `path`가 상대 경로이고 `base`가 주어지면 `base` 기준으로 해석합니다.
    /// 찾지 못하면 `BomEngineError::NotFound`를 반환합니다.
    fn load_file<'a>(
        &'a self,
        path: &'a Path,
        base: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<String, BomEngineError>>;
}

/// 상대 경로를 기준 디렉토리에 대해 해석합니다.
///
/// 절대 경로이거나 기준이 없으면 그대로 반환합니다.
pub fn resolve_path(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if !path.is_absolute() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// 크기 제한을 두고 파일을 읽습니다.
pub async fn read_file_capped(path: &Path, max_size: usize) -> Result<String, BomEngineError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BomEngineError::NotFound {
                path: path.display().to_string(),
            }
        } else {
            BomEngineError::Io {
                path: path.display().to_string(),
                source: e,
            }
        }
    })?;

    if !metadata.is_file() {
        return Err(BomEngineError::NotFound {
            path: path.display().to_string(),
        });
    }

    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > max_size {
        return Err(BomEngineError::FileTooBig {
            path: path.display().to_string(),
            size,
            max: max_size,
        });
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BomEngineError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

/// 파일시스템에서 먼저 읽고, 읽지 못하면 콘텐츠 소스에 위임합니다.
///
/// 크기 초과는 위임하지 않고 그대로 반환합니다.
/// 어느 쪽에서도 읽지 못하면 `NotFound`를 반환합니다.
pub async fn load_text(
    path: &Path,
    base: Option<&Path>,
    source: Option<&dyn ContentSource>,
    max_size: usize,
) -> Result<String, BomEngineError> {
    let resolved = resolve_path(path, base);

    match read_file_capped(&resolved, max_size).await {
        Ok(content) => return Ok(content),
        Err(e @ BomEngineError::FileTooBig { .. }) => return Err(e),
        Err(e) => {
            debug!(path = %resolved.display(), error = %e, "direct read failed, delegating to content source");
        }
    }

    let Some(source) = source else {
        return Err(BomEngineError::NotFound {
            path: resolved.display().to_string(),
        });
    };

    source.load_file(path, base).await.map_err(|e| {
        debug!(
            path = %resolved.display(),
            source = source.name(),
            error = %e,
            "content source could not load file"
        );
        match e {
            e @ BomEngineError::FileTooBig { .. } => e,
            _ => BomEngineError::NotFound {
                path: resolved.display().to_string(),
            },
        }
    })
}

// ─── MemoryContentSource ─────────────────────────────────────────────

/// 메모리 기반 콘텐츠 소스
///
/// 객체 저장소처럼 논리 경로로 파일을 제공하거나, 테스트에서 매니페스트 저장소를
/// 대신합니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
    manifests: HashMap<Uuid, Manifest>,
    files: HashMap<PathBuf, String>,
}

impl MemoryContentSource {
    /// 빈 소스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// ID로 조회할 매니페스트를 등록합니다.
    pub fn with_manifest(mut self, id: Uuid, manifest: Manifest) -> Self {
        self.insert_manifest(id, manifest);
        self
    }

    /// 논리 경로로 조회할 파일을 등록합니다.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert_file(path, content);
        self
    }

    /// 매니페스트를 등록합니다.
    pub fn insert_manifest(&mut self, id: Uuid, manifest: Manifest) {
        self.manifests.insert(id, manifest);
    }

    /// 파일을 등록합니다.
    pub fn insert_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// 등록된 매니페스트 수를 반환합니다.
    pub fn manifest_count(&self) -> usize {
        self.manifests.len()
    }

    /// 등록된 파일 수를 반환합니다.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl ContentSource for MemoryContentSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_manifest(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Manifest>, BomEngineError>> {
        Box::pin(async move { Ok(self.manifests.get(&id).cloned()) })
    }

    fn load_file<'a>(
        &'a self,
        path: &'a Path,
        base: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<String, BomEngineError>> {
        Box::pin(async move {
            let resolved = resolve_path(path, base);
            self.files
                .get(&resolved)
                .or_else(|| self.files.get(path))
                .cloned()
                .ok_or_else(|| BomEngineError::NotFound {
                    path: resolved.display().to_string(),
                })
        })
    }
}

// ─── FsContentSource ─────────────────────────────────────────────────

/// 파일시스템 기반 콘텐츠 소스
///
/// - 파일: 기준 경로로 해석한 뒤, 없으면 각 검색 디렉토리에 대해 해석합니다.
/// - 매니페스트: 검색 디렉토리(하위 1단계 포함)의 json/yaml/toml 문서 중
///   `id`가 일치하는 것을 찾습니다.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    roots: Vec<PathBuf>,
    max_file_size: usize,
}

impl FsContentSource {
    /// 검색 디렉토리와 파일 크기 제한으로 소스를 생성합니다.
    pub fn new(roots: Vec<PathBuf>, max_file_size: usize) -> Self {
        Self {
            roots,
            max_file_size,
        }
    }

    /// 검색 디렉토리 목록을 반환합니다.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn find_manifest(&self, id: Uuid) -> Result<Option<Manifest>, BomEngineError> {
        for root in &self.roots {
            let mut pending = vec![(root.clone(), 0usize)];

            while let Some((dir, level)) = pending.pop() {
                let mut entries = match tokio::fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        debug!(dir = %dir.display(), error = %e, "cannot read manifest directory, skipping");
                        continue;
                    }
                };

                while let Some(entry) =
                    entries
                        .next_entry()
                        .await
                        .map_err(|e| BomEngineError::Io {
                            path: dir.display().to_string(),
                            source: e,
                        })?
                {
                    let path = entry.path();
                    let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());

                    if is_dir {
                        if level + 1 < MAX_MANIFEST_SCAN_DEPTH {
                            pending.push((path, level + 1));
                        }
                        continue;
                    }

                    if DocumentFormat::from_path(&path).is_none() {
                        continue;
                    }

                    let content = match read_file_capped(&path, self.max_file_size).await {
                        Ok(c) => c,
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "skipping unreadable candidate");
                            continue;
                        }
                    };

                    match Manifest::parse(&content, &path) {
                        Ok(manifest) if manifest.uuid() == Some(id) => return Ok(Some(manifest)),
                        Ok(_) => {}
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "not a manifest, skipping");
                        }
                    }
                }
            }
        }

        Ok(None)
    }
}

impl ContentSource for FsContentSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn load_manifest(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Manifest>, BomEngineError>> {
        Box::pin(self.find_manifest(id))
    }

    fn load_file<'a>(
        &'a self,
        path: &'a Path,
        base: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<String, BomEngineError>> {
        Box::pin(async move {
            let mut candidates = vec![resolve_path(path, base)];
            if !path.is_absolute() {
                candidates.extend(self.roots.iter().map(|root| root.join(path)));
            }

            for candidate in &candidates {
                match read_file_capped(candidate, self.max_file_size).await {
                    Ok(content) => return Ok(content),
                    Err(BomEngineError::NotFound { .. }) => continue,
                    Err(e) => return Err(e),
                }
            }

            Err(BomEngineError::NotFound {
                path: path.display().to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_against_base() {
        let resolved = resolve_path(Path::new("bom.json"), Some(Path::new("/okh/m")));
        assert_eq!(resolved, PathBuf::from("/okh/m/bom.json"));
    }

    #[test]
    fn resolve_absolute_ignores_base() {
        let resolved = resolve_path(Path::new("/abs/bom.json"), Some(Path::new("/okh/m")));
        assert_eq!(resolved, PathBuf::from("/abs/bom.json"));
    }

    #[test]
    fn resolve_without_base_is_identity() {
        assert_eq!(resolve_path(Path::new("a/b.yaml"), None), PathBuf::from("a/b.yaml"));
    }

    #[tokio::test]
    async fn memory_source_manifest_lookup() {
        let id = Uuid::new_v4();
        let source = MemoryContentSource::new().with_manifest(id, Manifest::new("Motor"));
        assert_eq!(source.manifest_count(), 1);

        let found = source.load_manifest(id).await.unwrap();
        assert_eq!(found.unwrap().title, "Motor");
        assert!(source.load_manifest(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_source_file_with_base() {
        let source = MemoryContentSource::new().with_file("/store/m/bom.json", "{}");
        let content = source
            .load_file(Path::new("bom.json"), Some(Path::new("/store/m")))
            .await
            .unwrap();
        assert_eq!(content, "{}");
    }

    #[tokio::test]
    async fn memory_source_missing_file() {
        let source = MemoryContentSource::new();
        let err = source.load_file(Path::new("nope.json"), None).await.unwrap_err();
        assert!(matches!(err, BomEngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn read_file_capped_rejects_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        std::fs::write(&path, "x".repeat(64)).unwrap();

        let err = read_file_capped(&path, 16).await.unwrap_err();
        assert!(matches!(err, BomEngineError::FileTooBig { size: 64, max: 16, .. }));
    }

    #[tokio::test]
    async fn read_file_capped_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file_capped(dir.path(), 1024).await.unwrap_err();
        assert!(matches!(err, BomEngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_text_prefers_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bom.json"), "{\"name\": \"disk\"}").unwrap();
        let source = MemoryContentSource::new()
            .with_file(dir.path().join("bom.json"), "{\"name\": \"memory\"}");

        let content = load_text(Path::new("bom.json"), Some(dir.path()), Some(&source), 1024)
            .await
            .unwrap();
        assert!(content.contains("disk"));
    }

    #[tokio::test]
    async fn load_text_delegates_to_source() {
        let source = MemoryContentSource::new().with_file("remote/bom.json", "{}");
        let content = load_text(Path::new("remote/bom.json"), None, Some(&source), 1024)
            .await
            .unwrap();
        assert_eq!(content, "{}");
    }

    #[tokio::test]
    async fn load_text_without_source_is_not_found() {
        let err = load_text(Path::new("/nonexistent/bom.json"), None, None, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, BomEngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fs_source_loads_file_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bom.yaml"), "name: x\n").unwrap();

        let source = FsContentSource::new(vec![dir.path().to_path_buf()], 1024);
        let content = source.load_file(Path::new("bom.yaml"), None).await.unwrap();
        assert_eq!(content, "name: x\n");
    }

    #[tokio::test]
    async fn fs_source_finds_manifest_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let project = dir.path().join("gripper");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(
            project.join("okh.toml"),
            format!("id = \"{id}\"\ntitle = \"Gripper\"\n"),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.json"), "not json").unwrap();

        let source = FsContentSource::new(vec![dir.path().to_path_buf()], 1024 * 1024);
        let manifest = source.load_manifest(id).await.unwrap().unwrap();
        assert_eq!(manifest.title, "Gripper");
        assert_eq!(manifest.base_dir(), Some(project.as_path()));

        assert!(source.load_manifest(Uuid::new_v4()).await.unwrap().is_none());
    }
}
