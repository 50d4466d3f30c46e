use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cache::FileCache;
use tokio_util::sync::CancellationToken;

use super::ports::ImageInspector;
use super::use_case::{CheckUpdateUseCase, ContainerImageContext};
use crate::error::UpdateCheckError;
use crate::floating_tag::FloatingTagMode;

struct StubInspector {
    pull_calls: AtomicUsize,
    pull_fails: bool,
    resolved_id: Option<String>,
}

#[async_trait]
impl ImageInspector for StubInspector {
    async fn pull(&self, _image_reference: &str) -> Result<(), UpdateCheckError> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        if self.pull_fails {
            return Err(UpdateCheckError::PullFailed("private repository".into()));
        }
        Ok(())
    }

    async fn local_image_id(&self, _image_reference: &str) -> Result<Option<String>, UpdateCheckError> {
        Ok(self.resolved_id.clone())
    }
}

fn temp_cache() -> (Arc<FileCache>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("update_cache.json");
    (Arc::new(FileCache::new("update", path, 120)), dir)
}

fn context() -> ContainerImageContext {
    ContainerImageContext {
        host_name: "alpha".into(),
        container_name: "sonarr".into(),
        image_reference: "linuxserver/sonarr:4.0.17".into(),
        current_image_id: "sha256:old".into(),
    }
}

#[tokio::test]
async fn different_digest_after_pull_reports_update_available() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: false,
        resolved_id: Some("sha256:new".into()),
    });

    let result = use_case.check(&context(), inspector, CancellationToken::new()).await;
    assert!(result);
}

#[tokio::test]
async fn matching_digest_reports_no_update() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: false,
        resolved_id: Some("sha256:old".into()),
    });

    let result = use_case.check(&context(), inspector, CancellationToken::new()).await;
    assert!(!result);
}

#[tokio::test]
async fn private_registry_pull_failure_resolves_to_no_update() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: true,
        resolved_id: None,
    });

    let result = use_case.check(&context(), inspector, CancellationToken::new()).await;
    assert!(!result);
}

#[tokio::test]
async fn cancellation_before_pull_short_circuits_without_pulling() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: false,
        resolved_id: Some("sha256:new".into()),
    });
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = use_case.check(&context(), inspector.clone(), cancel).await;
    assert!(!result);
    assert_eq!(inspector.pull_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_check_hits_cache_not_inspector() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: false,
        resolved_id: Some("sha256:new".into()),
    });

    use_case.check(&context(), inspector.clone(), CancellationToken::new()).await;
    use_case.check(&context(), inspector.clone(), CancellationToken::new()).await;
    assert_eq!(inspector.pull_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn check_local_never_pulls() {
    let (cache, _dir) = temp_cache();
    let use_case = CheckUpdateUseCase::new(cache, 5, FloatingTagMode::Disabled);
    let inspector = Arc::new(StubInspector {
        pull_calls: AtomicUsize::new(0),
        pull_fails: false,
        resolved_id: Some("sha256:new".into()),
    });

    let result = use_case.check_local(&context(), inspector.clone()).await;
    assert!(result);
    assert_eq!(inspector.pull_calls.load(Ordering::SeqCst), 0);
}
