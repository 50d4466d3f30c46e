use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cache::FileCache;

use super::ports::TagLister;
use super::use_case::CheckVersionUseCase;
use crate::error::VersionError;

struct StubLister {
    tags: Vec<&'static str>,
    calls: AtomicUsize,
}

impl StubLister {
    fn new(tags: Vec<&'static str>) -> Self {
        Self { tags, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl TagLister for StubLister {
    async fn list_tags(&self, _registry: &str, _repository: &str) -> Result<Vec<String>, VersionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tags.iter().map(|t| t.to_string()).collect())
    }
}

fn temp_cache() -> (Arc<FileCache>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("version_cache.json");
    (Arc::new(FileCache::new("version", path, 3600)), dir)
}

#[tokio::test]
async fn finds_newest_stable_candidate() {
    let (cache, _dir) = temp_cache();
    let lister = Arc::new(StubLister::new(vec!["1.41.3", "1.41.4", "1.42.0-beta", "1.40.0"]));
    let use_case = CheckVersionUseCase::new(cache, lister);

    let result = use_case.check_for_newer_version("linuxserver/plex:1.41.3").await.unwrap();
    assert_eq!(result.tag, "1.41.4");
}

#[tokio::test]
async fn unstable_candidates_are_skipped_unless_current_is_unstable() {
    let (cache, _dir) = temp_cache();
    let lister = Arc::new(StubLister { tags: vec!["1.0.0-beta"] });
    let use_case = CheckVersionUseCase::new(cache, lister);

    assert!(use_case.check_for_newer_version("app:0.9.0").await.is_none());
}

#[tokio::test]
async fn no_candidates_caches_negative_result() {
    let (cache, _dir) = temp_cache();
    let lister = Arc::new(StubLister { tags: vec!["1.0.0"] });
    let use_case = CheckVersionUseCase::new(cache, lister);

    assert!(use_case.check_for_newer_version("app:2.0.0").await.is_none());
    assert!(use_case.get_cached_version("app:2.0.0").await.is_none());
    let (value, valid) = use_case.cache.get("app:2.0.0").await;
    assert!(valid);
    assert_eq!(value, Some(serde_json::Value::Null));
}

#[tokio::test]
async fn narrower_segment_candidates_are_dropped() {
    let (cache, _dir) = temp_cache();
    let lister = Arc::new(StubLister { tags: vec!["5.14"] });
    let use_case = CheckVersionUseCase::new(cache, lister);

    assert!(use_case.check_for_newer_version("app:5.14.0.9383-ls272").await.is_none());
}

#[tokio::test]
async fn available_versions_are_capped_and_sorted_newest_first() {
    let (cache, _dir) = temp_cache();
    let lister = Arc::new(StubLister { tags: vec!["1.0.0", "1.1.0", "1.2.0", "1.3.0-beta"] });
    let use_case = CheckVersionUseCase::new(cache, lister);

    let versions = use_case.get_available_versions("app:1.0.0", 2).await;
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].tag, "1.2.0");
}
