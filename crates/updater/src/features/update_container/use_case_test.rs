use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bollard::models::{ContainerConfig, ContainerInspectResponse, ContainerState, HostConfig};

use super::ports::{ContainerEngine, DependentContainer};
use super::use_case::UpdateContainerUseCase;
use crate::effective_config::{EffectiveConfig, NetworkAttachment};
use crate::error::UpdaterError;
use crate::state::UpdateOutcome;

struct StubEngine {
    labels: HashMap<String, String>,
    current_image_id: String,
    pulled_image_id: String,
    dependents: Vec<DependentContainer>,
    fail_create: bool,
    fail_start: bool,
    /// Whether the rollback precheck inspect (the second `inspect` call in
    /// a run) should report the container as already running, short-
    /// circuiting rollback to the implicit-success path.
    precheck_reports_running: bool,
    creates: Mutex<u32>,
    inspect_calls: Mutex<u32>,
}

impl StubEngine {
    fn happy_path() -> Self {
        Self {
            labels: HashMap::new(),
            current_image_id: "sha256:old".into(),
            pulled_image_id: "sha256:new".into(),
            dependents: Vec::new(),
            fail_create: false,
            fail_start: false,
            precheck_reports_running: true,
            creates: Mutex::new(0),
            inspect_calls: Mutex::new(0),
        }
    }
}

fn inspect_for(name: &str, image_id: &str, running: bool) -> ContainerInspectResponse {
    ContainerInspectResponse {
        name: Some(format!("/{name}")),
        image: Some(image_id.to_string()),
        config: Some(ContainerConfig {
            image: Some("linuxserver/sonarr:4.0.17".into()),
            ..Default::default()
        }),
        host_config: Some(HostConfig::default()),
        network_settings: None,
        state: Some(ContainerState { running: Some(running), ..Default::default() }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerEngine for StubEngine {
    async fn inspect(&self, id_or_name: &str) -> Result<ContainerInspectResponse, UpdaterError> {
        let mut calls = self.inspect_calls.lock().unwrap();
        *calls += 1;
        let running = if *calls >= 2 { self.precheck_reports_running } else { true };
        Ok(inspect_for(id_or_name.trim_start_matches('/'), &self.current_image_id, running))
    }

    async fn labels(&self, _id_or_name: &str) -> Result<HashMap<String, String>, UpdaterError> {
        Ok(self.labels.clone())
    }

    async fn dependents(&self, _target_id: &str, _target_name: &str) -> Result<Vec<DependentContainer>, UpdaterError> {
        Ok(self.dependents.clone())
    }

    async fn pull(&self, _image_reference: &str) -> Result<(), UpdaterError> {
        Ok(())
    }

    async fn image_id(&self, _image_reference: &str) -> Result<Option<String>, UpdaterError> {
        Ok(Some(self.pulled_image_id.clone()))
    }

    async fn stop(&self, _id: &str, _timeout_secs: i64) -> Result<(), UpdaterError> {
        Ok(())
    }

    async fn remove(&self, _id: &str) -> Result<(), UpdaterError> {
        Ok(())
    }

    async fn wait_removed(&self, _id: &str) -> Result<(), UpdaterError> {
        Ok(())
    }

    async fn create(&self, name: &str, _image: &str, _effective_config: &EffectiveConfig) -> Result<String, UpdaterError> {
        *self.creates.lock().unwrap() += 1;
        if self.fail_create {
            return Err(UpdaterError::Engine("simulated create failure".into()));
        }
        Ok(format!("new-{name}"))
    }

    async fn connect_network(&self, _container_id: &str, _attachment: &NetworkAttachment) -> Result<(), UpdaterError> {
        Ok(())
    }

    async fn start(&self, id: &str) -> Result<(), UpdaterError> {
        if self.fail_start && id.starts_with("new-") {
            return Err(UpdaterError::Engine("simulated start failure".into()));
        }
        Ok(())
    }

    async fn is_running(&self, _id: &str) -> Result<bool, UpdaterError> {
        Ok(!self.fail_start)
    }

    async fn rename(&self, _id: &str, _new_name: &str) -> Result<(), UpdaterError> {
        Ok(())
    }
}

fn use_case(lock_dir: &std::path::Path) -> UpdateContainerUseCase {
    UpdateContainerUseCase::new(lock_dir.to_path_buf(), 5)
}

#[tokio::test]
async fn container_labelled_skip_is_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = StubEngine::happy_path();
    engine.labels.insert("update.action".into(), "skip".into());
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(engine);

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await
        .unwrap();

    assert!(matches!(result, UpdateOutcome::Blocked(_)));
}

#[tokio::test]
async fn matching_digest_after_pull_is_already_up_to_date() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = StubEngine::happy_path();
    engine.pulled_image_id = engine.current_image_id.clone();
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(engine);

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await
        .unwrap();

    assert_eq!(result, UpdateOutcome::AlreadyUpToDate);
}

#[tokio::test]
async fn differing_digest_replaces_container_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let engine = StubEngine::happy_path();
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(engine);

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await
        .unwrap();

    assert!(matches!(result, UpdateOutcome::Success { .. }));
}

#[tokio::test]
async fn create_failure_with_container_already_running_reports_rollback_succeeded() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = StubEngine::happy_path();
    engine.fail_create = true;
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(engine);

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, UpdaterError::RollbackSucceeded(_)));
}

#[tokio::test]
async fn create_failure_followed_by_failed_recreate_reports_rollback_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = StubEngine::happy_path();
    engine.fail_create = true;
    engine.precheck_reports_running = false;
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(engine);

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, UpdaterError::RollbackFailed { .. }));
}

#[tokio::test]
async fn held_lock_reports_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let _held = crate::lock::ContainerLock::try_acquire(dir.path(), "sonarr").unwrap().unwrap();
    let engine: std::sync::Arc<dyn ContainerEngine> = std::sync::Arc::new(StubEngine::happy_path());

    let result = use_case(dir.path())
        .update(engine, None, "sonarr", "sonarr", None, false)
        .await
        .unwrap();

    assert_eq!(result, UpdateOutcome::InProgress);
}
