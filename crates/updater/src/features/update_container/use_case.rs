use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::ports::ContainerEngine;
use crate::effective_config::EffectiveConfig;
use crate::error::UpdaterError;
use crate::lock::ContainerLock;
use crate::orchestrator::{substitute_image_line, OrchestratorClient};
use crate::state::{UpdateOutcome, UpdateState};

const UPDATE_ACTION_LABEL: &str = "update.action";
const STOP_TIMEOUT_SECS: i64 = 10;
const POST_START_SETTLE: Duration = Duration::from_millis(500);

/// One container's replace-in-place update, covering both the
/// external-orchestrator shortcut and the engine-level state machine
/// fallback. One instance is shared across calls; all per-call state is
/// local to the `update` invocation.
pub struct UpdateContainerUseCase {
    lock_dir: PathBuf,
    pull_timeout_secs: u64,
}

impl UpdateContainerUseCase {
    pub fn new(lock_dir: PathBuf, pull_timeout_secs: u64) -> Self {
        Self { lock_dir, pull_timeout_secs }
    }

    /// Attempts the declarative-orchestrator path first when configured;
    /// on any failure (not managed, request error, service not found)
    /// falls through to the engine path rather than propagating.
    #[instrument(skip(self, engine, orchestrator), fields(container = %target_name))]
    pub async fn update(
        &self,
        engine: Arc<dyn ContainerEngine>,
        orchestrator: Option<Arc<dyn OrchestratorClient>>,
        target_id: &str,
        target_name: &str,
        new_tag: Option<&str>,
        force: bool,
    ) -> Result<UpdateOutcome, UpdaterError> {
        if let Some(orchestrator) = &orchestrator {
            match self.try_orchestrator(orchestrator.as_ref(), target_name, new_tag).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!(error = %e, "orchestrator path unavailable, falling back to engine path");
                }
            }
        }
        self.update_via_engine(engine, target_id, target_name, new_tag, force).await
    }

    async fn try_orchestrator(
        &self,
        orchestrator: &dyn OrchestratorClient,
        target_name: &str,
        new_tag: Option<&str>,
    ) -> Result<UpdateOutcome, crate::orchestrator::OrchestratorError> {
        let membership = orchestrator.stack_for_container(target_name).await?;
        let compose = orchestrator.fetch_compose(&membership.stack_id).await?;

        let redeployed = match new_tag {
            Some(tag) => {
                let new_reference = format!("{}:{tag}", membership.service_name);
                let patched = substitute_image_line(&compose, &membership.service_name, &new_reference)?;
                orchestrator.redeploy(&membership.stack_id, &patched).await?;
                patched
            }
            None => {
                orchestrator.redeploy(&membership.stack_id, &compose).await?;
                compose
            }
        };
        let _ = redeployed;

        Ok(UpdateOutcome::Success {
            message: format!("redeployed via orchestrator stack {}", membership.stack_name),
        })
    }

    #[instrument(skip(self, engine), fields(container = %target_name))]
    async fn update_via_engine(
        &self,
        engine: Arc<dyn ContainerEngine>,
        target_id: &str,
        target_name: &str,
        new_tag: Option<&str>,
        force: bool,
    ) -> Result<UpdateOutcome, UpdaterError> {
        let lock = ContainerLock::try_acquire(&self.lock_dir, target_id)
            .map_err(|e| UpdaterError::Engine(e.to_string()))?;
        let Some(_lock) = lock else {
            return Ok(UpdateOutcome::InProgress);
        };
        let mut state = UpdateState::Locked;

        let labels = engine.labels(target_id).await?;
        if let Some(action) = labels.get(UPDATE_ACTION_LABEL) {
            if action == "skip" || action == "pin" {
                return Ok(UpdateOutcome::Blocked(format!("container labelled update.action={action}")));
            }
        }

        let dependents = engine.dependents(target_id, target_name).await?;

        let inspect = engine.inspect(target_id).await?;
        let effective = EffectiveConfig::extract(&inspect);
        state = UpdateState::ConfigExtracted;
        info!(?state, "effective configuration captured");

        let (base_name, _current_tag) = effective
            .image
            .rsplit_once(':')
            .unwrap_or((effective.image.as_str(), "latest"));
        let candidate_reference = match new_tag {
            Some(tag) => format!("{base_name}:{tag}"),
            None => effective.image.clone(),
        };

        tokio::time::timeout(Duration::from_secs(self.pull_timeout_secs), engine.pull(&candidate_reference))
            .await
            .map_err(|_| UpdaterError::Engine("pull timed out".into()))??;

        let new_image_id = engine.image_id(&candidate_reference).await?;
        let current_image_id = inspect.image.clone().unwrap_or_default();

        if !force {
            if let Some(new_id) = &new_image_id {
                if *new_id == current_image_id {
                    return Ok(UpdateOutcome::AlreadyUpToDate);
                }
            }
        }

        let original_image_reference = effective.image.clone();

        let replace_result = self
            .replace_container(engine.as_ref(), target_id, &candidate_reference, &effective, &mut state)
            .await;

        let new_target_id = match replace_result {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "replace failed, attempting rollback");
                return self.rollback(engine.as_ref(), &effective, &original_image_reference, e).await;
            }
        };

        let dependents_result = self
            .recreate_dependents(engine.as_ref(), &new_target_id, &dependents)
            .await;
        if let Err(e) = dependents_result {
            warn!(error = %e, "dependent recreation failed after successful target replace");
            return Err(e);
        }
        state = UpdateState::DependentsRecreated;
        info!(?state, "dependents recreated");

        state = UpdateState::Success;
        info!(?state, "update complete");
        Ok(UpdateOutcome::Success { message: "updated".into() })
    }

    async fn replace_container(
        &self,
        engine: &dyn ContainerEngine,
        target_id: &str,
        candidate_reference: &str,
        effective: &EffectiveConfig,
        state: &mut UpdateState,
    ) -> Result<String, UpdaterError> {
        engine.stop(target_id, STOP_TIMEOUT_SECS).await?;
        *state = UpdateState::OldStopped;

        engine.remove(target_id).await?;
        engine.wait_removed(target_id).await?;
        *state = UpdateState::OldRemoved;

        let new_id = engine.create(&effective.name, candidate_reference, effective).await?;
        *state = UpdateState::NewCreated;

        for attachment in &effective.networks {
            engine.connect_network(&new_id, attachment).await?;
        }

        engine.start(&new_id).await?;
        tokio::time::sleep(POST_START_SETTLE).await;
        if !engine.is_running(&new_id).await? {
            return Err(UpdaterError::Engine("replacement container did not reach running state".into()));
        }
        *state = UpdateState::NewRunning;
        Ok(new_id)
    }

    async fn recreate_dependents(
        &self,
        engine: &dyn ContainerEngine,
        new_target_id: &str,
        dependents: &[super::ports::DependentContainer],
    ) -> Result<(), UpdaterError> {
        for dependent in dependents {
            let inspect = engine.inspect(&dependent.id).await?;
            let effective = EffectiveConfig::extract(&inspect);
            let temp_name = format!("{}-updating", dependent.name);

            engine.rename(&dependent.id, &temp_name).await?;

            let mut effective = effective;
            effective.network_mode = Some(format!("container:{new_target_id}"));

            let create_result = engine.create(&dependent.name, &effective.image, &effective).await;
            let new_id = match create_result {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, dependent = %dependent.name, "dependent recreate failed, restoring original");
                    engine.rename(&dependent.id, &dependent.name).await?;
                    engine.start(&dependent.id).await?;
                    return Err(e);
                }
            };

            if let Err(e) = engine.start(&new_id).await {
                warn!(error = %e, dependent = %dependent.name, "dependent start failed, restoring original");
                engine.rename(&dependent.id, &dependent.name).await?;
                engine.start(&dependent.id).await?;
                return Err(e);
            }

            engine.remove(&dependent.id).await?;
        }
        Ok(())
    }

    async fn rollback(
        &self,
        engine: &dyn ContainerEngine,
        effective: &EffectiveConfig,
        original_image_reference: &str,
        cause: UpdaterError,
    ) -> Result<UpdateOutcome, UpdaterError> {
        if let Ok(inspect) = engine.inspect(&effective.name).await {
            let running = inspect.state.and_then(|s| s.running).unwrap_or(false);
            if running {
                return Err(UpdaterError::RollbackSucceeded(format!(
                    "update failed ({cause}) but a container named {:?} is already running; treating as recovered",
                    effective.name
                )));
            }
        }

        let recreate_result = engine.create(&effective.name, original_image_reference, effective).await;
        match recreate_result {
            Ok(new_id) => {
                for attachment in &effective.networks {
                    let _ = engine.connect_network(&new_id, attachment).await;
                }
                match engine.start(&new_id).await {
                    Ok(()) => Err(UpdaterError::RollbackSucceeded(format!(
                        "update failed ({cause}), original container {:?} restored",
                        effective.name
                    ))),
                    Err(start_err) => Err(UpdaterError::RollbackFailed {
                        original_name: effective.name.clone(),
                        detail: format!("update failed ({cause}); rollback recreate succeeded but start failed ({start_err})"),
                    }),
                }
            }
            Err(recreate_err) => Err(UpdaterError::RollbackFailed {
                original_name: effective.name.clone(),
                detail: format!("update failed ({cause}); rollback recreate also failed ({recreate_err})"),
            }),
        }
    }
}
