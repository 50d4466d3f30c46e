use std::sync::Arc;
use std::time::Duration;

use cache::FileCache;
use kernel::UpdateDecision;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::ports::ImageInspector;
use crate::error::UpdateCheckError;
use crate::floating_tag::{self, FloatingTagMode};

/// The host, container and image identity a version check runs
/// against, flattened into one value so the use case never needs to
/// know how the caller obtained them.
#[derive(Debug, Clone)]
pub struct ContainerImageContext {
    pub host_name: String,
    pub container_name: String,
    /// `repository:tag` as currently configured on the container.
    pub image_reference: String,
    /// The image id the running container is actually pinned to.
    pub current_image_id: String,
}

impl ContainerImageContext {
    fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.host_name, self.container_name, self.image_reference)
    }

    fn split(&self) -> (&str, &str) {
        match self.image_reference.rsplit_once(':') {
            Some((base, tag)) => (base, tag),
            None => (self.image_reference.as_str(), "latest"),
        }
    }
}

/// Pulls a candidate image by tag, compares digests with the running
/// container, and caches the boolean decision. Cancellation is
/// cooperative: a shared token is polled before the pull, after the
/// pull, and around every logged transition.
pub struct CheckUpdateUseCase {
    cache: Arc<FileCache>,
    pull_timeout_secs: u64,
    floating_tag_mode: FloatingTagMode,
}

impl CheckUpdateUseCase {
    pub fn new(cache: Arc<FileCache>, pull_timeout_secs: u64, floating_tag_mode: FloatingTagMode) -> Self {
        Self { cache, pull_timeout_secs, floating_tag_mode }
    }

    /// Cache-only lookup, used by the inventory collector's read path.
    pub async fn get_cached_decision(&self, context: &ContainerImageContext) -> Option<bool> {
        let (value, valid) = self.cache.get(&context.cache_key()).await;
        if !valid {
            return None;
        }
        value
            .and_then(|v| serde_json::from_value::<UpdateDecision>(v).ok())
            .map(|d| d.update_available)
    }

    /// Pulls the rewritten tag and compares digests. Failures during the
    /// pull (private repositories, offline registries) resolve to "no
    /// update" rather than propagating, per §4.F and §7 `private_registry`.
    #[instrument(skip(self, inspector, cancel), fields(host = %context.host_name, container = %context.container_name))]
    pub async fn check(
        &self,
        context: &ContainerImageContext,
        inspector: Arc<dyn ImageInspector>,
        cancel: CancellationToken,
    ) -> bool {
        let cache_key = context.cache_key();
        let (value, valid) = self.cache.get(&cache_key).await;
        if valid {
            if let Some(decision) = value.and_then(|v| serde_json::from_value::<UpdateDecision>(v).ok()) {
                return decision.update_available;
            }
        }

        if cancel.is_cancelled() {
            return self.finish(&cache_key, false).await;
        }

        let (base_name, tag) = context.split();
        let rewritten_tag = floating_tag::rewrite(tag, self.floating_tag_mode);
        let candidate_reference = format!("{base_name}:{rewritten_tag}");

        let pull = inspector.pull(&candidate_reference);
        let pulled = match tokio::time::timeout(Duration::from_secs(self.pull_timeout_secs), pull).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(image = %candidate_reference, error = %e, "pull failed, resolving to no update");
                false
            }
            Err(_) => {
                warn!(image = %candidate_reference, "pull timed out, resolving to no update");
                false
            }
        };

        if cancel.is_cancelled() {
            return self.finish(&cache_key, false).await;
        }
        if !pulled {
            return self.finish(&cache_key, false).await;
        }

        let update_available = match inspector.local_image_id(&candidate_reference).await {
            Ok(Some(new_id)) => new_id != context.current_image_id,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "post-pull inspect failed, resolving to no update");
                false
            }
        };

        if cancel.is_cancelled() {
            return self.finish(&cache_key, false).await;
        }

        info!(update_available, "update check complete");
        self.finish(&cache_key, update_available).await
    }

    /// The non-pulling variant: asks whether the tag already resolves
    /// locally to a different image id, without touching the network.
    #[instrument(skip(self, inspector), fields(host = %context.host_name, container = %context.container_name))]
    pub async fn check_local(&self, context: &ContainerImageContext, inspector: Arc<dyn ImageInspector>) -> bool {
        match inspector.local_image_id(&context.image_reference).await {
            Ok(Some(local_id)) => local_id != context.current_image_id,
            _ => false,
        }
    }

    async fn finish(&self, cache_key: &str, update_available: bool) -> bool {
        let decision = UpdateDecision { update_available };
        self.cache
            .set(cache_key, serde_json::to_value(decision).unwrap_or(serde_json::Value::Null))
            .await;
        update_available
    }
}
