use async_trait::async_trait;
use bollard::models::ContainerInspectResponse;

use crate::effective_config::NetworkAttachment;
use crate::error::UpdaterError;

/// A dependent container, discovered by `NetworkMode: container:<target>`.
#[derive(Debug, Clone)]
pub struct DependentContainer {
    pub id: String,
    pub name: String,
}

/// The slice of a container engine the updater needs to replace a
/// container in place. Implemented by `adapter::BollardContainerEngine`
/// in production and by an in-memory stub in tests, mirroring how
/// `update-checker`'s `ImageInspector` is mocked.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn inspect(&self, id_or_name: &str) -> Result<ContainerInspectResponse, UpdaterError>;
    async fn labels(&self, id_or_name: &str) -> Result<std::collections::HashMap<String, String>, UpdaterError>;
    async fn dependents(&self, target_id: &str, target_name: &str) -> Result<Vec<DependentContainer>, UpdaterError>;
    async fn pull(&self, image_reference: &str) -> Result<(), UpdaterError>;
    async fn image_id(&self, image_reference: &str) -> Result<Option<String>, UpdaterError>;
    async fn stop(&self, id: &str, timeout_secs: i64) -> Result<(), UpdaterError>;
    async fn remove(&self, id: &str) -> Result<(), UpdaterError>;
    async fn wait_removed(&self, id: &str) -> Result<(), UpdaterError>;
    async fn create(&self, name: &str, image: &str, effective_config: &crate::effective_config::EffectiveConfig) -> Result<String, UpdaterError>;
    async fn connect_network(&self, container_id: &str, attachment: &NetworkAttachment) -> Result<(), UpdaterError>;
    async fn start(&self, id: &str) -> Result<(), UpdaterError>;
    async fn is_running(&self, id: &str) -> Result<bool, UpdaterError>;
    async fn rename(&self, id: &str, new_name: &str) -> Result<(), UpdaterError>;
}
