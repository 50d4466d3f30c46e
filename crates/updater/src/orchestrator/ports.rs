use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("orchestrator request failed: {0}")]
    Request(String),
    #[error("container is not managed by the orchestrator")]
    NotManaged,
    #[error("service line for {0:?} not found in compose document")]
    ServiceNotFound(String),
}

/// Identifies the declarative stack/service a container belongs to, as
/// reported by the orchestrator's own bookkeeping.
#[derive(Debug, Clone)]
pub struct StackMembership {
    pub stack_id: String,
    pub stack_name: String,
    pub service_name: String,
}

/// The subset of a declarative-orchestrator API the updater needs:
/// locate the stack owning a container, fetch/patch its compose
/// document, and trigger a redeploy. Implemented by `PortainerClient`
/// in production.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// True when the two required environment variables are present; a
    /// pure check with no network call, so callers can decide whether to
    /// attempt this path at all before constructing a client.
    fn is_configured() -> bool
    where
        Self: Sized;

    async fn stack_for_container(&self, container_name: &str) -> Result<StackMembership, OrchestratorError>;

    async fn fetch_compose(&self, stack_id: &str) -> Result<String, OrchestratorError>;

    async fn redeploy(&self, stack_id: &str, compose: &str) -> Result<(), OrchestratorError>;
}
