use async_trait::async_trait;
use bollard::Docker;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EngineClientError {
    #[error("engine ping failed: {0}")]
    Unreachable(String),
}

/// A handle to one container-engine API endpoint. Implemented by
/// `adapter::BollardEngineClient` in production and by a mock in tests.
///
/// `docker()` hands downstream crates (inventory, vuln-scan's digest
/// resolver, updater) the raw `bollard::Docker` connection this endpoint
/// already negotiated, rather than this crate re-deriving a bespoke port
/// method for every container/service/image call those crates need —
/// `bollard::Docker` is cheap to clone (it wraps its transport in an Arc)
/// and is itself the natural seam to mock against in those crates' tests.
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn ping(&self) -> Result<(), EngineClientError>;
    /// The engine-reported name (`docker info`'s `Name` field), used as a
    /// fallback when no name was configured for this endpoint.
    async fn host_name(&self) -> Result<String, EngineClientError>;
    /// The underlying connection, for crates that need the full engine API.
    fn docker(&self) -> Docker;
}

/// Constructs an `EngineClient` for a given transport URL with a bounded
/// connect timeout. Kept as a trait (rather than a bare function) so tests
/// can substitute a factory that never touches a real socket.
#[async_trait]
pub trait EngineClientFactory: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        connect_timeout_secs: u64,
    ) -> Result<Arc<dyn EngineClient>, EngineClientError>;
}
