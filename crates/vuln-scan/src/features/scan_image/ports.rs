use async_trait::async_trait;
use kernel::ErrorKind;
use kernel::error::Classified;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("image name failed validation: {0}")]
    InvalidInput(String),
    #[error("scanner is unavailable: {0}")]
    ScannerUnavailable(String),
    #[error("scanner invocation timed out")]
    Timeout,
    #[error("scanner call failed: {0}")]
    ExecutionError(String),
    #[error("could not resolve image digest: {0}")]
    DigestResolution(String),
}

impl Classified for ScanError {
    fn kind(&self) -> ErrorKind {
        match self {
            ScanError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScanError::ScannerUnavailable(_) | ScanError::Timeout => ErrorKind::ScannerUnavailable,
            ScanError::ExecutionError(_) | ScanError::DigestResolution(_) => {
                ErrorKind::ScannerUnavailable
            }
        }
    }
}

/// The external scanner service (Trivy-shaped in the reference, but any
/// scanner exposing a health check and a scan-by-image call fits this
/// port). Treated as a process with unbounded runtime — the use case
/// wraps every call in a bounded-wait wrapper.
#[async_trait]
pub trait ScannerClient: Send + Sync {
    /// Cheap liveness probe; callers cache the result for 30s themselves.
    async fn health_check(&self) -> Result<bool, ScanError>;
    /// Executes the scan and returns the scanner's raw JSON response.
    async fn scan_raw(&self, image: &str) -> Result<Value, ScanError>;
}

/// Resolves the effective image digest for a running container's image,
/// implemented against whichever container-engine client handle the
/// caller already holds. Kept generic over the engine so this crate never
/// depends on `bollard` directly.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    async fn resolve_digest(&self, image_reference: &str) -> Result<String, ScanError>;
}
