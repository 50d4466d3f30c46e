use async_trait::async_trait;

use crate::error::VersionError;

/// Lists every tag published for a repository on one registry. The use
/// case is indifferent to which registry family answered — this port is
/// the seam the use case tests mock against.
#[async_trait]
pub trait TagLister: Send + Sync {
    async fn list_tags(&self, registry: &str, repository: &str) -> Result<Vec<String>, VersionError>;
}
