use async_trait::async_trait;

use crate::error::UpdateCheckError;

/// The engine operations the checker needs: pulling a tag and resolving
/// what image id a reference now points to locally. Implemented against
/// `bollard::Docker` in production (`adapter::BollardImageInspector`) and
/// against a stub in tests.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Pulls `image_reference` (e.g. `linuxserver/sonarr:4.0.18`).
    async fn pull(&self, image_reference: &str) -> Result<(), UpdateCheckError>;
    /// The image id a reference resolves to locally, if it exists at all.
    async fn local_image_id(&self, image_reference: &str) -> Result<Option<String>, UpdateCheckError>;
}
