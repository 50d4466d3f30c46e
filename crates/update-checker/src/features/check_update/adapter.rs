use async_trait::async_trait;
use bollard::Docker;
use bollard::image::CreateImageOptions;
use futures_util::StreamExt;

use super::ports::ImageInspector;
use crate::error::UpdateCheckError;

/// Pulls and inspects images against a live `bollard::Docker` connection,
/// the same handle the host registry hands out per endpoint.
pub struct BollardImageInspector {
    docker: Docker,
}

impl BollardImageInspector {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ImageInspector for BollardImageInspector {
    async fn pull(&self, image_reference: &str) -> Result<(), UpdateCheckError> {
        let options = CreateImageOptions {
            from_image: image_reference,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            if let Err(e) = progress {
                return Err(UpdateCheckError::PullFailed(e.to_string()));
            }
        }
        Ok(())
    }

    async fn local_image_id(&self, image_reference: &str) -> Result<Option<String>, UpdateCheckError> {
        match self.docker.inspect_image(image_reference).await {
            Ok(inspect) => Ok(inspect.id),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => Ok(None),
            Err(e) => Err(UpdateCheckError::InspectFailed(e.to_string())),
        }
    }
}
