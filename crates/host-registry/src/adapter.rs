use async_trait::async_trait;
use bollard::Docker;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{EngineClient, EngineClientError, EngineClientFactory};

pub struct BollardEngineClient {
    docker: Docker,
}

#[async_trait]
impl EngineClient for BollardEngineClient {
    async fn ping(&self) -> Result<(), EngineClientError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| EngineClientError::Unreachable(e.to_string()))
    }

    async fn host_name(&self) -> Result<String, EngineClientError> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| EngineClientError::Unreachable(e.to_string()))?;
        info.name
            .ok_or_else(|| EngineClientError::Unreachable("engine reported no name".into()))
    }

    fn docker(&self) -> Docker {
        self.docker.clone()
    }
}

#[derive(Default)]
pub struct BollardEngineClientFactory;

#[async_trait]
impl EngineClientFactory for BollardEngineClientFactory {
    async fn connect(
        &self,
        url: &str,
        connect_timeout_secs: u64,
    ) -> Result<Arc<dyn EngineClient>, EngineClientError> {
        let docker = if url.starts_with("unix://") || url.is_empty() {
            Docker::connect_with_unix(url, connect_timeout_secs, bollard::API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(url, connect_timeout_secs, bollard::API_DEFAULT_VERSION)
        }
        .map_err(|e| EngineClientError::Unreachable(e.to_string()))?;

        let client = BollardEngineClient { docker };
        let ping_fut = client.ping();
        tokio::time::timeout(Duration::from_secs(connect_timeout_secs), ping_fut)
            .await
            .map_err(|_| EngineClientError::Unreachable("ping timed out".into()))??;

        Ok(Arc::new(client))
    }
}
