use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, EndpointSettings, HostConfig, PortBinding, RestartPolicy};
use futures_util::StreamExt;

use super::ports::{ContainerEngine, DependentContainer};
use crate::effective_config::{EffectiveConfig, NetworkAttachment};
use crate::error::UpdaterError;

pub struct BollardContainerEngine {
    docker: Docker,
}

impl BollardContainerEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerEngine for BollardContainerEngine {
    async fn inspect(&self, id_or_name: &str) -> Result<ContainerInspectResponse, UpdaterError> {
        self.docker
            .inspect_container(id_or_name, None)
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))
    }

    async fn labels(&self, id_or_name: &str) -> Result<HashMap<String, String>, UpdaterError> {
        let inspect = self.inspect(id_or_name).await?;
        Ok(inspect.config.and_then(|c| c.labels).unwrap_or_default())
    }

    async fn dependents(&self, target_id: &str, target_name: &str) -> Result<Vec<DependentContainer>, UpdaterError> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))?;

        let target_by_id = format!("container:{target_id}");
        let target_by_name = format!("container:{target_name}");

        let mut dependents = Vec::new();
        for summary in containers {
            let Some(id) = summary.id.clone() else { continue };
            let inspect = self.inspect(&id).await?;
            let network_mode = inspect.host_config.and_then(|h| h.network_mode).unwrap_or_default();
            if network_mode == target_by_id || network_mode == target_by_name {
                let name = summary
                    .names
                    .and_then(|names| names.into_iter().next())
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_string();
                dependents.push(DependentContainer { id, name });
            }
        }
        Ok(dependents)
    }

    async fn pull(&self, image_reference: &str) -> Result<(), UpdaterError> {
        let options = CreateImageOptions {
            from_image: image_reference,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|e| UpdaterError::Engine(e.to_string()))?;
        }
        Ok(())
    }

    async fn image_id(&self, image_reference: &str) -> Result<Option<String>, UpdaterError> {
        match self.docker.inspect_image(image_reference).await {
            Ok(inspect) => Ok(inspect.id),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => Ok(None),
            Err(e) => Err(UpdaterError::Engine(e.to_string())),
        }
    }

    async fn stop(&self, id: &str, timeout_secs: i64) -> Result<(), UpdaterError> {
        self.docker
            .stop_container(id, Some(StopContainerOptions { t: timeout_secs }))
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))
    }

    async fn remove(&self, id: &str) -> Result<(), UpdaterError> {
        match self
            .docker
            .remove_container(id, Some(RemoveContainerOptions { force: true, ..Default::default() }))
            .await
        {
            Ok(()) => Ok(()),
            // "removal already in progress" on a concurrent/retried remove is not fatal.
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 409, .. }) => Ok(()),
            Err(e) => Err(UpdaterError::Engine(e.to_string())),
        }
    }

    async fn wait_removed(&self, id: &str) -> Result<(), UpdaterError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        loop {
            match self.docker.inspect_container(id, None).await {
                Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => return Ok(()),
                _ if tokio::time::Instant::now() >= deadline => {
                    return Err(UpdaterError::Engine("timed out waiting for container removal".into()));
                }
                _ => tokio::time::sleep(Duration::from_millis(200)).await,
            }
        }
    }

    async fn create(&self, name: &str, image: &str, effective: &EffectiveConfig) -> Result<String, UpdaterError> {
        let port_bindings = effective
            .port_bindings
            .iter()
            .map(|(port, bindings)| {
                let mapped = bindings.as_ref().map(|bs| {
                    bs.iter()
                        .map(|(host_ip, host_port)| PortBinding {
                            host_ip: Some(host_ip.clone()),
                            host_port: Some(host_port.clone()),
                        })
                        .collect()
                });
                (port.clone(), mapped)
            })
            .collect();

        let restart_policy = effective.restart_policy.as_ref().map(|(name, max_retries)| {
            use bollard::models::RestartPolicyNameEnum as Policy;
            let policy = match name.as_str() {
                "always" => Policy::ALWAYS,
                "unless-stopped" => Policy::UNLESS_STOPPED,
                "on-failure" => Policy::ON_FAILURE,
                "no" => Policy::NO,
                _ => Policy::EMPTY,
            };
            RestartPolicy {
                name: Some(policy),
                maximum_retry_count: Some(*max_retries),
            }
        });

        let host_config = HostConfig {
            binds: Some(effective.binds.clone()),
            port_bindings: Some(port_bindings),
            network_mode: effective.network_mode.clone(),
            restart_policy,
            privileged: Some(effective.privileged),
            cap_add: Some(effective.cap_add.clone()),
            cap_drop: Some(effective.cap_drop.clone()),
            security_opt: Some(effective.security_opt.clone()),
            ..Default::default()
        };

        let config = Config {
            image: Some(image.to_string()),
            hostname: effective.hostname.clone(),
            user: effective.user.clone(),
            working_dir: effective.working_dir.clone(),
            labels: Some(effective.labels.clone()),
            env: Some(effective.env.clone()),
            cmd: effective.cmd.clone(),
            entrypoint: effective.entrypoint.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(CreateContainerOptions { name, ..Default::default() }), config)
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))?;
        Ok(created.id)
    }

    async fn connect_network(&self, container_id: &str, attachment: &NetworkAttachment) -> Result<(), UpdaterError> {
        let endpoint_config = EndpointSettings {
            aliases: Some(attachment.aliases.clone()),
            ip_address: attachment.ipv4_address.clone(),
            ..Default::default()
        };
        self.docker
            .connect_network(
                &attachment.network_name,
                bollard::network::ConnectNetworkOptions {
                    container: container_id,
                    endpoint_config,
                },
            )
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))
    }

    async fn start(&self, id: &str) -> Result<(), UpdaterError> {
        self.docker
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))
    }

    async fn is_running(&self, id: &str) -> Result<bool, UpdaterError> {
        let inspect = self.inspect(id).await?;
        Ok(inspect.state.and_then(|s| s.running).unwrap_or(false))
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<(), UpdaterError> {
        self.docker
            .rename_container(id, bollard::container::RenameContainerOptions { name: new_name })
            .await
            .map_err(|e| UpdaterError::Engine(e.to_string()))
    }
}
