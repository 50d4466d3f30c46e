use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::service::{ListServicesOptions, ListTasksOptions};
use bollard::Docker;

use super::ports::{HostInventorySource, RawContainer, RawPortBinding, RawService};
use crate::error::CollectorError;

pub struct BollardInventorySource {
    docker: Docker,
}

impl BollardInventorySource {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

fn classify(err: bollard::errors::Error) -> CollectorError {
    CollectorError::Unreachable(err.to_string())
}

#[async_trait]
impl HostInventorySource for BollardInventorySource {
    async fn is_cluster_mode(&self) -> Result<bool, CollectorError> {
        let info = self.docker.info().await.map_err(classify)?;
        let local_node_state =
            info.swarm.and_then(|s| s.local_node_state).map(|s| format!("{s:?}").to_lowercase());
        Ok(local_node_state.as_deref() == Some("active"))
    }

    async fn list_containers(&self) -> Result<Vec<RawContainer>, CollectorError> {
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> { all: true, ..Default::default() }))
            .await
            .map_err(classify)?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(id) = summary.id.clone() else { continue };
            let detail = self
                .docker
                .inspect_container(&id, None::<InspectContainerOptions>)
                .await
                .map_err(classify)?;

            let name = detail
                .name
                .as_deref()
                .map(|n| n.trim_start_matches('/').to_string())
                .or_else(|| summary.names.as_ref().and_then(|n| n.first()).map(|n| n.trim_start_matches('/').to_string()))
                .unwrap_or_else(|| id.clone());

            let image_reference = detail
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .or(summary.image.clone())
                .unwrap_or_default();
            let image_id = detail.image.clone().or(summary.image_id.clone()).unwrap_or_default();

            let state = detail.state.as_ref();
            let base_status = state
                .and_then(|s| s.status.as_ref())
                .map(|s| format!("{s:?}").to_lowercase())
                .or(summary.state.clone())
                .unwrap_or_default();
            let exit_code = state.and_then(|s| s.exit_code);
            let health_status = state
                .and_then(|s| s.health.as_ref())
                .and_then(|h| h.status.as_ref())
                .map(|s| format!("{s:?}").to_lowercase());

            let labels = detail.config.as_ref().and_then(|c| c.labels.clone()).or(summary.labels.clone()).unwrap_or_default();

            let mut networks = Vec::new();
            let mut ip_addresses = HashMap::new();
            if let Some(network_settings) = &detail.network_settings {
                if let Some(nets) = &network_settings.networks {
                    for (name, endpoint) in nets {
                        networks.push(name.clone());
                        if let Some(ip) = endpoint.ip_address.as_ref().filter(|ip| !ip.is_empty()) {
                            ip_addresses.insert(name.clone(), ip.clone());
                        }
                    }
                }
            }

            let mut ports = Vec::new();
            if let Some(port_list) = summary.ports.as_ref() {
                for port in port_list {
                    ports.push(RawPortBinding {
                        container_port: port.private_port,
                        protocol: format!("{:?}", port.typ.unwrap_or(bollard::models::PortTypeEnum::TCP)).to_lowercase(),
                        host_ip: port.ip.clone(),
                        host_port: port.public_port,
                    });
                }
            }

            containers.push(RawContainer {
                id,
                name,
                image_reference,
                image_id,
                base_status,
                exit_code,
                health_status,
                labels,
                networks,
                ip_addresses,
                ports,
            });
        }

        Ok(containers)
    }

    async fn list_services(&self) -> Result<Vec<RawService>, CollectorError> {
        let services = self
            .docker
            .list_services(None::<ListServicesOptions<String>>)
            .await
            .map_err(classify)?;

        let mut result = Vec::with_capacity(services.len());
        for service in services {
            let Some(id) = service.id.clone() else { continue };
            let spec = service.spec.as_ref();
            let name = spec.and_then(|s| s.name.clone()).unwrap_or_else(|| id.clone());
            let image_reference = spec
                .and_then(|s| s.task_template.as_ref())
                .and_then(|t| t.container_spec.as_ref())
                .and_then(|c| c.image.clone())
                .unwrap_or_default();
            let labels = spec.and_then(|s| s.labels.clone()).unwrap_or_default();

            let mut filters = HashMap::new();
            filters.insert("service".to_string(), vec![id.clone()]);
            let tasks = self
                .docker
                .list_tasks(Some(ListTasksOptions { filters }))
                .await
                .map_err(classify)?;

            let total_tasks = tasks.len() as u32;
            let running_tasks = tasks
                .iter()
                .filter(|t| {
                    t.status
                        .as_ref()
                        .and_then(|s| s.state.as_ref())
                        .map(|s| format!("{s:?}").eq_ignore_ascii_case("running"))
                        .unwrap_or(false)
                })
                .count() as u32;

            result.push(RawService { id, name, image_reference, labels, running_tasks, total_tasks });
        }

        Ok(result)
    }
}
