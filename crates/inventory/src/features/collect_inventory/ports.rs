use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CollectorError;

#[derive(Debug, Clone)]
pub struct RawPortBinding {
    pub container_port: u16,
    pub protocol: String,
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
}

/// Everything the collector needs out of one non-cluster container,
/// already inspected (the per-container detail a plain `list_containers`
/// call doesn't carry, e.g. exit code and health).
#[derive(Debug, Clone)]
pub struct RawContainer {
    pub id: String,
    pub name: String,
    pub image_reference: String,
    pub image_id: String,
    pub base_status: String,
    pub exit_code: Option<i64>,
    pub health_status: Option<String>,
    pub labels: HashMap<String, String>,
    pub networks: Vec<String>,
    pub ip_addresses: HashMap<String, String>,
    pub ports: Vec<RawPortBinding>,
}

/// One declarative-cluster-mode service, pre-aggregated to running vs.
/// total task counts.
#[derive(Debug, Clone)]
pub struct RawService {
    pub id: String,
    pub name: String,
    pub image_reference: String,
    pub labels: HashMap<String, String>,
    pub running_tasks: u32,
    pub total_tasks: u32,
}

/// The engine-facing surface the collector needs from one host. Implemented
/// against `bollard::Docker` in production; stubbed with fixed fixtures in
/// tests.
#[async_trait]
pub trait HostInventorySource: Send + Sync {
    async fn is_cluster_mode(&self) -> Result<bool, CollectorError>;
    async fn list_containers(&self) -> Result<Vec<RawContainer>, CollectorError>;
    async fn list_services(&self) -> Result<Vec<RawService>, CollectorError>;
}
