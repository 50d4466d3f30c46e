use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::scan::ScanSummary;
use super::version::VersionInfo;

/// Lifecycle state of a container as observed by the collector, after the
/// health-aware mapping described in the exit-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Running,
    Healthy,
    Starting,
    Unhealthy,
    Paused,
    Restarting,
    Created,
    Removing,
    Exited,
    Dead,
    Timeout,
    Error,
}

/// One published port mapping plus any link metadata derived from labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortBinding {
    pub container_port: u16,
    pub protocol: String,
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
    /// Fully-formed link, honoring `dockpeek.link`/https-port overrides.
    pub link: Option<String>,
}

/// One HTTP route derived either from `traefik.*` labels or the Traefik API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraefikRoute {
    pub router_name: String,
    pub host: Option<String>,
    pub path_prefix: Option<String>,
    pub https: bool,
    pub url: String,
}

/// Update policy carried by the `dockpeek.update.action` label namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    None,
    Skip,
    Pin,
}

impl UpdatePolicy {
    pub fn from_label_value(value: &str) -> Self {
        match value {
            "skip" => UpdatePolicy::Skip,
            "pin" => UpdatePolicy::Pin,
            _ => UpdatePolicy::None,
        }
    }

    pub fn blocks_update(&self) -> bool {
        matches!(self, UpdatePolicy::Skip | UpdatePolicy::Pin)
    }
}

/// Orchestration and presentation hints parsed out of the `dockpeek.*`
/// label namespace plus compose project/stack labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationHints {
    pub stack_name: Option<String>,
    pub role: Option<String>,
    pub anchor: Option<String>,
    pub hidden: bool,
    pub security_skip: bool,
    pub update_policy: UpdatePolicy,
    pub order: Option<i64>,
    pub tags: Vec<String>,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::None
    }
}

/// One row of the fleet inventory. Assembled fresh per query by the
/// collector; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub host_name: String,
    pub id: String,
    pub name: String,
    pub image_reference: String,
    pub image_id: String,
    pub state: ContainerState,
    pub exit_code: Option<i64>,
    pub ports: Vec<PortBinding>,
    pub routes: Vec<TraefikRoute>,
    pub labels: HashMap<String, String>,
    pub networks: Vec<String>,
    pub ip_addresses: HashMap<String, String>,
    pub orchestration: OrchestrationHints,
    pub scan_status: ScanStatus,
    pub scan_summary: Option<ScanSummary>,
    pub version_info: Option<VersionInfo>,
    pub update_available: bool,
    /// Populated post-processing, for anchors only: names of dependents
    /// whose `anchor` attribute points back at this container.
    pub dependents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    NotScanned,
    Pending,
    Scanned,
    Error,
    Skipped,
}
