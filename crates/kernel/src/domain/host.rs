use serde::{Deserialize, Serialize};

/// Activation state of a configured engine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Active,
    Inactive,
}

/// Identity for a container-engine API endpoint.
///
/// Constructed once from static configuration at process start and
/// re-validated on a TTL by the host registry; never mutated in place —
/// a re-validation produces a new `HostEndpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEndpoint {
    /// Logical name, unique across the fleet.
    pub name: String,
    /// Transport URL (unix socket or `tcp://host:port`).
    pub url: String,
    /// Declared public hostname used for link rendering, if any.
    pub public_hostname: Option<String>,
    pub status: HostStatus,
    /// Stable ordering key; unique, used to sort the aggregated view.
    pub order: u32,
}

impl HostEndpoint {
    pub fn is_active(&self) -> bool {
        matches!(self.status, HostStatus::Active)
    }
}
