//! Shared domain types, error classification and time helpers used across
//! every bounded context in this workspace.
//!
//! Nothing in this crate talks to a file, a socket or a database: it is the
//! vocabulary the other crates share so that `cache`, `inventory`, `vuln-scan`
//! and friends can pass the same kinds of values back and forth without
//! depending on each other.

pub mod domain;
pub mod error;
pub mod time;

pub use domain::container::{
    ContainerSnapshot, ContainerState, OrchestrationHints, PortBinding, ScanStatus, TraefikRoute,
    UpdatePolicy,
};
pub use domain::credential::ApiTokenInfo;
pub use domain::history::{FingerprintRecord, ScanHistoryRecord, TrendDirection};
pub use domain::host::{HostEndpoint, HostStatus};
pub use domain::scan::{ScanResult, ScanSummary, Severity, Vulnerability};
pub use domain::update::UpdateDecision;
pub use domain::version::VersionInfo;
pub use error::ErrorKind;
