//! Shared application state handed to every request handler, holding
//! `Arc`-shared handles to each bounded context constructed once during
//! bootstrap. A plain, non-generic struct: this workspace has exactly
//! one production adapter per port, so a type parameter over the
//! storage adapter would buy nothing here.

use std::sync::Arc;

use credentials::CredentialStore;
use history::HistoryStore;
use host_registry::HostRegistry;
use inventory::CollectInventoryUseCase;
use notifier::Notifier;
use update_checker::{CheckUpdateUseCase, ImageInspector};
use updater::orchestrator::OrchestratorClient;
use updater::{ContainerEngine, UpdateContainerUseCase};
use version_resolver::CheckVersionUseCase;
use vuln_scan::VulnScanEngine;

#[derive(Clone)]
pub struct AppState {
    pub host_registry: Arc<HostRegistry>,
    pub collector: Arc<CollectInventoryUseCase>,
    pub scan_engine: Arc<VulnScanEngine>,
    pub version_use_case: Arc<CheckVersionUseCase>,
    pub update_check_use_case: Arc<CheckUpdateUseCase>,
    pub updater_use_case: Arc<UpdateContainerUseCase>,
    pub history: Option<Arc<HistoryStore>>,
    pub credentials: Arc<CredentialStore>,
    pub notifier: Arc<Notifier>,
    pub orchestrator: Option<Arc<dyn OrchestratorClient>>,
    pub image_inspector_for: Arc<dyn Fn(&str) -> Option<Arc<dyn ImageInspector>> + Send + Sync>,
    pub container_engine_for: Arc<dyn Fn(&str) -> Option<Arc<dyn ContainerEngine>> + Send + Sync>,
}
