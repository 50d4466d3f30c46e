//! Ordered construction of every bounded context into one [`AppState`]:
//! load config, build the shared caches, the host registry, the
//! per-feature engines wired to those caches, the persistent stores,
//! the updater, and finally the scheduler. Each step is logged and each
//! failure is aggregated into [`AppError`].

use std::sync::Arc;

use cache::FileCache;
use credentials::CredentialStore;
use history::HistoryStore;
use host_registry::{BollardEngineClientFactory, HostRegistry};
use inventory::CollectInventoryUseCase;
use notifier::{NotifierConfig, NtfyTransport};
use notifier::Notifier;
use scheduler::SchedulerConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use update_checker::features::check_update::BollardImageInspector;
use update_checker::CheckUpdateUseCase;
use updater::orchestrator::{OrchestratorClient, PortainerClient};
use updater::{BollardContainerEngine, ContainerEngine, UpdateContainerUseCase};
use version_resolver::{CheckVersionUseCase, HttpTagLister};
use vuln_scan::features::scan_image::ScanImageUseCase;
use vuln_scan::VulnScanEngine;

use crate::app_state::AppState;
use crate::auto_updater::AutoUpdater;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::host_source::ProductionHostSourceFactory;
use crate::refresh_tasks::{InventoryRefreshTask, VersionRefreshTask};

pub struct Bootstrapped {
    pub state: AppState,
    pub scheduler_handle: Option<scheduler::SchedulerHandle>,
    pub auto_updater: Option<(Arc<AutoUpdater>, u64)>,
    pub cancel: CancellationToken,
}

pub async fn bootstrap(config: AppConfig) -> Result<Bootstrapped, AppError> {
    info!("constructing shared caches");
    let scan_cache = Arc::new(FileCache::new("scan", config.scan_cache_path.clone(), config.scan_cache_ttl_secs));
    let version_cache = Arc::new(FileCache::new("version", config.version_cache_path.clone(), config.version_cache_ttl_secs));
    let update_cache = Arc::new(FileCache::new("update", config.update_cache_path.clone(), config.update_cache_ttl_secs));

    info!(hosts = config.hosts.len(), "constructing host registry");
    let host_registry = Arc::new(HostRegistry::new(
        config.hosts.clone(),
        Arc::new(BollardEngineClientFactory),
        config.engine_connect_timeout_secs,
        config.host_discovery_cache_ttl_secs,
    ));

    let history = if config.history_enabled {
        info!(path = %config.history_db_path.display(), "connecting history store");
        let path = config.history_db_path.to_string_lossy().to_string();
        Some(Arc::new(HistoryStore::connect(&path).await?))
    } else {
        None
    };

    let notifier_config = NotifierConfig::from_env(|key| std::env::var(key).ok());
    let notifier = Arc::new(Notifier::new(
        notifier_config.clone(),
        Arc::new(NtfyTransport::new(notifier_config.server_url.clone(), notifier_config.topic.clone())),
    ));

    info!("constructing scan engine");
    let scanner: Arc<dyn vuln_scan::features::scan_image::ScannerClient> = Arc::new(
        vuln_scan::features::scan_image::adapter::TrivyHttpScannerAdapter::new(
            config.scanner_url.clone().unwrap_or_default(),
            config.scanner_timeout_secs,
        ),
    );
    let scan_use_case = Arc::new(ScanImageUseCase::new(
        scanner,
        scan_cache.clone(),
        config.scanner_timeout_secs,
        history.clone(),
        Some(notifier.clone()),
    ));
    let scan_engine = Arc::new(VulnScanEngine::new(scan_cache, scan_use_case));

    info!("constructing version resolver");
    let tag_lister = Arc::new(HttpTagLister::new());
    let version_use_case = Arc::new(CheckVersionUseCase::new(version_cache, tag_lister));

    info!("constructing update checker");
    let update_check_use_case = Arc::new(CheckUpdateUseCase::new(
        update_cache,
        config.update_pull_timeout_secs,
        config.floating_tag_mode,
    ));

    info!(path = %config.credential_store_path.display(), "constructing credential store");
    let credentials = Arc::new(CredentialStore::new(config.credential_store_path.clone()));

    let orchestrator: Option<Arc<dyn OrchestratorClient>> = if PortainerClient::is_configured() {
        info!("declarative orchestrator configured");
        PortainerClient::from_env(false).map(|c| Arc::new(c) as Arc<dyn OrchestratorClient>)
    } else {
        None
    };

    info!("constructing updater");
    let updater_use_case = Arc::new(UpdateContainerUseCase::new(config.update_lock_dir.clone(), config.update_pull_timeout_secs));

    let sources = Arc::new(ProductionHostSourceFactory::new(host_registry.clone()));
    let traefik_api = inventory::TraefikApiClient::from_env().map(Arc::new);

    let collector = Arc::new(CollectInventoryUseCase::new(
        host_registry.clone(),
        sources,
        scan_engine.clone(),
        version_use_case.clone(),
        update_check_use_case.clone(),
        traefik_api,
        true,
        true,
    ));

    let registry_for_engine = host_registry.clone();
    let container_engine_for: Arc<dyn Fn(&str) -> Option<Arc<dyn ContainerEngine>> + Send + Sync> =
        Arc::new(move |host_name: &str| {
            registry_for_engine
                .try_client_for(host_name)
                .map(|client| Arc::new(BollardContainerEngine::new(client.docker())) as Arc<dyn ContainerEngine>)
        });

    let registry_for_inspector = host_registry.clone();
    let image_inspector_for: Arc<dyn Fn(&str) -> Option<Arc<dyn update_checker::ImageInspector>> + Send + Sync> =
        Arc::new(move |host_name: &str| {
            registry_for_inspector
                .try_client_for(host_name)
                .map(|client| Arc::new(BollardImageInspector::new(client.docker())) as Arc<dyn update_checker::ImageInspector>)
        });

    let state = AppState {
        host_registry: host_registry.clone(),
        collector: collector.clone(),
        scan_engine,
        version_use_case: version_use_case.clone(),
        update_check_use_case,
        updater_use_case,
        history,
        credentials,
        notifier,
        orchestrator,
        image_inspector_for,
        container_engine_for,
    };

    let cancel = CancellationToken::new();
    let scheduler_handle = if config.scheduler_enabled {
        info!("starting background scheduler");
        let mut scheduler_config = SchedulerConfig::new(config.scheduler_lock_path.clone());
        scheduler_config.inventory_refresh_interval = std::time::Duration::from_secs(config.scheduler_refresh_interval_secs);
        scheduler_config.version_refresh_interval = std::time::Duration::from_secs(config.scheduler_version_interval_secs);

        let inventory_task = Arc::new(InventoryRefreshTask::new(collector.clone()));
        let version_task = Arc::new(VersionRefreshTask::new(collector.clone(), version_use_case.clone()));

        scheduler::start(scheduler_config, inventory_task, version_task, cancel.clone())
            .await
            .map_err(AppError::Scheduler)?
    } else {
        warn!("background scheduler disabled");
        None
    };

    let auto_updater = if config.auto_update_enabled {
        let auto_updater = Arc::new(AutoUpdater::new(
            state.clone(),
            config.auto_update_dry_run,
            config.auto_update_batch_size,
            config.auto_update_journal_path.clone(),
        ));
        Some((auto_updater, config.auto_update_interval_secs))
    } else {
        None
    };

    info!("bootstrap complete");
    Ok(Bootstrapped { state, scheduler_handle, auto_updater, cancel })
}
