use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use host_registry::HostRegistry;
use kernel::{
    ContainerSnapshot, ContainerState, HostStatus, PortBinding, ScanStatus, ScanSummary,
    TraefikRoute,
};
use tracing::{instrument, warn};
use update_checker::{CheckUpdateUseCase, ContainerImageContext};
use version_resolver::CheckVersionUseCase;
use vuln_scan::features::scan_image::DigestResolver;
use vuln_scan::VulnScanEngine;

use super::ports::{HostInventorySource, RawContainer, RawService};
use crate::{labels, state_mapping, traefik};

const DEFAULT_HOST_TIMEOUT_SECS: u64 = 30;

/// Constructs the per-host engine surfaces (`HostInventorySource` and the
/// vuln-scan digest resolver) on demand, so the use case never needs to
/// know how a host's `bollard::Docker` handle was obtained.
pub trait HostSourceFactory: Send + Sync {
    fn source_for(&self, host_name: &str) -> Option<Arc<dyn HostInventorySource>>;
    fn digest_resolver_for(&self, host_name: &str) -> Option<Arc<dyn DigestResolver>>;
}

pub struct CollectInventoryUseCase {
    host_registry: Arc<HostRegistry>,
    sources: Arc<dyn HostSourceFactory>,
    scan_engine: Arc<VulnScanEngine>,
    version_use_case: Arc<CheckVersionUseCase>,
    update_use_case: Arc<CheckUpdateUseCase>,
    traefik_api: Option<Arc<traefik::TraefikApiClient>>,
    traefik_labels_enabled: bool,
    tags_enabled: bool,
    host_timeout_secs: u64,
}

impl CollectInventoryUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host_registry: Arc<HostRegistry>,
        sources: Arc<dyn HostSourceFactory>,
        scan_engine: Arc<VulnScanEngine>,
        version_use_case: Arc<CheckVersionUseCase>,
        update_use_case: Arc<CheckUpdateUseCase>,
        traefik_api: Option<Arc<traefik::TraefikApiClient>>,
        traefik_labels_enabled: bool,
        tags_enabled: bool,
    ) -> Self {
        Self {
            host_registry,
            sources,
            scan_engine,
            version_use_case,
            update_use_case,
            traefik_api,
            traefik_labels_enabled,
            tags_enabled,
            host_timeout_secs: DEFAULT_HOST_TIMEOUT_SECS,
        }
    }

    /// Fans out over every Active host in parallel (bounded by a
    /// per-host timeout), builds a `ContainerSnapshot` per container or
    /// cluster service, and applies the anchor/dependents and
    /// hidden-container post-processing before returning a deterministic,
    /// ordered view.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Vec<ContainerSnapshot> {
        let endpoints = self.host_registry.discover().await;
        let timeout = Duration::from_secs(self.host_timeout_secs);

        let futures = endpoints.into_iter().map(|endpoint| {
            let this = self;
            async move {
                if endpoint.status != HostStatus::Active {
                    return Vec::new();
                }
                match tokio::time::timeout(timeout, this.collect_host(&endpoint.name)).await {
                    Ok(snapshots) => snapshots,
                    Err(_) => {
                        warn!(host = %endpoint.name, "host collection timed out");
                        vec![placeholder_snapshot(&endpoint.name, "collection timed out")]
                    }
                }
            }
        });

        // `discover()` returns endpoints sorted by host order, and
        // `join_all` preserves per-future input order regardless of
        // completion order, so the flattened list is already ordered by
        // host order then by each host's own enumeration order. No
        // further sort: re-sorting by name would discard the engine's
        // enumeration order within a host.
        let mut all: Vec<ContainerSnapshot> = futures::future::join_all(futures).await.into_iter().flatten().collect();

        post_process(&mut all);

        let sources = self.sources.clone();
        let queued = self
            .scan_engine
            .queue_auto_scan(&all, |snapshot| sources.digest_resolver_for(&snapshot.host_name))
            .await;
        if queued > 0 {
            tracing::debug!(queued, "auto-enqueued unscanned images");
        }

        all
    }

    async fn collect_host(&self, host_name: &str) -> Vec<ContainerSnapshot> {
        let Some(source) = self.sources.source_for(host_name) else {
            return vec![placeholder_snapshot(host_name, "no engine connection available")];
        };

        let cluster_mode = match source.is_cluster_mode().await {
            Ok(v) => v,
            Err(e) => {
                warn!(host = host_name, error = %e, "failed to detect cluster mode");
                return vec![placeholder_snapshot(host_name, &e.to_string())];
            }
        };

        if cluster_mode {
            match source.list_services().await {
                Ok(services) => {
                    let mut snapshots = Vec::with_capacity(services.len());
                    for service in services {
                        snapshots.push(self.build_service_snapshot(host_name, service).await);
                    }
                    snapshots
                }
                Err(e) => vec![placeholder_snapshot(host_name, &e.to_string())],
            }
        } else {
            match source.list_containers().await {
                Ok(containers) => {
                    let mut snapshots = Vec::with_capacity(containers.len());
                    for container in containers {
                        snapshots.push(self.build_container_snapshot(host_name, container).await);
                    }
                    snapshots
                }
                Err(e) => vec![placeholder_snapshot(host_name, &e.to_string())],
            }
        }
    }

    async fn build_container_snapshot(&self, host_name: &str, raw: RawContainer) -> ContainerSnapshot {
        let (state, exit_code) =
            state_mapping::map_state(&raw.base_status, raw.exit_code, raw.health_status.as_deref());

        let orchestration = labels::orchestration_hints(&raw.labels, self.tags_enabled);
        let https_ports = labels::https_ports(&raw.labels);
        let custom_link = labels::custom_link(&raw.labels);

        let ports: Vec<PortBinding> = raw
            .ports
            .iter()
            .map(|p| {
                let host_port_str = p.host_port.map(|hp| hp.to_string());
                let container_port_str = format!("{}/{}", p.container_port, p.protocol);
                let link = custom_link.clone().or_else(|| {
                    let host_ip = p.host_ip.clone().filter(|ip| ip != "0.0.0.0" && !ip.is_empty());
                    host_port_str.as_ref().map(|hp| {
                        let host = host_ip.unwrap_or_else(|| host_name.to_string());
                        labels::port_link(&host, hp, &container_port_str, &https_ports)
                    })
                });
                PortBinding {
                    container_port: p.container_port,
                    protocol: p.protocol.clone(),
                    host_ip: p.host_ip.clone(),
                    host_port: p.host_port,
                    link,
                }
            })
            .collect();

        let mut routes = Vec::new();
        if self.traefik_labels_enabled {
            routes = traefik::routes_from_labels(&raw.labels, true);
        }
        if let Some(api) = &self.traefik_api {
            let api_routes = api.routes_for_container(&raw.name, orchestration.stack_name.as_deref()).await;
            for route in api_routes {
                if !routes.iter().any(|r: &TraefikRoute| r.url == route.url) {
                    routes.push(route);
                }
            }
        }

        let digest_resolver = self.sources.digest_resolver_for(host_name);
        let (scan_status, scan_summary) = self.lookup_scan(&raw.image_reference, digest_resolver.clone()).await;

        let version_info = self.version_use_case.get_cached_version(&raw.image_reference).await;

        let context = ContainerImageContext {
            host_name: host_name.to_string(),
            container_name: raw.name.clone(),
            image_reference: raw.image_reference.clone(),
            current_image_id: raw.image_id.clone(),
        };
        let update_available = self.update_use_case.get_cached_decision(&context).await.unwrap_or(false);

        ContainerSnapshot {
            host_name: host_name.to_string(),
            id: raw.id,
            name: raw.name,
            image_reference: raw.image_reference,
            image_id: raw.image_id,
            state,
            exit_code,
            ports,
            routes,
            labels: raw.labels,
            networks: raw.networks,
            ip_addresses: raw.ip_addresses,
            orchestration,
            scan_status,
            scan_summary,
            version_info,
            update_available,
            dependents: Vec::new(),
        }
    }

    async fn build_service_snapshot(&self, host_name: &str, raw: RawService) -> ContainerSnapshot {
        let orchestration = labels::orchestration_hints(&raw.labels, self.tags_enabled);
        let state = if raw.running_tasks > 0 { ContainerState::Running } else { ContainerState::Exited };

        let digest_resolver = self.sources.digest_resolver_for(host_name);
        let (scan_status, scan_summary) = self.lookup_scan(&raw.image_reference, digest_resolver).await;
        let version_info = self.version_use_case.get_cached_version(&raw.image_reference).await;

        ContainerSnapshot {
            host_name: host_name.to_string(),
            id: raw.id.clone(),
            name: raw.name,
            image_reference: raw.image_reference,
            image_id: raw.id,
            state,
            exit_code: None,
            ports: Vec::new(),
            routes: Vec::new(),
            labels: raw.labels,
            networks: Vec::new(),
            ip_addresses: HashMap::new(),
            orchestration,
            scan_status,
            scan_summary,
            version_info,
            // Cluster services are owned by the orchestrator, which decides
            // updates out of band.
            update_available: false,
            dependents: Vec::new(),
        }
    }

    async fn lookup_scan(
        &self,
        image_reference: &str,
        digest_resolver: Option<Arc<dyn DigestResolver>>,
    ) -> (ScanStatus, Option<ScanSummary>) {
        let Some(resolver) = digest_resolver else {
            return (ScanStatus::NotScanned, None);
        };
        let Ok(digest) = resolver.resolve_digest(image_reference).await else {
            return (ScanStatus::NotScanned, None);
        };
        match self.scan_engine.get_cached(&digest).await {
            Some(result) => (ScanStatus::Scanned, Some(result.summary)),
            None => (ScanStatus::NotScanned, None),
        }
    }
}

fn placeholder_snapshot(host_name: &str, reason: &str) -> ContainerSnapshot {
    ContainerSnapshot {
        host_name: host_name.to_string(),
        id: String::new(),
        name: format!("(host unreachable: {reason})"),
        image_reference: String::new(),
        image_id: String::new(),
        state: ContainerState::Error,
        exit_code: None,
        ports: Vec::new(),
        routes: Vec::new(),
        labels: HashMap::new(),
        networks: Vec::new(),
        ip_addresses: HashMap::new(),
        orchestration: Default::default(),
        scan_status: ScanStatus::NotScanned,
        scan_summary: None,
        version_info: None,
        update_available: false,
        dependents: Vec::new(),
    }
}

/// Anchor/dependents enrichment and hidden-container filtering, applied
/// once across the full aggregate (grounded in §4.C's post-processing
/// step — name-based, distinct from the updater's network-mode-based
/// dependent discovery).
fn post_process(snapshots: &mut Vec<ContainerSnapshot>) {
    let anchors_by_host: HashMap<(String, String), usize> = snapshots
        .iter()
        .enumerate()
        .filter(|(_, s)| s.orchestration.role.as_deref() == Some("anchor"))
        .map(|(i, s)| ((s.host_name.clone(), s.name.clone()), i))
        .collect();

    let mut dependents_by_anchor: HashMap<(String, String), Vec<String>> = HashMap::new();
    for snapshot in snapshots.iter() {
        if let Some(anchor_name) = &snapshot.orchestration.anchor {
            dependents_by_anchor
                .entry((snapshot.host_name.clone(), anchor_name.clone()))
                .or_default()
                .push(snapshot.name.clone());
        }
    }

    for ((host, anchor_name), index) in &anchors_by_host {
        if let Some(dependents) = dependents_by_anchor.get(&(host.clone(), anchor_name.clone())) {
            snapshots[*index].dependents = dependents.clone();
        }
    }

    snapshots.retain(|s| !s.orchestration.hidden);
}
