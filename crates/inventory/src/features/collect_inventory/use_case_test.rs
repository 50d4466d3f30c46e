use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cache::FileCache;
use host_registry::{EngineClient, EngineClientError, EngineClientFactory, HostEndpointConfig, HostRegistry};
use serde_json::Value;
use update_checker::{CheckUpdateUseCase, ContainerImageContext};
use update_checker::floating_tag::FloatingTagMode;
use version_resolver::{CheckVersionUseCase, TagLister, VersionError};
use vuln_scan::features::scan_image::{DigestResolver, ScanError, ScanImageUseCase, ScannerClient};
use vuln_scan::VulnScanEngine;

use super::ports::{HostInventorySource, RawContainer, RawPortBinding, RawService};
use super::use_case::{CollectInventoryUseCase, HostSourceFactory};
use crate::error::CollectorError;

struct FixtureSource {
    cluster_mode: bool,
    containers: Vec<RawContainer>,
    services: Vec<RawService>,
}

#[async_trait]
impl HostInventorySource for FixtureSource {
    async fn is_cluster_mode(&self) -> Result<bool, CollectorError> {
        Ok(self.cluster_mode)
    }
    async fn list_containers(&self) -> Result<Vec<RawContainer>, CollectorError> {
        Ok(self.containers.clone())
    }
    async fn list_services(&self) -> Result<Vec<RawService>, CollectorError> {
        Ok(self.services.clone())
    }
}

struct FixtureFactory {
    sources: HashMap<String, Arc<dyn HostInventorySource>>,
}

impl HostSourceFactory for FixtureFactory {
    fn source_for(&self, host_name: &str) -> Option<Arc<dyn HostInventorySource>> {
        self.sources.get(host_name).cloned()
    }
    fn digest_resolver_for(&self, _host_name: &str) -> Option<Arc<dyn DigestResolver>> {
        None
    }
}

struct AlwaysOk;
#[async_trait]
impl EngineClientFactory for AlwaysOk {
    async fn connect(&self, _url: &str, _timeout: u64) -> Result<Arc<dyn EngineClient>, EngineClientError> {
        struct Client;
        #[async_trait]
        impl EngineClient for Client {
            async fn ping(&self) -> Result<(), EngineClientError> {
                Ok(())
            }
            async fn host_name(&self) -> Result<String, EngineClientError> {
                Ok("engine".into())
            }
            fn docker(&self) -> bollard::Docker {
                unreachable!("tests never dereference the real engine handle")
            }
        }
        Ok(Arc::new(Client))
    }
}

struct StubScanner;
#[async_trait]
impl ScannerClient for StubScanner {
    async fn health_check(&self) -> Result<bool, ScanError> {
        Ok(true)
    }
    async fn scan_raw(&self, _image: &str) -> Result<Value, ScanError> {
        Ok(Value::Null)
    }
}

struct StubTagLister;
#[async_trait]
impl TagLister for StubTagLister {
    async fn list_tags(&self, _registry: &str, _repository: &str) -> Result<Vec<String>, VersionError> {
        Ok(Vec::new())
    }
}

fn labels_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn make_use_case(factory: FixtureFactory, hosts: Vec<&str>) -> CollectInventoryUseCase {
    let dir = tempfile::tempdir().unwrap();
    let configs = hosts
        .iter()
        .enumerate()
        .map(|(i, name)| HostEndpointConfig {
            name: Some(name.to_string()),
            url: format!("tcp://{name}:2375"),
            public_hostname: None,
            order: i as u32,
        })
        .collect();
    let registry = Arc::new(HostRegistry::new(configs, Arc::new(AlwaysOk), 5, 30));

    let scan_cache = Arc::new(FileCache::new("scan", dir.path().join("scan.json"), 3600));
    let scan_use_case = Arc::new(ScanImageUseCase::new(Arc::new(StubScanner), scan_cache.clone(), 30, None, None));
    let scan_engine = Arc::new(VulnScanEngine::new(scan_cache, scan_use_case));

    let version_cache = Arc::new(FileCache::new("version", dir.path().join("version.json"), 3600));
    let version_use_case = Arc::new(CheckVersionUseCase::new(version_cache, Arc::new(StubTagLister)));

    let update_cache = Arc::new(FileCache::new("update", dir.path().join("update.json"), 3600));
    let update_use_case = Arc::new(CheckUpdateUseCase::new(update_cache, 30, FloatingTagMode::Disabled));

    CollectInventoryUseCase::new(
        registry,
        Arc::new(factory),
        scan_engine,
        version_use_case,
        update_use_case,
        None,
        true,
        true,
    )
}

fn sample_container(name: &str, labels: HashMap<String, String>) -> RawContainer {
    RawContainer {
        id: format!("{name}-id"),
        name: name.to_string(),
        image_reference: "nginx:latest".into(),
        image_id: "sha256:deadbeef".into(),
        base_status: "running".into(),
        exit_code: None,
        health_status: None,
        labels,
        networks: vec!["bridge".into()],
        ip_addresses: HashMap::new(),
        ports: vec![RawPortBinding { container_port: 80, protocol: "tcp".into(), host_ip: None, host_port: Some(8080) }],
    }
}

#[tokio::test]
async fn non_cluster_host_produces_one_snapshot_per_container() {
    let mut sources: HashMap<String, Arc<dyn HostInventorySource>> = HashMap::new();
    sources.insert(
        "alpha".into(),
        Arc::new(FixtureSource {
            cluster_mode: false,
            containers: vec![sample_container("web", HashMap::new())],
            services: Vec::new(),
        }),
    );
    let use_case = make_use_case(FixtureFactory { sources }, vec!["alpha"]);

    let snapshots = use_case.execute().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].name, "web");
    assert_eq!(snapshots[0].host_name, "alpha");
    assert_eq!(snapshots[0].ports.len(), 1);
}

#[tokio::test]
async fn cluster_host_produces_one_snapshot_per_service() {
    let mut sources: HashMap<String, Arc<dyn HostInventorySource>> = HashMap::new();
    sources.insert(
        "swarm-host".into(),
        Arc::new(FixtureSource {
            cluster_mode: true,
            containers: Vec::new(),
            services: vec![RawService {
                id: "svc1".into(),
                name: "web".into(),
                image_reference: "nginx:latest".into(),
                labels: HashMap::new(),
                running_tasks: 2,
                total_tasks: 3,
            }],
        }),
    );
    let use_case = make_use_case(FixtureFactory { sources }, vec!["swarm-host"]);

    let snapshots = use_case.execute().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].name, "web");
    assert!(!snapshots[0].update_available);
}

#[tokio::test]
async fn anchor_role_is_enriched_with_matching_dependents() {
    let anchor = sample_container("vpn", labels_with(&[("dockpeek.role", "anchor")]));
    let dependent = sample_container("qbittorrent", labels_with(&[("dockpeek.anchor", "vpn")]));

    let mut sources: HashMap<String, Arc<dyn HostInventorySource>> = HashMap::new();
    sources.insert(
        "alpha".into(),
        Arc::new(FixtureSource { cluster_mode: false, containers: vec![anchor, dependent], services: Vec::new() }),
    );
    let use_case = make_use_case(FixtureFactory { sources }, vec!["alpha"]);

    let snapshots = use_case.execute().await;
    let vpn = snapshots.iter().find(|s| s.name == "vpn").unwrap();
    assert_eq!(vpn.dependents, vec!["qbittorrent".to_string()]);
}

#[tokio::test]
async fn hidden_containers_are_dropped_from_the_result() {
    let visible = sample_container("web", HashMap::new());
    let hidden = sample_container("sidecar", labels_with(&[("dockpeek.hide", "true")]));

    let mut sources: HashMap<String, Arc<dyn HostInventorySource>> = HashMap::new();
    sources.insert(
        "alpha".into(),
        Arc::new(FixtureSource { cluster_mode: false, containers: vec![visible, hidden], services: Vec::new() }),
    );
    let use_case = make_use_case(FixtureFactory { sources }, vec!["alpha"]);

    let snapshots = use_case.execute().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].name, "web");
}

#[tokio::test]
async fn host_with_no_known_source_yields_a_placeholder_snapshot() {
    let use_case = make_use_case(FixtureFactory { sources: HashMap::new() }, vec!["ghost"]);

    let snapshots = use_case.execute().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].host_name, "ghost");
    assert_eq!(snapshots[0].state, kernel::ContainerState::Error);
}

#[tokio::test]
async fn context_cache_key_is_consistent_across_calls() {
    let context = ContainerImageContext {
        host_name: "alpha".into(),
        container_name: "web".into(),
        image_reference: "nginx:latest".into(),
        current_image_id: "sha256:deadbeef".into(),
    };
    let decision = CheckUpdateUseCase::new(
        Arc::new(FileCache::new("update2", tempfile::tempdir().unwrap().path().join("u.json"), 3600)),
        30,
        FloatingTagMode::Disabled,
    )
    .get_cached_decision(&context)
    .await;
    assert_eq!(decision, None);
}
