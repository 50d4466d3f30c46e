use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kernel::{HostEndpoint, HostStatus};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::HostEndpointConfig;
use crate::hostname::HostnameExtractor;
use crate::ports::{EngineClient, EngineClientFactory};

struct DiscoveryCache {
    endpoints: Vec<HostEndpoint>,
    clients: std::collections::HashMap<String, Arc<dyn EngineClient>>,
    fetched_at: chrono::DateTime<Utc>,
}

/// Owns the short-TTL in-memory catalog of live host handles. `discover`
/// fans out to every configured endpoint in parallel with a per-endpoint
/// timeout and caches the result; `invalidate` clears that cache.
pub struct HostRegistry {
    configs: Vec<HostEndpointConfig>,
    factory: Arc<dyn EngineClientFactory>,
    connect_timeout_secs: u64,
    cache_ttl_secs: u64,
    cache: Mutex<Option<DiscoveryCache>>,
}

impl HostRegistry {
    pub fn new(
        configs: Vec<HostEndpointConfig>,
        factory: Arc<dyn EngineClientFactory>,
        connect_timeout_secs: u64,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            configs,
            factory,
            connect_timeout_secs,
            cache_ttl_secs,
            cache: Mutex::new(None),
        }
    }

    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Returns the cached discovery result if still fresh, otherwise
    /// re-probes every configured endpoint in parallel.
    pub async fn discover(&self) -> Vec<HostEndpoint> {
        {
            let guard = self.cache.lock().await;
            if let Some(cache) = guard.as_ref() {
                if !kernel::time::is_stale(cache.fetched_at, self.cache_ttl_secs, Utc::now()) {
                    return cache.endpoints.clone();
                }
            }
        }

        let probes = self.configs.iter().enumerate().map(|(i, cfg)| {
            let factory = self.factory.clone();
            let cfg = cfg.clone();
            let timeout_secs = self.connect_timeout_secs;
            let is_local = cfg.url.starts_with("unix://");
            async move {
                let probe = async {
                    let client = factory.connect(&cfg.url, timeout_secs).await?;
                    let name = match &cfg.name {
                        Some(n) => n.clone(),
                        None => client.host_name().await.unwrap_or_else(|_| format!("host-{i}")),
                    };
                    Ok::<_, crate::ports::EngineClientError>((client, name))
                };

                match tokio::time::timeout(Duration::from_secs(timeout_secs), probe).await {
                    Ok(Ok((client, name))) => {
                        info!(host = %name, "engine endpoint active");
                        let endpoint = HostEndpoint {
                            name,
                            url: cfg.url.clone(),
                            public_hostname: cfg
                                .public_hostname
                                .clone()
                                .or_else(|| HostnameExtractor::extract(&cfg.url, is_local)),
                            status: HostStatus::Active,
                            order: cfg.order,
                        };
                        (endpoint, Some(client))
                    }
                    Ok(Err(e)) => {
                        warn!(url = %cfg.url, error = %e, "engine endpoint unreachable");
                        (Self::inactive_endpoint(&cfg, is_local), None)
                    }
                    Err(_) => {
                        warn!(url = %cfg.url, "engine endpoint discovery timed out");
                        (Self::inactive_endpoint(&cfg, is_local), None)
                    }
                }
            }
        });

        let results = futures::future::join_all(probes).await;

        let mut endpoints = Vec::with_capacity(results.len());
        let mut clients = std::collections::HashMap::new();
        for (endpoint, client) in results {
            if let Some(c) = client {
                clients.insert(endpoint.name.clone(), c);
            }
            endpoints.push(endpoint);
        }
        endpoints.sort_by_key(|e| e.order);

        *self.cache.lock().await = Some(DiscoveryCache {
            endpoints: endpoints.clone(),
            clients,
            fetched_at: Utc::now(),
        });

        endpoints
    }

    /// The live client handle for an Active endpoint, if discovery has run
    /// and produced one. `None` for Inactive endpoints by construction.
    pub async fn client_for(&self, host_name: &str) -> Option<Arc<dyn EngineClient>> {
        let guard = self.cache.lock().await;
        guard.as_ref()?.clients.get(host_name).cloned()
    }

    /// Non-blocking variant of [`Self::client_for`] for callers that know
    /// `discover` has already completed earlier in the same task (so the
    /// cache lock is uncontended) and can't themselves be async, e.g. a
    /// `HostSourceFactory` invoked from inside one collection pass.
    /// Returns `None` if the lock is currently held rather than blocking.
    pub fn try_client_for(&self, host_name: &str) -> Option<Arc<dyn EngineClient>> {
        let guard = self.cache.try_lock().ok()?;
        guard.as_ref()?.clients.get(host_name).cloned()
    }

    fn inactive_endpoint(cfg: &HostEndpointConfig, is_local: bool) -> HostEndpoint {
        HostEndpoint {
            name: cfg.name.clone().unwrap_or_else(|| cfg.url.clone()),
            url: cfg.url.clone(),
            public_hostname: cfg
                .public_hostname
                .clone()
                .or_else(|| HostnameExtractor::extract(&cfg.url, is_local)),
            status: HostStatus::Inactive,
            order: cfg.order,
        }
    }
}
