//! Production [`HostSourceFactory`]: bridges the host registry's live
//! `bollard::Docker` handles to the per-feature engine-facing ports each
//! downstream crate defines, so none of them need to know how a host's
//! connection was established.

use std::sync::Arc;

use host_registry::HostRegistry;
use inventory::{BollardDigestResolver, BollardInventorySource, HostInventorySource, HostSourceFactory};
use vuln_scan::features::scan_image::DigestResolver;

pub struct ProductionHostSourceFactory {
    registry: Arc<HostRegistry>,
}

impl ProductionHostSourceFactory {
    pub fn new(registry: Arc<HostRegistry>) -> Self {
        Self { registry }
    }
}

impl HostSourceFactory for ProductionHostSourceFactory {
    fn source_for(&self, host_name: &str) -> Option<Arc<dyn HostInventorySource>> {
        let client = self.registry.try_client_for(host_name)?;
        Some(Arc::new(BollardInventorySource::new(client.docker())))
    }

    fn digest_resolver_for(&self, host_name: &str) -> Option<Arc<dyn DigestResolver>> {
        let client = self.registry.try_client_for(host_name)?;
        Some(Arc::new(BollardDigestResolver::new(client.docker())))
    }
}
