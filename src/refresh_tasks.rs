//! The two periodic jobs the elected scheduler leader drives: a full
//! inventory pass (warms the scan cache via auto-enqueue) and a version
//! sweep over every distinct image reference currently running.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use inventory::CollectInventoryUseCase;
use scheduler::RefreshTask;
use tracing::info;
use version_resolver::CheckVersionUseCase;

pub struct InventoryRefreshTask {
    collector: Arc<CollectInventoryUseCase>,
}

impl InventoryRefreshTask {
    pub fn new(collector: Arc<CollectInventoryUseCase>) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl RefreshTask for InventoryRefreshTask {
    async fn run(&self) -> Result<(), String> {
        let snapshots = self.collector.execute().await;
        info!(containers = snapshots.len(), "inventory refresh complete");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "inventory_refresh"
    }
}

pub struct VersionRefreshTask {
    collector: Arc<CollectInventoryUseCase>,
    version_use_case: Arc<CheckVersionUseCase>,
}

impl VersionRefreshTask {
    pub fn new(collector: Arc<CollectInventoryUseCase>, version_use_case: Arc<CheckVersionUseCase>) -> Self {
        Self { collector, version_use_case }
    }
}

#[async_trait]
impl RefreshTask for VersionRefreshTask {
    async fn run(&self) -> Result<(), String> {
        let snapshots = self.collector.execute().await;
        let images: HashSet<String> = snapshots
            .into_iter()
            .map(|s| s.image_reference)
            .filter(|i| !i.is_empty())
            .collect();

        for image in &images {
            self.version_use_case.check_for_newer_version(image).await;
        }
        info!(images = images.len(), "version refresh complete");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "version_refresh"
    }
}
