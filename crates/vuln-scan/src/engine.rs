use std::collections::HashSet;
use std::sync::Arc;

use cache::FileCache;
use kernel::{ContainerSnapshot, ScanResult, ScanStatus};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, OnceCell};
use tracing::{info, warn};

use crate::features::scan_image::{DigestResolver, ScanImageUseCase};

struct QueueItem {
    image: String,
    resolver: Arc<dyn DigestResolver>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub pending: usize,
    pub cache_entries: usize,
    pub cache_valid_entries: usize,
}

/// Owns the scan cache and a single background worker that drains a FIFO
/// queue of scan requests, deduplicated against images already in flight.
/// Mirrors the reference scanner's `_scan_queue` / `_pending_scans` /
/// `_scanner_loop` split: callers either wait synchronously (`scan`) or
/// fire-and-forget (`queue_scan`), and both paths converge on the same
/// use case.
pub struct VulnScanEngine {
    cache: Arc<FileCache>,
    use_case: Arc<ScanImageUseCase>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    queue_tx: OnceCell<mpsc::UnboundedSender<QueueItem>>,
}

impl VulnScanEngine {
    pub fn new(cache: Arc<FileCache>, use_case: Arc<ScanImageUseCase>) -> Self {
        Self {
            cache,
            use_case,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            queue_tx: OnceCell::new(),
        }
    }

    /// Runs a scan synchronously and returns the result, bypassing the
    /// background queue entirely.
    pub async fn scan(&self, image: &str, resolver: Arc<dyn DigestResolver>) -> Option<ScanResult> {
        match self.use_case.execute(image, resolver).await {
            Ok(result) => result,
            Err(e) => {
                warn!(image, error = %e, "synchronous scan failed");
                None
            }
        }
    }

    /// Enqueues a background scan. Returns `false` without enqueuing if the
    /// image is already in flight, so callers can fire this from a fan-out
    /// over every running container without building their own dedup set.
    pub async fn queue_scan(&self, image: &str, resolver: Arc<dyn DigestResolver>) -> bool {
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains(image) {
                return false;
            }
            in_flight.insert(image.to_string());
        }

        let tx = self.ensure_worker_started();
        if tx.send(QueueItem { image: image.to_string(), resolver }).is_err() {
            self.in_flight.lock().await.remove(image);
            return false;
        }
        true
    }

    /// Queues a scan for every snapshot that hasn't been scanned yet and
    /// isn't opted out via the `security.skip` hint. Returns the number of
    /// images actually accepted into the queue.
    pub async fn queue_auto_scan(
        &self,
        snapshots: &[ContainerSnapshot],
        resolver_for: impl Fn(&ContainerSnapshot) -> Option<Arc<dyn DigestResolver>>,
    ) -> usize {
        let mut queued = 0;
        for snapshot in snapshots {
            if snapshot.orchestration.security_skip {
                continue;
            }
            if !matches!(snapshot.scan_status, ScanStatus::NotScanned) {
                continue;
            }
            let Some(resolver) = resolver_for(snapshot) else { continue };
            if self.queue_scan(&snapshot.image_reference, resolver).await {
                queued += 1;
            }
        }
        queued
    }

    pub async fn get_cached(&self, digest: &str) -> Option<ScanResult> {
        let (value, valid) = self.cache.get(digest).await;
        if !valid {
            return None;
        }
        value.and_then(|v| serde_json::from_value(v).ok())
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn pending_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn stats(&self) -> ScanStats {
        let cache_stats = self.cache.stats().await;
        ScanStats {
            pending: self.pending_count().await,
            cache_entries: cache_stats.total_entries,
            cache_valid_entries: cache_stats.valid_entries,
        }
    }

    fn ensure_worker_started(&self) -> mpsc::UnboundedSender<QueueItem> {
        if let Some(tx) = self.queue_tx.get() {
            return tx.clone();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        match self.queue_tx.set(tx.clone()) {
            Ok(()) => {
                let use_case = self.use_case.clone();
                let in_flight = self.in_flight.clone();
                tokio::spawn(Self::worker_loop(use_case, in_flight, rx));
                tx
            }
            Err(_) => self.queue_tx.get().cloned().unwrap_or(tx),
        }
    }

    async fn worker_loop(
        use_case: Arc<ScanImageUseCase>,
        in_flight: Arc<Mutex<HashSet<String>>>,
        mut rx: mpsc::UnboundedReceiver<QueueItem>,
    ) {
        while let Some(item) = rx.recv().await {
            match use_case.execute(&item.image, item.resolver).await {
                Ok(_) => info!(image = %item.image, "queued scan complete"),
                Err(e) => warn!(image = %item.image, error = %e, "queued scan failed"),
            }
            in_flight.lock().await.remove(&item.image);
        }
    }
}
