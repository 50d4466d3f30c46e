use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::election::LeaderGuard;
use crate::ports::RefreshTask;

/// The two spawned loop handles and the held leader lock, kept alive for
/// the scheduler's lifetime; dropping this releases the lock and the
/// loops observe the cancellation token on their next tick boundary.
pub struct SchedulerHandle {
    _leader: LeaderGuard,
    inventory_loop: JoinHandle<()>,
    version_loop: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) {
        self.inventory_loop.abort();
        self.version_loop.abort();
        let _ = self.inventory_loop.await;
        let _ = self.version_loop.await;
    }
}

/// Attempts leader election and, if elected, spawns the inventory-refresh
/// and version-check-refresh loops. Returns `None` for a losing process —
/// it still serves reads from the shared caches, it simply never
/// schedules the background work.
pub async fn start(
    config: SchedulerConfig,
    inventory_task: Arc<dyn RefreshTask>,
    version_task: Arc<dyn RefreshTask>,
    cancel: CancellationToken,
) -> std::io::Result<Option<SchedulerHandle>> {
    let lock_path = config.lock_path.clone();
    let leader = tokio::task::spawn_blocking(move || LeaderGuard::try_acquire(&lock_path))
        .await
        .expect("leader election task panicked")?;

    let Some(leader) = leader else {
        info!("lost leader election, skipping scheduling");
        return Ok(None);
    };
    info!("won leader election, starting refresh loops");

    let inventory_loop = tokio::spawn(run_loop(
        inventory_task,
        config.inventory_initial_delay,
        config.inventory_refresh_interval,
        cancel.clone(),
    ));
    let version_loop = tokio::spawn(run_loop(
        version_task,
        config.version_initial_delay,
        config.version_refresh_interval,
        cancel,
    ));

    Ok(Some(SchedulerHandle { _leader: leader, inventory_loop, version_loop }))
}

#[instrument(skip(task, cancel), fields(task = task.name()))]
async fn run_loop(
    task: Arc<dyn RefreshTask>,
    initial_delay: std::time::Duration,
    interval: std::time::Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = tokio::time::sleep(initial_delay) => {}
        _ = cancel.cancelled() => return,
    }

    loop {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = task.run().await {
            warn!(error = %e, "refresh task failed, continuing on schedule");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => return,
        }
    }
}
