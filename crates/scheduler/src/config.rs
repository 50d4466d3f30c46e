use std::path::PathBuf;
use std::time::Duration;

/// Timing and lock-file configuration for the two periodic loops.
/// Defaults match §4.H / §6.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub lock_path: PathBuf,
    pub inventory_initial_delay: Duration,
    pub inventory_refresh_interval: Duration,
    pub version_initial_delay: Duration,
    pub version_refresh_interval: Duration,
}

impl SchedulerConfig {
    pub fn new(lock_path: PathBuf) -> Self {
        Self {
            lock_path,
            inventory_initial_delay: Duration::from_secs(30),
            inventory_refresh_interval: Duration::from_secs(300),
            version_initial_delay: Duration::from_secs(5),
            version_refresh_interval: Duration::from_secs(3600),
        }
    }
}
