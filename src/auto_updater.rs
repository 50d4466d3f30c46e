//! Periodic batch auto-updater: every `interval`, takes up to
//! `batch_size` containers the last inventory pass flagged as having a
//! newer image, updates each (or merely records the decision in
//! `dry_run` mode), and appends one journal entry per attempt.

use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::app_state::AppState;

const JOURNAL_CAPACITY: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub container: String,
    pub server: String,
    pub image: String,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub status: String,
    pub method: String,
    pub message: Option<String>,
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

pub struct AutoUpdater {
    state: AppState,
    dry_run: bool,
    batch_size: usize,
    journal_path: PathBuf,
}

impl AutoUpdater {
    pub fn new(state: AppState, dry_run: bool, batch_size: usize, journal_path: PathBuf) -> Self {
        Self { state, dry_run, batch_size, journal_path }
    }

    /// One pass: re-collects inventory (the scheduler's own inventory loop
    /// may have already refreshed it, but this guarantees a current view
    /// even when scheduling is disabled), selects up to `batch_size`
    /// update-eligible containers, and drives each through the updater.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<(), String> {
        let snapshots = self.state.collector.execute().await;
        let candidates: Vec<_> = snapshots.into_iter().filter(|s| s.update_available).take(self.batch_size).collect();

        if candidates.is_empty() {
            return Ok(());
        }
        info!(count = candidates.len(), dry_run = self.dry_run, "auto-update batch starting");

        for snapshot in candidates {
            let old_version = Some(snapshot.image_reference.clone());
            let new_version = snapshot.version_info.as_ref().map(|v| v.tag.clone());

            let entry = if self.dry_run {
                JournalEntry {
                    container: snapshot.name.clone(),
                    server: snapshot.host_name.clone(),
                    image: snapshot.image_reference.clone(),
                    old_version,
                    new_version,
                    status: "dry_run".to_string(),
                    method: "dry_run".to_string(),
                    message: Some("dry run: update available but not applied".to_string()),
                    error: None,
                    timestamp: Utc::now(),
                }
            } else {
                self.apply_update(&snapshot, old_version, new_version).await
            };

            self.append_journal(entry).await;
        }

        Ok(())
    }

    async fn apply_update(
        &self,
        snapshot: &kernel::ContainerSnapshot,
        old_version: Option<String>,
        new_version: Option<String>,
    ) -> JournalEntry {
        let base = JournalEntry {
            container: snapshot.name.clone(),
            server: snapshot.host_name.clone(),
            image: snapshot.image_reference.clone(),
            old_version,
            new_version,
            status: "error".to_string(),
            method: "engine".to_string(),
            message: None,
            error: None,
            timestamp: Utc::now(),
        };

        let Some(engine) = (self.state.container_engine_for)(&snapshot.host_name) else {
            return JournalEntry { error: Some("no engine connection for host".to_string()), ..base };
        };

        match self
            .state
            .updater_use_case
            .update(engine, self.state.orchestrator.clone(), &snapshot.id, &snapshot.name, None, false)
            .await
        {
            Ok(outcome) => {
                let (status, method, message) = match outcome {
                    updater::UpdateOutcome::Success { message } => (
                        "success".to_string(),
                        if message.contains("orchestrator") { "orchestrator" } else { "engine" }.to_string(),
                        Some(message),
                    ),
                    updater::UpdateOutcome::AlreadyUpToDate => {
                        ("already_up_to_date".to_string(), "engine".to_string(), None)
                    }
                    updater::UpdateOutcome::Blocked(reason) => ("blocked".to_string(), "engine".to_string(), Some(reason)),
                    updater::UpdateOutcome::InProgress => ("in_progress".to_string(), "engine".to_string(), None),
                };
                JournalEntry { status, method, message, ..base }
            }
            Err(e) => {
                warn!(container = %snapshot.name, error = %e, "auto-update failed");
                JournalEntry { error: Some(e.to_string()), ..base }
            }
        }
    }

    async fn append_journal(&self, entry: JournalEntry) {
        let path = self.journal_path.clone();
        let result = tokio::task::spawn_blocking(move || append_journal_sync(&path, entry)).await;
        if let Err(e) = result {
            warn!(error = %e, "journal append task panicked");
        } else if let Ok(Err(e)) = result {
            warn!(error = %e, "failed to append auto-update journal entry");
        }
    }
}

fn append_journal_sync(path: &Path, entry: JournalEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new().read(true).write(true).create(true).open(path)?;
    file.lock_exclusive()?;

    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let mut entries: Vec<JournalEntry> = serde_json::from_str(&existing).unwrap_or_default();
    entries.push(entry);
    if entries.len() > JOURNAL_CAPACITY {
        let drop = entries.len() - JOURNAL_CAPACITY;
        entries.drain(0..drop);
    }

    let serialized = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, serialized)?;
    file.unlock()?;
    Ok(())
}
