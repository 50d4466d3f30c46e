//! Root error type aggregating every bounded-context error behind one
//! enum, carrying the shared [`ErrorKind`] classification alongside the
//! concrete variant so a handler can match on kind without enumerating
//! every crate's own error type.

use kernel::error::Classified;
use kernel::ErrorKind;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Collector(#[from] inventory::CollectorError),
    #[error(transparent)]
    Scan(#[from] vuln_scan::features::scan_image::ScanError),
    #[error(transparent)]
    Version(#[from] version_resolver::VersionError),
    #[error(transparent)]
    UpdateCheck(#[from] update_checker::UpdateCheckError),
    #[error(transparent)]
    Updater(#[from] updater::UpdaterError),
    #[error(transparent)]
    History(#[from] history::HistoryError),
    #[error(transparent)]
    Credential(#[from] credentials::CredentialError),
    #[error("scheduler start failed: {0}")]
    Scheduler(#[source] std::io::Error),
}

impl Classified for AppError {
    fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(e) => e.kind(),
            AppError::Collector(e) => e.kind(),
            AppError::Scan(e) => e.kind(),
            AppError::Version(e) => e.kind(),
            AppError::UpdateCheck(e) => e.kind(),
            AppError::Updater(e) => e.kind(),
            AppError::History(e) => e.kind(),
            AppError::Credential(e) => e.kind(),
            AppError::Scheduler(_) => ErrorKind::Config,
        }
    }
}
