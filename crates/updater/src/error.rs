use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    #[error("update already in progress for this container")]
    LockHeld,
    #[error("container is labelled skip or pin")]
    Blocked(String),
    #[error("engine operation failed: {0}")]
    Engine(String),
    #[error("update failed, original container restored: {0}")]
    RollbackSucceeded(String),
    #[error("update failed and restoration also failed, original name {original_name:?} needs operator intervention: {detail}")]
    RollbackFailed { original_name: String, detail: String },
}

impl Classified for UpdaterError {
    fn kind(&self) -> ErrorKind {
        match self {
            UpdaterError::LockHeld => ErrorKind::Conflict,
            UpdaterError::Blocked(_) => ErrorKind::Blocked,
            UpdaterError::Engine(_) => ErrorKind::UnreachableEndpoint,
            UpdaterError::RollbackSucceeded(_) => ErrorKind::RollbackSucceeded,
            UpdaterError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
        }
    }
}
