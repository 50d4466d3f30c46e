use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum UpdateCheckError {
    #[error("image pull failed: {0}")]
    PullFailed(String),
    #[error("image pull timed out")]
    PullTimeout,
    #[error("image inspection failed: {0}")]
    InspectFailed(String),
    #[error("check was cancelled")]
    Cancelled,
}

impl Classified for UpdateCheckError {
    fn kind(&self) -> ErrorKind {
        match self {
            // A failed pull is almost always an auth/visibility problem
            // against a private or offline registry; the checker resolves
            // this to "no update" rather than surfacing an error (§4.F).
            UpdateCheckError::PullFailed(_) | UpdateCheckError::PullTimeout => {
                ErrorKind::PrivateRegistry
            }
            UpdateCheckError::InspectFailed(_) => ErrorKind::UnreachableEndpoint,
            UpdateCheckError::Cancelled => ErrorKind::Conflict,
        }
    }
}
