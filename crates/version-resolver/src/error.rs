use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("registry request failed: {0}")]
    Registry(String),
    #[error("registry authentication failed: {0}")]
    Auth(String),
    #[error("no tags returned for repository")]
    NoTags,
}

impl Classified for VersionError {
    fn kind(&self) -> ErrorKind {
        match self {
            VersionError::Registry(_) | VersionError::NoTags => ErrorKind::TransientRegistry,
            VersionError::Auth(_) => ErrorKind::PrivateRegistry,
        }
    }
}
