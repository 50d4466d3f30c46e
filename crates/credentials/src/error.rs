use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential store database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Classified for CredentialError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}
