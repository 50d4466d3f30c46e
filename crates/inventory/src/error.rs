use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("engine endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("host collection timed out")]
    Timeout,
}

impl Classified for CollectorError {
    fn kind(&self) -> ErrorKind {
        match self {
            CollectorError::Unreachable(_) | CollectorError::Timeout => ErrorKind::UnreachableEndpoint,
        }
    }
}
