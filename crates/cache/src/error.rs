use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to lock cache file: {0}")]
    Lock(#[source] std::io::Error),
    #[error("failed to read cache file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write cache file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to serialize cache value: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Classified for CacheError {
    fn kind(&self) -> ErrorKind {
        // Every failure mode here is "best-effort cache, discard and log",
        // which is not one of the caller-visible kinds; callers of this
        // crate never see `CacheError` propagate — see `FileCache::get`.
        ErrorKind::Config
    }
}
