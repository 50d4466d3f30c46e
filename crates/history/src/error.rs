use kernel::ErrorKind;
use kernel::error::Classified;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("history store migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Classified for HistoryError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}
