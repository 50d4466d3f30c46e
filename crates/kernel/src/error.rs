use serde::{Deserialize, Serialize};

/// The error taxonomy from the error-handling design, orthogonal to any
/// concrete error type. Every bounded-context error enum maps at least one
/// variant onto each kind it can produce, so a caller can match on kind
/// without knowing the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    UnreachableEndpoint,
    TransientRegistry,
    PrivateRegistry,
    ScannerUnavailable,
    InvalidInput,
    Conflict,
    Blocked,
    RollbackSucceeded,
    RollbackFailed,
}

/// Implemented by every bounded-context error enum so that handlers can
/// classify an error without matching every concrete variant.
pub trait Classified {
    fn kind(&self) -> ErrorKind;
}
