use serde::{Deserialize, Serialize};

/// Boolean answer to "is this container behind?", cache-keyed by
/// `(host, container, image)` with a short TTL (default 120s).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateDecision {
    pub update_available: bool,
}
