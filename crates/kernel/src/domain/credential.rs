use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential metadata safe to hand back to a caller: the secret hash is
/// never included, only the display prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTokenInfo {
    pub id: i64,
    pub key_prefix: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}
