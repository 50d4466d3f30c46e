use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use kernel::ApiTokenInfo;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, instrument};

use crate::error::CredentialError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS api_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key_hash TEXT NOT NULL UNIQUE,
    key_prefix TEXT NOT NULL,
    label TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_used_at TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by TEXT NOT NULL DEFAULT 'admin'
);
"#;

const TOKEN_PREFIX: &str = "dpk_";
const EXPIRED_RETENTION_DAYS: i64 = 7;

/// Persistent token store for programmatic access, owning `ApiTokenInfo`
/// exclusively. A single process-local mutex serializes writes; the
/// backing pool is connected lazily on first use, under the same mutex.
pub struct CredentialStore {
    db_path: PathBuf,
    pool: OnceCell<SqlitePool>,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            pool: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    async fn pool(&self) -> Result<&SqlitePool, CredentialError> {
        self.pool
            .get_or_try_init(|| async {
                let _guard = self.write_lock.lock().await;
                if let Some(parent) = self.db_path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let url = format!("sqlite://{}?mode=rwc", self.db_path.display());
                let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
                sqlx::query(SCHEMA).execute(&pool).await?;
                info!(path = %self.db_path.display(), "credential store ready");
                Ok::<_, CredentialError>(pool)
            })
            .await
    }

    /// Generates 32 random bytes, renders them as `dpk_` + 64 lowercase hex
    /// characters, stores only the Sha-256 hash plus an 8-char display
    /// prefix. Returns `(id, plaintext)` — the plaintext is irrecoverable
    /// after this call returns.
    #[instrument(skip(self))]
    pub async fn create(&self, label: &str, ttl_seconds: i64) -> Result<(i64, String), CredentialError> {
        let pool = self.pool().await?;
        let _guard = self.write_lock.lock().await;

        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let plaintext = format!("{TOKEN_PREFIX}{}", hex::encode(bytes));
        let key_hash = hash_token(&plaintext);
        let key_prefix: String = plaintext.chars().take(8).collect();

        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_seconds);

        let id = sqlx::query(
            "INSERT INTO api_keys (key_hash, key_prefix, label, created_at, expires_at, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(&key_hash)
        .bind(&key_prefix)
        .bind(label)
        .bind(now)
        .bind(expires_at)
        .execute(pool)
        .await?
        .last_insert_rowid();

        info!(id, label, "api token issued");
        Ok((id, plaintext))
    }

    /// Hashes `plaintext` and looks it up; rejects inactive or expired
    /// rows; updates `last_used_at` on success.
    #[instrument(skip(self, plaintext))]
    pub async fn validate(&self, plaintext: &str) -> Result<Option<ApiTokenInfo>, CredentialError> {
        let pool = self.pool().await?;
        let key_hash = hash_token(plaintext);

        let row = sqlx::query(
            "SELECT id, key_prefix, label, created_at, expires_at, last_used_at, is_active
             FROM api_keys WHERE key_hash = ?",
        )
        .bind(&key_hash)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let is_active: i64 = row.get("is_active");
        let expires_at: DateTime<Utc> = row.get("expires_at");
        if is_active == 0 || expires_at <= Utc::now() {
            return Ok(None);
        }

        let id: i64 = row.get("id");
        let _guard = self.write_lock.lock().await;
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        Ok(Some(ApiTokenInfo {
            id,
            key_prefix: row.get("key_prefix"),
            label: row.get("label"),
            created_at: row.get("created_at"),
            expires_at,
            last_used_at: Some(Utc::now()),
            revoked: false,
        }))
    }

    /// Every token, hashes never included.
    pub async fn list(&self) -> Result<Vec<ApiTokenInfo>, CredentialError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT id, key_prefix, label, created_at, expires_at, last_used_at, is_active
             FROM api_keys ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ApiTokenInfo {
                id: row.get("id"),
                key_prefix: row.get("key_prefix"),
                label: row.get("label"),
                created_at: row.get("created_at"),
                expires_at: row.get("expires_at"),
                last_used_at: row.get("last_used_at"),
                revoked: row.get::<i64, _>("is_active") == 0,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn revoke(&self, id: i64) -> Result<bool, CredentialError> {
        let pool = self.pool().await?;
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-deletes rows whose expiry is more than 7 days in the past.
    #[instrument(skip(self))]
    pub async fn cleanup_expired(&self) -> Result<u64, CredentialError> {
        let pool = self.pool().await?;
        let _guard = self.write_lock.lock().await;
        let cutoff = Utc::now() - Duration::days(EXPIRED_RETENTION_DAYS);
        let result = sqlx::query("DELETE FROM api_keys WHERE expires_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn hash_token(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (CredentialStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.db"));
        (store, dir)
    }

    #[tokio::test]
    async fn token_format_matches_dpk_plus_64_hex() {
        let (store, _dir) = temp_store().await;
        let (_id, plaintext) = store.create("ci", 3600).await.unwrap();
        assert!(plaintext.starts_with("dpk_"));
        assert_eq!(plaintext.len(), 68);
        assert!(plaintext[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[tokio::test]
    async fn freshly_issued_token_validates_once_then_revocation_blocks_it() {
        let (store, _dir) = temp_store().await;
        let (id, plaintext) = store.create("ci", 3600).await.unwrap();

        let info = store.validate(&plaintext).await.unwrap();
        assert!(info.is_some());

        assert!(store.revoke(id).await.unwrap());
        assert!(store.validate(&plaintext).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_token_fails_validation() {
        let (store, _dir) = temp_store().await;
        let (_id, plaintext) = store.create("ci", -1).await.unwrap();
        assert!(store.validate(&plaintext).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn plaintext_is_never_retrievable_from_list() {
        let (store, _dir) = temp_store().await;
        store.create("ci", 3600).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key_prefix.len(), 8);
    }

    #[tokio::test]
    async fn cleanup_expired_only_removes_long_expired_rows() {
        let (store, _dir) = temp_store().await;
        store.create("recent-expiry", -1).await.unwrap();
        let removed = store.cleanup_expired().await.unwrap();
        assert_eq!(removed, 0);
    }
}
