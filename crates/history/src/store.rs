use chrono::{DateTime, Utc};
use kernel::domain::history::TrendData;
use kernel::{FingerprintRecord, ScanHistoryRecord, Severity, TrendDirection};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Row};
use tracing::{info, instrument};

use crate::error::HistoryError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scan_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image TEXT NOT NULL,
    image_digest TEXT NOT NULL,
    scan_timestamp TEXT NOT NULL,
    scan_duration INTEGER NOT NULL,
    critical_count INTEGER NOT NULL,
    high_count INTEGER NOT NULL,
    medium_count INTEGER NOT NULL,
    low_count INTEGER NOT NULL,
    unknown_count INTEGER NOT NULL,
    total_count INTEGER NOT NULL,
    error TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_scan_results_digest ON scan_results(image_digest);
CREATE INDEX IF NOT EXISTS idx_scan_results_timestamp ON scan_results(scan_timestamp);

CREATE TABLE IF NOT EXISTS fingerprint_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_digest TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    cve_id TEXT NOT NULL,
    severity TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    UNIQUE(image_digest, fingerprint)
);
CREATE INDEX IF NOT EXISTS idx_fingerprint_digest ON fingerprint_history(image_digest);
CREATE INDEX IF NOT EXISTS idx_fingerprint_fp ON fingerprint_history(fingerprint);
"#;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HistoryStats {
    pub total_scans: i64,
    pub distinct_images: i64,
    pub oldest_scan: Option<DateTime<Utc>>,
    pub newest_scan: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct ScanResultRow {
    id: i64,
    image: String,
    image_digest: String,
    scan_timestamp: DateTime<Utc>,
    scan_duration: i64,
    critical_count: i64,
    high_count: i64,
    medium_count: i64,
    low_count: i64,
    unknown_count: i64,
    total_count: i64,
    error: Option<String>,
}

impl From<ScanResultRow> for ScanHistoryRecord {
    fn from(row: ScanResultRow) -> Self {
        ScanHistoryRecord {
            id: row.id,
            image: row.image,
            image_digest: row.image_digest,
            scanned_at: row.scan_timestamp,
            scan_duration_ms: row.scan_duration,
            critical_count: row.critical_count,
            high_count: row.high_count,
            medium_count: row.medium_count,
            low_count: row.low_count,
            unknown_count: row.unknown_count,
            total_count: row.total_count,
            error: row.error,
        }
    }
}

/// Persistent scan-history store owning `ScanHistoryRecord` and
/// `FingerprintRecord` exclusively, backed by a single SQLite file.
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn connect(path: &str) -> Result<Self, HistoryError> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(path, "history store ready");
        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn save_scan_result(
        &self,
        image: &str,
        image_digest: &str,
        scanned_at: DateTime<Utc>,
        scan_duration_ms: i64,
        critical: i64,
        high: i64,
        medium: i64,
        low: i64,
        unknown: i64,
        error: Option<&str>,
    ) -> Result<i64, HistoryError> {
        let total = critical + high + medium + low + unknown;
        let id = sqlx::query(
            "INSERT INTO scan_results
             (image, image_digest, scan_timestamp, scan_duration, critical_count,
              high_count, medium_count, low_count, unknown_count, total_count, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(image)
        .bind(image_digest)
        .bind(scanned_at)
        .bind(scan_duration_ms)
        .bind(critical)
        .bind(high)
        .bind(medium)
        .bind(low)
        .bind(unknown)
        .bind(total)
        .bind(error)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Returns `(is_new, first_seen_at)`. `is_new` is true only the first
    /// time this `(digest, fingerprint)` pair is observed.
    pub async fn check_fingerprint_is_new(
        &self,
        image_digest: &str,
        fingerprint: &str,
    ) -> Result<(bool, Option<DateTime<Utc>>), HistoryError> {
        let existing: Option<DateTime<Utc>> = sqlx::query(
            "SELECT first_seen_at FROM fingerprint_history WHERE image_digest = ? AND fingerprint = ?",
        )
        .bind(image_digest)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| row.get::<DateTime<Utc>, _>(0));

        Ok((existing.is_none(), existing))
    }

    /// `INSERT OR IGNORE` semantics: a duplicate `(digest, fingerprint)`
    /// leaves the original `first_seen_at` untouched.
    #[instrument(skip(self))]
    pub async fn record_fingerprint(
        &self,
        image_digest: &str,
        fingerprint: &str,
        cve_id: &str,
        severity: Severity,
        observed_at: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        sqlx::query(
            "INSERT OR IGNORE INTO fingerprint_history
             (image_digest, fingerprint, cve_id, severity, first_seen_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(image_digest)
        .bind(fingerprint)
        .bind(cve_id)
        .bind(severity_to_str(severity))
        .bind(observed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Classifies the trend from the two most recent non-error scans for a
    /// digest, ordered newest first.
    pub async fn calculate_trend(&self, image_digest: &str) -> Result<TrendData, HistoryError> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "SELECT total_count, critical_count, high_count FROM scan_results
             WHERE image_digest = ? AND error IS NULL
             ORDER BY scan_timestamp DESC LIMIT 2",
        )
        .bind(image_digest)
        .fetch_all(&self.pool)
        .await?;

        let totals: Vec<i64> = rows.iter().map(|r| r.0).collect();
        let direction = TrendDirection::classify(&totals);

        let (delta_critical, delta_high) = match (rows.first(), rows.get(1)) {
            (Some(newest), Some(previous)) => (newest.1 - previous.1, newest.2 - previous.2),
            _ => (0, 0),
        };

        Ok(TrendData {
            direction,
            current_total: totals.first().copied(),
            previous_total: totals.get(1).copied(),
            delta_critical,
            delta_high,
            scan_count: rows.len() as i64,
        })
    }

    pub async fn get_scan_history(
        &self,
        image_digest: &str,
        limit: i64,
    ) -> Result<Vec<ScanHistoryRecord>, HistoryError> {
        let rows: Vec<ScanResultRow> = sqlx::query_as(
            "SELECT id, image, image_digest, scan_timestamp, scan_duration,
                    critical_count, high_count, medium_count, low_count, unknown_count,
                    total_count, error
             FROM scan_results WHERE image_digest = ?
             ORDER BY scan_timestamp DESC LIMIT ?",
        )
        .bind(image_digest)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_new_vulnerabilities_since(
        &self,
        hours: i64,
        severity: Option<Severity>,
    ) -> Result<Vec<FingerprintRecord>, HistoryError> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let rows = if let Some(sev) = severity {
            sqlx::query(
                "SELECT id, image_digest, fingerprint, cve_id, severity, first_seen_at
                 FROM fingerprint_history WHERE first_seen_at >= ? AND severity = ?
                 ORDER BY first_seen_at DESC",
            )
            .bind(cutoff)
            .bind(severity_to_str(sev))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, image_digest, fingerprint, cve_id, severity, first_seen_at
                 FROM fingerprint_history WHERE first_seen_at >= ?
                 ORDER BY first_seen_at DESC",
            )
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .into_iter()
            .map(|row| FingerprintRecord {
                id: row.get(0),
                image_digest: row.get(1),
                fingerprint: row.get(2),
                cve_id: row.get(3),
                severity: severity_from_str(row.get::<String, _>(4).as_str()),
                first_seen_at: row.get(5),
            })
            .collect())
    }

    /// Hard-deletes scan rows older than `days`, returning the count removed.
    pub async fn cleanup_old_scans(&self, days: i64) -> Result<u64, HistoryError> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let result = sqlx::query("DELETE FROM scan_results WHERE scan_timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_stats(&self) -> Result<HistoryStats, HistoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*), COUNT(DISTINCT image_digest), MIN(scan_timestamp), MAX(scan_timestamp)
             FROM scan_results",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(HistoryStats {
            total_scans: row.get(0),
            distinct_images: row.get(1),
            oldest_scan: row.get(2),
            newest_scan: row.get(3),
        })
    }
}

fn severity_to_str(s: Severity) -> &'static str {
    match s {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
        Severity::Unknown => "UNKNOWN",
    }
}

fn severity_from_str(s: &str) -> Severity {
    Severity::from_scanner_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::connect(path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_then_fetch_history_round_trips() {
        let (store, _dir) = temp_store().await;
        store
            .save_scan_result("nginx:latest", "sha256:abc", Utc::now(), 1200, 1, 2, 3, 4, 0, None)
            .await
            .unwrap();
        let history = store.get_scan_history("sha256:abc", 5).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_count, 10);
    }

    #[tokio::test]
    async fn duplicate_fingerprint_insert_preserves_first_seen() {
        let (store, _dir) = temp_store().await;
        let first = Utc::now() - chrono::Duration::days(1);
        store
            .record_fingerprint("sha256:abc", "fp-1", "CVE-2024-1", Severity::High, first)
            .await
            .unwrap();
        store
            .record_fingerprint("sha256:abc", "fp-1", "CVE-2024-1", Severity::High, Utc::now())
            .await
            .unwrap();

        let (is_new, seen_at) = store.check_fingerprint_is_new("sha256:abc", "fp-1").await.unwrap();
        assert!(!is_new);
        let seen_at = seen_at.unwrap();
        assert!((seen_at - first).num_seconds().abs() < 2);
    }

    #[tokio::test]
    async fn trend_classifies_from_two_most_recent_scans() {
        let (store, _dir) = temp_store().await;
        store
            .save_scan_result("a", "sha256:x", Utc::now() - chrono::Duration::hours(2), 100, 5, 5, 0, 0, 0, None)
            .await
            .unwrap();
        store
            .save_scan_result("a", "sha256:x", Utc::now(), 100, 2, 2, 0, 0, 0, None)
            .await
            .unwrap();
        let trend = store.calculate_trend("sha256:x").await.unwrap();
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.scan_count, 2);
    }

    #[tokio::test]
    async fn trend_is_unknown_with_fewer_than_two_rows() {
        let (store, _dir) = temp_store().await;
        let trend = store.calculate_trend("sha256:none").await.unwrap();
        assert_eq!(trend.direction, TrendDirection::Unknown);
    }
}
