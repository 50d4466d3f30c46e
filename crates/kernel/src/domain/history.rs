use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scan::Severity;

/// One past scan, as stored in the history table. Ordered by `scanned_at`
/// per digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHistoryRecord {
    pub id: i64,
    pub image: String,
    pub image_digest: String,
    pub scanned_at: DateTime<Utc>,
    pub scan_duration_ms: i64,
    pub critical_count: i64,
    pub high_count: i64,
    pub medium_count: i64,
    pub low_count: i64,
    pub unknown_count: i64,
    pub total_count: i64,
    pub error: Option<String>,
}

/// First-sighting marker for a unique vulnerability instance in a given
/// image. Unique on `(image_digest, fingerprint)`; the second insertion is
/// discarded, preserving the original `first_seen_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub id: i64,
    pub image_digest: String,
    pub fingerprint: String,
    pub cve_id: String,
    pub severity: Severity,
    pub first_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Degrading,
    Stable,
    Unknown,
}

impl TrendDirection {
    /// Classifies the direction from the two most recent totals, newest
    /// first. Fewer than two rows is always `Unknown`.
    pub fn classify(totals_newest_first: &[i64]) -> Self {
        match totals_newest_first {
            [newest, previous, ..] => match newest.cmp(previous) {
                std::cmp::Ordering::Less => TrendDirection::Improving,
                std::cmp::Ordering::Greater => TrendDirection::Degrading,
                std::cmp::Ordering::Equal => TrendDirection::Stable,
            },
            _ => TrendDirection::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendData {
    pub direction: TrendDirection,
    pub previous_total: Option<i64>,
    pub current_total: Option<i64>,
    pub delta_critical: i64,
    pub delta_high: i64,
    pub scan_count: i64,
}
