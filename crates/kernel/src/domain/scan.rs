use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five severity buckets a scanner finding is normalized into.
/// Anything the scanner reports that does not match one of the first four
/// (case-insensitively) is bucketed as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// Maps a scanner-reported severity string, uppercasing before matching.
    /// Anything unrecognized maps to `Unknown` rather than failing the scan.
    pub fn from_scanner_str(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

/// One normalized vulnerability finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub package_name: String,
    pub installed_version: String,
    pub fixed_version: Option<String>,
    pub cvss_score: Option<f32>,
    pub cvss_vector: Option<String>,
    /// Scanner-supplied stable identifier for this exact finding in this
    /// exact image; used for first-sighting novelty tracking. Not every
    /// scanner response carries one.
    pub fingerprint: Option<String>,
}

/// Per-severity counts plus their sum, carried alongside a `ScanResult`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub unknown: u32,
}

impl ScanSummary {
    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low + self.unknown
    }

    pub fn from_vulnerabilities(vulns: &[Vulnerability]) -> Self {
        let mut summary = ScanSummary::default();
        for v in vulns {
            match v.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Canonical normalized vulnerability report for one image digest.
///
/// Invariant: `summary.total() == vulnerabilities.len()` (enforced by
/// construction in the vuln-scan use case, not re-checked here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub image: String,
    pub image_digest: String,
    pub scanned_at: DateTime<Utc>,
    pub scan_duration_ms: u64,
    pub vulnerabilities: Vec<Vulnerability>,
    pub summary: ScanSummary,
    pub error: Option<String>,
}
