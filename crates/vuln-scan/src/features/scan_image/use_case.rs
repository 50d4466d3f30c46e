use std::sync::Arc;
use std::time::Duration;

use cache::FileCache;
use chrono::Utc;
use history::HistoryStore;
use kernel::{ScanResult, ScanSummary, Severity, Vulnerability};
use notifier::Notifier;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::ports::{DigestResolver, ScanError, ScannerClient};
use crate::validation::validate_image_name;

const HEALTH_CACHE_SECONDS: i64 = 30;
const SCANNER_JOIN_GRACE_SECONDS: u64 = 30;

/// Priority order the reference scanner's CVSS payload is searched in,
/// preferring a V3 score over a V2 one within each vendor.
const CVSS_VENDOR_PRIORITY: [&str; 5] = ["nvd", "redhat", "ghsa", "amazon", "oracle"];

/// Synchronous scan procedure described in §4.D: validate, health-check
/// (cached for 30s), resolve digest, consult the cache, invoke the
/// scanner under a bounded-wait wrapper, normalize, cache, persist
/// history, and notify.
pub struct ScanImageUseCase {
    scanner: Arc<dyn ScannerClient>,
    cache: Arc<FileCache>,
    scanner_timeout_secs: u64,
    history: Option<Arc<HistoryStore>>,
    notifier: Option<Arc<Notifier>>,
    health_cache: Mutex<Option<(bool, chrono::DateTime<Utc>)>>,
}

impl ScanImageUseCase {
    pub fn new(
        scanner: Arc<dyn ScannerClient>,
        cache: Arc<FileCache>,
        scanner_timeout_secs: u64,
        history: Option<Arc<HistoryStore>>,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self {
            scanner,
            cache,
            scanner_timeout_secs,
            history,
            notifier,
            health_cache: Mutex::new(None),
        }
    }

    #[instrument(skip(self, digest_resolver), fields(image = %image))]
    pub async fn execute(
        &self,
        image: &str,
        digest_resolver: Arc<dyn DigestResolver>,
    ) -> Result<Option<ScanResult>, ScanError> {
        if !validate_image_name(image) {
            warn!(image, "rejected invalid image name");
            return Err(ScanError::InvalidInput(image.to_string()));
        }

        if !self.healthy().await {
            if let Some(notifier) = &self.notifier {
                notifier.notify_scanner_unhealthy().await;
            }
            return Err(ScanError::ScannerUnavailable("health check failed".into()));
        }

        let digest = digest_resolver.resolve_digest(image).await?;

        if let (Some(value), true) = self.cache.get(&digest).await {
            if let Ok(cached) = serde_json::from_value::<ScanResult>(value) {
                return Ok(Some(cached));
            }
        }

        let start = Utc::now();
        let join_timeout =
            Duration::from_secs(self.scanner_timeout_secs + SCANNER_JOIN_GRACE_SECONDS);
        let raw = match tokio::time::timeout(join_timeout, self.scanner.scan_raw(image)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ScanError::Timeout),
        };

        let duration_ms = (Utc::now() - start).num_milliseconds().max(0) as u64;
        let result = Self::normalize(raw, image, &digest, start, duration_ms);

        self.cache
            .set(&digest, serde_json::to_value(&result).map_err(|e| ScanError::ExecutionError(e.to_string()))?)
            .await;

        if let Some(history) = &self.history {
            self.persist_history(history, &result).await;
        }

        if let Some(notifier) = &self.notifier {
            let container = image.split(':').next().unwrap_or(image).rsplit('/').next().unwrap_or(image);
            notifier
                .notify_scan_complete(
                    image,
                    container,
                    "fleet",
                    result.summary.critical,
                    result.summary.high,
                    result.summary.medium,
                    result.summary.low,
                    None,
                )
                .await;
        }

        info!(
            image,
            critical = result.summary.critical,
            high = result.summary.high,
            duration_ms,
            "scan complete"
        );

        Ok(Some(result))
    }

    async fn healthy(&self) -> bool {
        {
            let guard = self.health_cache.lock().await;
            if let Some((healthy, checked_at)) = *guard {
                if !kernel::time::is_stale(checked_at, HEALTH_CACHE_SECONDS as u64, Utc::now()) {
                    return healthy;
                }
            }
        }

        let healthy = self.scanner.health_check().await.unwrap_or(false);
        *self.health_cache.lock().await = Some((healthy, Utc::now()));
        healthy
    }

    async fn persist_history(&self, history: &HistoryStore, result: &ScanResult) {
        let saved = history
            .save_scan_result(
                &result.image,
                &result.image_digest,
                result.scanned_at,
                result.scan_duration_ms as i64,
                result.summary.critical as i64,
                result.summary.high as i64,
                result.summary.medium as i64,
                result.summary.low as i64,
                result.summary.unknown as i64,
                result.error.as_deref(),
            )
            .await;
        if let Err(e) = saved {
            warn!(error = %e, "failed to persist scan history");
        }

        for vuln in &result.vulnerabilities {
            let Some(fingerprint) = &vuln.fingerprint else { continue };
            if let Err(e) = history
                .record_fingerprint(&result.image_digest, fingerprint, &vuln.id, vuln.severity, result.scanned_at)
                .await
            {
                warn!(error = %e, "failed to record fingerprint");
            }
        }
    }

    /// Converts a Trivy-shaped `{"Results": [{"Vulnerabilities": [...]}]}`
    /// response into the normalized domain type. Any other scanner
    /// emitting the same shape is accepted unchanged.
    fn normalize(
        raw: Value,
        image: &str,
        digest: &str,
        scanned_at: chrono::DateTime<Utc>,
        duration_ms: u64,
    ) -> ScanResult {
        let mut vulnerabilities = Vec::new();

        let results = raw.get("Results").and_then(Value::as_array).cloned().unwrap_or_default();
        for entry in results {
            let Some(vulns) = entry.get("Vulnerabilities").and_then(Value::as_array) else { continue };
            for v in vulns {
                let id = v
                    .get("VulnerabilityID")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN")
                    .to_string();
                let severity = Severity::from_scanner_str(
                    v.get("Severity").and_then(Value::as_str).unwrap_or("UNKNOWN"),
                );
                let package_name = v.get("PkgName").and_then(Value::as_str).unwrap_or("").to_string();
                let installed_version =
                    v.get("InstalledVersion").and_then(Value::as_str).unwrap_or("").to_string();
                let fixed_version = v.get("FixedVersion").and_then(Value::as_str).map(str::to_string);
                let (cvss_score, cvss_vector) = Self::extract_cvss(v);
                let fingerprint = v
                    .get("Fingerprint")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(Self::derive_fingerprint(digest, &id, &package_name, &installed_version)));

                vulnerabilities.push(Vulnerability {
                    id,
                    severity,
                    title: v.get("Title").and_then(Value::as_str).unwrap_or("").to_string(),
                    description: v.get("Description").and_then(Value::as_str).unwrap_or("").to_string(),
                    package_name,
                    installed_version,
                    fixed_version,
                    cvss_score,
                    cvss_vector,
                    fingerprint,
                });
            }
        }

        let summary = ScanSummary::from_vulnerabilities(&vulnerabilities);

        ScanResult {
            image: image.to_string(),
            image_digest: digest.to_string(),
            scanned_at,
            scan_duration_ms: duration_ms,
            vulnerabilities,
            summary,
            error: None,
        }
    }

    /// Checks a fixed vendor priority list, preferring a V3 score/vector
    /// over a V2 one within the first vendor that reports anything.
    fn extract_cvss(v: &Value) -> (Option<f32>, Option<String>) {
        let Some(cvss) = v.get("CVSS") else { return (None, None) };
        for vendor in CVSS_VENDOR_PRIORITY {
            let Some(entry) = cvss.get(vendor) else { continue };
            let score = entry
                .get("V3Score")
                .and_then(Value::as_f64)
                .or_else(|| entry.get("V2Score").and_then(Value::as_f64));
            if let Some(score) = score {
                let vector = entry
                    .get("V3Vector")
                    .and_then(Value::as_str)
                    .or_else(|| entry.get("V2Vector").and_then(Value::as_str))
                    .map(str::to_string);
                return (Some(score as f32), vector);
            }
        }
        (None, None)
    }

    /// Stable per-(digest, finding) identifier used for first-sighting
    /// novelty tracking when the scanner response carries no fingerprint
    /// of its own.
    fn derive_fingerprint(digest: &str, cve_id: &str, package: &str, installed_version: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(digest.as_bytes());
        hasher.update(b":");
        hasher.update(cve_id.as_bytes());
        hasher.update(b":");
        hasher.update(package.as_bytes());
        hasher.update(b":");
        hasher.update(installed_version.as_bytes());
        hex::encode(hasher.finalize())
    }
}
