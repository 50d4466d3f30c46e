use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cache::FileCache;
use serde_json::json;

use super::ports::{DigestResolver, ScanError, ScannerClient};
use super::use_case::ScanImageUseCase;

struct StubScanner {
    healthy: bool,
    response: serde_json::Value,
    calls: AtomicUsize,
}

#[async_trait]
impl ScannerClient for StubScanner {
    async fn health_check(&self) -> Result<bool, ScanError> {
        Ok(self.healthy)
    }

    async fn scan_raw(&self, _image: &str) -> Result<serde_json::Value, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

struct StubResolver {
    digest: String,
}

#[async_trait]
impl DigestResolver for StubResolver {
    async fn resolve_digest(&self, _image_reference: &str) -> Result<String, ScanError> {
        Ok(self.digest.clone())
    }
}

fn trivy_response() -> serde_json::Value {
    json!({
        "Results": [{
            "Vulnerabilities": [
                {
                    "VulnerabilityID": "CVE-2024-0001",
                    "Severity": "CRITICAL",
                    "PkgName": "openssl",
                    "InstalledVersion": "1.1.1",
                    "FixedVersion": "1.1.2",
                    "Title": "bad thing",
                    "Description": "a very bad thing",
                    "CVSS": {
                        "nvd": { "V3Score": 9.8, "V3Vector": "CVSS:3.1/..." }
                    }
                },
                {
                    "VulnerabilityID": "CVE-2024-0002",
                    "Severity": "LOW",
                    "PkgName": "libc",
                    "InstalledVersion": "2.31",
                }
            ]
        }]
    })
}

fn temp_cache() -> (Arc<FileCache>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan_cache.json");
    (Arc::new(FileCache::new("scan", path, 3600)), dir)
}

#[tokio::test]
async fn rejects_invalid_image_name_before_touching_scanner() {
    let (cache, _dir) = temp_cache();
    let scanner = Arc::new(StubScanner { healthy: true, response: json!({}), calls: AtomicUsize::new(0) });
    let use_case = ScanImageUseCase::new(scanner.clone(), cache, 60, None, None);
    let resolver = Arc::new(StubResolver { digest: "sha256:x".into() });

    let err = use_case.execute("; rm -rf /", resolver).await.unwrap_err();
    assert!(matches!(err, ScanError::InvalidInput(_)));
    assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unhealthy_scanner_short_circuits() {
    let (cache, _dir) = temp_cache();
    let scanner = Arc::new(StubScanner { healthy: false, response: json!({}), calls: AtomicUsize::new(0) });
    let use_case = ScanImageUseCase::new(scanner, cache, 60, None, None);
    let resolver = Arc::new(StubResolver { digest: "sha256:x".into() });

    let err = use_case.execute("nginx:latest", resolver).await.unwrap_err();
    assert!(matches!(err, ScanError::ScannerUnavailable(_)));
}

#[tokio::test]
async fn scan_normalizes_and_summarizes() {
    let (cache, _dir) = temp_cache();
    let scanner =
        Arc::new(StubScanner { healthy: true, response: trivy_response(), calls: AtomicUsize::new(0) });
    let use_case = ScanImageUseCase::new(scanner, cache, 60, None, None);
    let resolver = Arc::new(StubResolver { digest: "sha256:abc".into() });

    let result = use_case.execute("nginx:latest", resolver).await.unwrap().unwrap();
    assert_eq!(result.summary.critical, 1);
    assert_eq!(result.summary.low, 1);
    assert_eq!(result.vulnerabilities[0].cvss_score, Some(9.8));
    assert!(result.vulnerabilities[0].fingerprint.is_some());
}

#[tokio::test]
async fn second_scan_of_same_digest_hits_cache_not_scanner() {
    let (cache, _dir) = temp_cache();
    let scanner =
        Arc::new(StubScanner { healthy: true, response: trivy_response(), calls: AtomicUsize::new(0) });
    let use_case = ScanImageUseCase::new(scanner.clone(), cache, 60, None, None);
    let resolver = Arc::new(StubResolver { digest: "sha256:abc".into() });

    use_case.execute("nginx:latest", resolver.clone()).await.unwrap();
    use_case.execute("nginx:latest", resolver).await.unwrap();
    assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);
}
