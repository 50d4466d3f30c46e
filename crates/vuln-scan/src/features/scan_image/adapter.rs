use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::ports::{ScanError, ScannerClient};

/// HTTP adapter for an external Trivy-compatible scanner service, reached
/// at `base_url` (e.g. `http://trivy:8080`).
pub struct TrivyHttpScannerAdapter {
    client: Client,
    base_url: String,
}

impl TrivyHttpScannerAdapter {
    pub fn new(base_url: String, request_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .expect("reqwest client builder");
        Self { client, base_url }
    }
}

#[async_trait]
impl ScannerClient for TrivyHttpScannerAdapter {
    async fn health_check(&self) -> Result<bool, ScanError> {
        let url = format!("{}/healthz", self.base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => Err(ScanError::ScannerUnavailable(e.to_string())),
        }
    }

    async fn scan_raw(&self, image: &str) -> Result<Value, ScanError> {
        let url = format!("{}/scan", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "image": image }))
            .send()
            .await
            .map_err(|e| ScanError::ExecutionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScanError::ExecutionError(format!(
                "scanner returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ScanError::ExecutionError(e.to_string()))
    }
}
