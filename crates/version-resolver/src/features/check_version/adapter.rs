use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::ports::TagLister;
use crate::error::VersionError;

const TOKEN_TTL_SECONDS: i64 = 300;

/// Dispatches tag listing over the registry families the reference
/// checker supports, matching requests per host to the auth flow and
/// response shape that host actually uses. Tokens (Docker Hub, GHCR) are
/// cached per `(registry, repository)` for five minutes.
pub struct HttpTagLister {
    client: Client,
    tokens: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl Default for HttpTagLister {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTagLister {
    pub fn new() -> Self {
        let client = Client::builder().timeout(Duration::from_secs(10)).build().expect("reqwest client builder");
        Self { client, tokens: Mutex::new(HashMap::new()) }
    }

    async fn cached_token(&self, cache_key: &str) -> Option<String> {
        let guard = self.tokens.lock().await;
        let (token, expires) = guard.get(cache_key)?;
        (Utc::now() < *expires).then(|| token.clone())
    }

    async fn store_token(&self, cache_key: &str, token: String) {
        self.tokens
            .lock()
            .await
            .insert(cache_key.to_string(), (token, Utc::now() + chrono::Duration::seconds(TOKEN_TTL_SECONDS)));
    }

    async fn docker_hub_token(&self, repository: &str) -> Result<String, VersionError> {
        let cache_key = format!("dockerhub:{repository}");
        if let Some(token) = self.cached_token(&cache_key).await {
            return Ok(token);
        }
        let url = format!(
            "https://auth.docker.io/token?service=registry.docker.io&scope=repository:{repository}:pull"
        );
        let response = self.client.get(&url).send().await.map_err(|e| VersionError::Auth(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Auth(e.to_string()))?;
        let token = body.get("token").and_then(|v| v.as_str()).ok_or_else(|| VersionError::Auth("no token in response".into()))?.to_string();
        self.store_token(&cache_key, token.clone()).await;
        Ok(token)
    }

    async fn ghcr_token(&self, repository: &str) -> Result<String, VersionError> {
        let cache_key = format!("ghcr:{repository}");
        if let Some(token) = self.cached_token(&cache_key).await {
            return Ok(token);
        }
        let url = format!("https://ghcr.io/token?scope=repository:{repository}:pull");
        let response = self.client.get(&url).send().await.map_err(|e| VersionError::Auth(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Auth(e.to_string()))?;
        let token = body.get("token").and_then(|v| v.as_str()).ok_or_else(|| VersionError::Auth("no token in response".into()))?.to_string();
        self.store_token(&cache_key, token.clone()).await;
        Ok(token)
    }

    async fn docker_hub_tags(&self, repository: &str) -> Result<Vec<String>, VersionError> {
        let token = self.docker_hub_token(repository).await?;
        let url = format!("https://registry-1.docker.io/v2/{repository}/tags/list");
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VersionError::Registry(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        Ok(tags_array(&body))
    }

    /// Handles GHCR's Link-header pagination, capped at 10 pages as a
    /// safety limit against a misbehaving mirror looping forever.
    async fn ghcr_tags(&self, repository: &str) -> Result<Vec<String>, VersionError> {
        let token = self.ghcr_token(repository).await?;
        let mut all_tags = Vec::new();
        let mut url = Some(format!("https://ghcr.io/v2/{repository}/tags/list?n=1000"));
        let mut page = 0;

        while let Some(current_url) = url.take() {
            if page >= 10 {
                break;
            }
            let response = self
                .client
                .get(&current_url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| VersionError::Registry(e.to_string()))?;

            let next_url = response
                .headers()
                .get("Link")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);

            let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Registry(e.to_string()))?;
            all_tags.extend(tags_array(&body));
            page += 1;
            url = next_url;
        }

        Ok(all_tags)
    }

    async fn gcr_tags(&self, repository: &str) -> Result<Vec<String>, VersionError> {
        let url = format!("https://gcr.io/v2/{repository}/tags/list");
        let response = self.client.get(&url).send().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        Ok(tags_array(&body))
    }

    async fn quay_tags(&self, repository: &str) -> Result<Vec<String>, VersionError> {
        let url = format!("https://quay.io/api/v1/repository/{repository}/tag/");
        let response = self.client.get(&url).send().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        Ok(body
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|t| t.get("name").and_then(|n| n.as_str()).map(str::to_string)).collect())
            .unwrap_or_default())
    }

    async fn generic_v2_tags(&self, registry: &str, repository: &str) -> Result<Vec<String>, VersionError> {
        let url = format!("https://{registry}/v2/{repository}/tags/list");
        let response = self.client.get(&url).send().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        let body: serde_json::Value = response.json().await.map_err(|e| VersionError::Registry(e.to_string()))?;
        Ok(tags_array(&body))
    }
}

#[async_trait]
impl TagLister for HttpTagLister {
    async fn list_tags(&self, registry: &str, repository: &str) -> Result<Vec<String>, VersionError> {
        let result = match registry {
            "docker.io" => self.docker_hub_tags(repository).await,
            "ghcr.io" => self.ghcr_tags(repository).await,
            "lscr.io" => self.ghcr_tags(repository).await,
            "gcr.io" => self.gcr_tags(repository).await,
            "quay.io" => self.quay_tags(repository).await,
            other => self.generic_v2_tags(other, repository).await,
        };
        if let Err(e) = &result {
            debug!(registry, repository, error = %e, "tag listing failed");
        }
        result
    }
}

fn tags_array(body: &serde_json::Value) -> Vec<String> {
    body.get("tags")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn parse_next_link(link_header: &str) -> Option<String> {
    if !link_header.contains("rel=\"next\"") {
        return None;
    }
    for part in link_header.split(',') {
        if part.contains("rel=\"next\"") {
            let rel_url = part.split(';').next()?.trim().trim_matches(['<', '>']);
            return Some(if rel_url.starts_with('/') {
                format!("https://ghcr.io{rel_url}")
            } else {
                rel_url.to_string()
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_next_link() {
        let header = r#"<https://ghcr.io/v2/foo/tags/list?n=1000&last=bar>; rel="next""#;
        assert_eq!(
            parse_next_link(header),
            Some("https://ghcr.io/v2/foo/tags/list?n=1000&last=bar".to_string())
        );
    }

    #[test]
    fn no_next_link_returns_none() {
        assert_eq!(parse_next_link(""), None);
    }
}
