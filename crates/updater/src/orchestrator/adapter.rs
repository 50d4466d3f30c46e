use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::ports::{OrchestratorClient, OrchestratorError, StackMembership};

const STACK_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct StackSummary {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Names")]
    names: Vec<String>,
    #[serde(rename = "Labels", default)]
    labels: HashMap<String, String>,
}

/// A Portainer-style declarative orchestrator client. Stack lookups are
/// cached for five minutes so a bulk update pass doesn't re-enumerate
/// every stack per container; `is_configured()` never touches the
/// network, letting the updater decide whether to even build one of
/// these before the first real call.
pub struct PortainerClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    stack_cache: Mutex<Option<(Instant, Vec<(String, StackMembership)>)>>,
}

impl PortainerClient {
    pub fn from_env(verify_tls: bool) -> Option<Self> {
        if !Self::is_configured() {
            return None;
        }
        let base_url = std::env::var("PORTAINER_URL").ok()?;
        let api_key = std::env::var("PORTAINER_API_KEY").ok()?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
            stack_cache: Mutex::new(None),
        })
    }

    async fn refresh_membership_cache(&self) -> Result<Vec<(String, StackMembership)>, OrchestratorError> {
        let stacks: Vec<StackSummary> = self
            .http
            .get(format!("{}/api/stacks", self.base_url))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| OrchestratorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| OrchestratorError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| OrchestratorError::Request(e.to_string()))?;

        let mut memberships = Vec::new();
        for stack in stacks {
            let containers: Vec<ContainerSummary> = self
                .http
                .get(format!("{}/api/endpoints/1/docker/containers/json", self.base_url))
                .query(&[("filters", format!(r#"{{"label":["com.docker.stack.namespace={}"]}}"#, stack.name))])
                .header("X-API-Key", &self.api_key)
                .send()
                .await
                .map_err(|e| OrchestratorError::Request(e.to_string()))?
                .json()
                .await
                .unwrap_or_default();

            for container in containers {
                let Some(service_name) = container.labels.get("com.docker.swarm.service.name").cloned() else {
                    continue;
                };
                for name in &container.names {
                    memberships.push((
                        name.trim_start_matches('/').to_string(),
                        StackMembership {
                            stack_id: stack.id.to_string(),
                            stack_name: stack.name.clone(),
                            service_name: service_name.clone(),
                        },
                    ));
                }
            }
        }
        Ok(memberships)
    }
}

#[async_trait]
impl OrchestratorClient for PortainerClient {
    fn is_configured() -> bool {
        std::env::var("PORTAINER_URL").is_ok() && std::env::var("PORTAINER_API_KEY").is_ok()
    }

    async fn stack_for_container(&self, container_name: &str) -> Result<StackMembership, OrchestratorError> {
        let cached = {
            let guard = self.stack_cache.lock().unwrap();
            guard.as_ref().and_then(|(fetched_at, memberships)| {
                if fetched_at.elapsed() < STACK_CACHE_TTL {
                    Some(memberships.clone())
                } else {
                    None
                }
            })
        };

        let memberships = match cached {
            Some(m) => m,
            None => {
                let fresh = self.refresh_membership_cache().await?;
                *self.stack_cache.lock().unwrap() = Some((Instant::now(), fresh.clone()));
                fresh
            }
        };

        memberships
            .into_iter()
            .find(|(name, _)| name == container_name)
            .map(|(_, membership)| membership)
            .ok_or(OrchestratorError::NotManaged)
    }

    async fn fetch_compose(&self, stack_id: &str) -> Result<String, OrchestratorError> {
        self.http
            .get(format!("{}/api/stacks/{}/file", self.base_url, stack_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| OrchestratorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| OrchestratorError::Request(e.to_string()))?
            .text()
            .await
            .map_err(|e| OrchestratorError::Request(e.to_string()))
    }

    async fn redeploy(&self, stack_id: &str, compose: &str) -> Result<(), OrchestratorError> {
        self.http
            .put(format!("{}/api/stacks/{}", self.base_url, stack_id))
            .header("X-API-Key", &self.api_key)
            .json(&serde_json::json!({ "stackFileContent": compose, "prune": false }))
            .send()
            .await
            .map_err(|e| OrchestratorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| OrchestratorError::Request(e.to_string()))?;
        Ok(())
    }
}

/// Substitutes the `image:` line for `service_name` in a compose
/// document with `new_image`, via a narrow line scan rather than a full
/// YAML parse — the document is otherwise passed through byte-for-byte.
pub fn substitute_image_line(compose: &str, service_name: &str, new_image: &str) -> Result<String, OrchestratorError> {
    let mut lines: Vec<String> = compose.lines().map(str::to_string).collect();
    let service_header = format!("{service_name}:");
    let mut in_target_service = false;
    let mut service_indent = 0usize;
    let mut substituted = false;

    for line in &mut lines {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim_start();

        if trimmed.starts_with(&service_header) && !in_target_service {
            in_target_service = true;
            service_indent = indent;
            continue;
        }

        if in_target_service {
            if !trimmed.is_empty() && indent <= service_indent {
                break;
            }
            if trimmed.starts_with("image:") {
                *line = format!("{}image: {}", " ".repeat(indent), new_image);
                substituted = true;
                break;
            }
        }
    }

    if !substituted {
        return Err(OrchestratorError::ServiceNotFound(service_name.to_string()));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_image_line_under_target_service() {
        let compose = "services:\n  sonarr:\n    image: linuxserver/sonarr:4.0.17\n    ports:\n      - \"8989:8989\"\n  radarr:\n    image: linuxserver/radarr:5.0.0\n";
        let result = substitute_image_line(compose, "sonarr", "linuxserver/sonarr:4.0.18").unwrap();
        assert!(result.contains("image: linuxserver/sonarr:4.0.18"));
        assert!(result.contains("image: linuxserver/radarr:5.0.0"));
    }

    #[test]
    fn unknown_service_is_an_error() {
        let compose = "services:\n  sonarr:\n    image: linuxserver/sonarr:4.0.17\n";
        let result = substitute_image_line(compose, "radarr", "linuxserver/radarr:5.0.1");
        assert!(result.is_err());
    }

    #[test]
    fn is_configured_requires_both_variables() {
        unsafe {
            std::env::remove_var("PORTAINER_URL");
            std::env::remove_var("PORTAINER_API_KEY");
        }
        assert!(!PortainerClient::is_configured());
    }
}
