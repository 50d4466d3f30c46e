use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kernel::domain::container::TraefikRoute;
use regex::Regex;
use serde::Deserialize;
use tracing::{instrument, warn};

fn host_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Host\(`([^`]+)`\)").unwrap())
}

fn path_prefix_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PathPrefix\(`([^`]+)`\)").unwrap())
}

fn is_https_entrypoint(ep: &str) -> bool {
    let ep = ep.to_lowercase();
    ["https", "443", "secure", "ssl", "tls"].iter().any(|k| ep.contains(k))
}

/// Derives Traefik routes from `traefik.http.routers.<name>.rule` labels,
/// grounded in `get_data.py`'s `extract_traefik_routes`. Returns nothing if
/// Traefik integration is disabled or the container opted out via
/// `traefik.enable=false`.
pub fn routes_from_labels(labels: &HashMap<String, String>, traefik_enabled: bool) -> Vec<TraefikRoute> {
    if !traefik_enabled {
        return Vec::new();
    }
    if labels.get("traefik.enable").map(|v| v.eq_ignore_ascii_case("false")).unwrap_or(false) {
        return Vec::new();
    }

    let mut routes = Vec::new();
    for (key, rule) in labels {
        let Some(router_name) = key.strip_prefix("traefik.http.routers.").and_then(|rest| rest.strip_suffix(".rule"))
        else {
            continue;
        };

        for host_match in host_pattern().captures_iter(rule) {
            let host = host_match[1].to_string();

            let tls_key = format!("traefik.http.routers.{router_name}.tls");
            let is_tls = labels.get(&tls_key).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false);

            let entrypoints_key = format!("traefik.http.routers.{router_name}.entrypoints");
            let is_https_entrypoint = labels
                .get(&entrypoints_key)
                .map(|ep| ep.split(',').map(str::trim).any(is_https_entrypoint))
                .unwrap_or(false);

            let https = is_tls || is_https_entrypoint;
            let protocol = if https { "https" } else { "http" };

            let path_prefix = path_prefix_pattern().captures(rule).map(|c| c[1].to_string());
            let url = match &path_prefix {
                Some(p) => format!("{protocol}://{host}{p}"),
                None => format!("{protocol}://{host}"),
            };

            routes.push(TraefikRoute {
                router_name: router_name.to_string(),
                host: Some(host),
                path_prefix: path_prefix.clone(),
                https,
                url,
            });
        }
    }
    routes
}

#[derive(Debug, Clone, Deserialize)]
struct RawRouter {
    name: Option<String>,
    rule: Option<String>,
    service: Option<String>,
    #[serde(default)]
    tls: Option<serde_json::Value>,
    #[serde(rename = "entryPoints", default)]
    entry_points: Vec<String>,
}

struct CachedRouters {
    fetched_at: Instant,
    routers: Vec<RawRouter>,
}

/// Fallback source for routes not expressed as `traefik.*` labels: queries
/// the Traefik API directly and fuzzy-matches routers to container names,
/// grounded in `traefik_utils.py`'s `TraefikClient`.
pub struct TraefikApiClient {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
    cache: Mutex<Option<CachedRouters>>,
}

const CACHE_DURATION: Duration = Duration::from_secs(30);

impl TraefikApiClient {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("TRAEFIK_API_URL").ok().filter(|v| !v.is_empty())?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let username = std::env::var("TRAEFIK_API_USERNAME").ok().filter(|v| !v.is_empty());
        let password = std::env::var("TRAEFIK_API_PASSWORD").ok().filter(|v| !v.is_empty());
        let timeout_secs: u64 = std::env::var("TRAEFIK_API_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(5);

        Some(Self {
            base_url,
            username,
            password,
            timeout: Duration::from_secs(timeout_secs),
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        })
    }

    #[instrument(skip(self))]
    async fn all_routers(&self) -> Vec<RawRouter> {
        {
            let cache = self.cache.lock().expect("traefik cache mutex poisoned");
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < CACHE_DURATION {
                    return cached.routers.clone();
                }
            }
        }

        let mut request = self.http.get(format!("{}/api/http/routers", self.base_url)).timeout(self.timeout);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let routers = match request.send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => resp.json::<Vec<RawRouter>>().await.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "traefik API returned an error status");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to reach traefik API");
                Vec::new()
            }
        };

        let mut cache = self.cache.lock().expect("traefik cache mutex poisoned");
        *cache = Some(CachedRouters { fetched_at: Instant::now(), routers: routers.clone() });
        routers
    }

    fn routes_by_service(routers: &[RawRouter]) -> HashMap<String, Vec<TraefikRoute>> {
        let mut by_service: HashMap<String, Vec<TraefikRoute>> = HashMap::new();

        for router in routers {
            let Some(service) = router.service.as_deref().filter(|s| !s.is_empty()) else { continue };
            let Some(rule) = router.rule.as_deref() else { continue };

            let is_tls = router.tls.is_some();
            let is_https_entrypoint = router.entry_points.iter().any(|ep| is_https_entrypoint(ep));
            let https = is_tls || is_https_entrypoint;
            let protocol = if https { "https" } else { "http" };

            let path_prefix = path_prefix_pattern().captures(rule).map(|c| c[1].to_string());
            let base_service = service.split('@').next().unwrap_or(service).to_string();

            for host_match in host_pattern().captures_iter(rule) {
                let host = host_match[1].to_string();
                let url = match &path_prefix {
                    Some(p) => format!("{protocol}://{host}{p}"),
                    None => format!("{protocol}://{host}"),
                };
                by_service.entry(base_service.clone()).or_default().push(TraefikRoute {
                    router_name: router.name.clone().unwrap_or_default(),
                    host: Some(host),
                    path_prefix: path_prefix.clone(),
                    https,
                    url,
                });
            }
        }

        by_service
    }

    /// Fuzzy-matches a container (optionally stack-qualified) to a Traefik
    /// service name: raw name, lowercased, hyphen/underscore swapped, and
    /// `<stack>-<service>`/`<stack>_<service>` variants, substring-matched
    /// both directions.
    #[instrument(skip(self))]
    pub async fn routes_for_container(&self, container_name: &str, stack_name: Option<&str>) -> Vec<TraefikRoute> {
        let routers = self.all_routers().await;
        let by_service = Self::routes_by_service(&routers);

        let mut patterns = vec![
            container_name.to_string(),
            container_name.to_lowercase(),
            container_name.replace('-', "_"),
            container_name.replace('_', "-"),
        ];
        if let Some(stack) = stack_name {
            patterns.push(format!("{stack}-{container_name}"));
            patterns.push(format!("{stack}_{container_name}"));
            patterns.push(format!("{stack}-{container_name}").to_lowercase());
        }

        let mut matched = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();

        for (service_name, routes) in &by_service {
            let service_lower = service_name.to_lowercase();
            let matches = patterns
                .iter()
                .any(|p| service_lower.contains(&p.to_lowercase()) || p.to_lowercase().contains(&service_lower));
            if !matches {
                continue;
            }
            for route in routes {
                if seen_urls.insert(route.url.clone()) {
                    matched.push(route.clone());
                }
            }
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn disabled_integration_yields_no_routes() {
        let labels = labels_with(&[("traefik.http.routers.web.rule", "Host(`a.example.com`)")]);
        assert!(routes_from_labels(&labels, false).is_empty());
    }

    #[test]
    fn opt_out_label_yields_no_routes() {
        let labels = labels_with(&[
            ("traefik.enable", "false"),
            ("traefik.http.routers.web.rule", "Host(`a.example.com`)"),
        ]);
        assert!(routes_from_labels(&labels, true).is_empty());
    }

    #[test]
    fn plain_host_rule_is_http() {
        let labels = labels_with(&[("traefik.http.routers.web.rule", "Host(`a.example.com`)")]);
        let routes = routes_from_labels(&labels, true);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].url, "http://a.example.com");
        assert!(!routes[0].https);
    }

    #[test]
    fn tls_label_forces_https() {
        let labels = labels_with(&[
            ("traefik.http.routers.web.rule", "Host(`a.example.com`)"),
            ("traefik.http.routers.web.tls", "true"),
        ]);
        let routes = routes_from_labels(&labels, true);
        assert!(routes[0].https);
        assert_eq!(routes[0].url, "https://a.example.com");
    }

    #[test]
    fn https_named_entrypoint_forces_https() {
        let labels = labels_with(&[
            ("traefik.http.routers.web.rule", "Host(`a.example.com`)"),
            ("traefik.http.routers.web.entrypoints", "websecure"),
        ]);
        let routes = routes_from_labels(&labels, true);
        assert!(routes[0].https);
    }

    #[test]
    fn path_prefix_is_appended_to_url() {
        let labels = labels_with(&[(
            "traefik.http.routers.web.rule",
            "Host(`a.example.com`) && PathPrefix(`/api`)",
        )]);
        let routes = routes_from_labels(&labels, true);
        assert_eq!(routes[0].url, "http://a.example.com/api");
        assert_eq!(routes[0].path_prefix.as_deref(), Some("/api"));
    }

    #[test]
    fn routes_by_service_groups_by_base_service_name_stripping_provider_suffix() {
        let routers = vec![RawRouter {
            name: Some("web-router".into()),
            rule: Some("Host(`a.example.com`)".into()),
            service: Some("myapp_web@docker".into()),
            tls: None,
            entry_points: vec!["web".into()],
        }];
        let by_service = TraefikApiClient::routes_by_service(&routers);
        assert!(by_service.contains_key("myapp_web"));
        assert!(!by_service.contains_key("myapp_web@docker"));
    }

    #[test]
    fn https_entrypoint_detection_matches_known_substrings() {
        assert!(is_https_entrypoint("websecure"));
        assert!(is_https_entrypoint("443-entry"));
        assert!(!is_https_entrypoint("web"));
    }
}
