use regex::Regex;
use std::collections::BTreeMap;

/// One configured engine endpoint before it has been pinged.
#[derive(Debug, Clone)]
pub struct HostEndpointConfig {
    pub name: Option<String>,
    pub url: String,
    pub public_hostname: Option<String>,
    pub order: u32,
}

/// Parses the primary `DOCKER_HOST`/`DOCKER_HOST_NAME`/
/// `DOCKER_HOST_PUBLIC_HOSTNAME` triple plus any number of ordinally
/// numbered `DOCKER_HOST_<n>_URL` / `_NAME` / `_PUBLIC_HOSTNAME` triples,
/// in the style of `EnvironmentConfigParser` in the source.
pub fn parse_from_env(get: impl Fn(&str) -> Option<String>) -> Vec<HostEndpointConfig> {
    let mut endpoints = Vec::new();

    if let Some(url) = get("DOCKER_HOST") {
        endpoints.push(HostEndpointConfig {
            name: get("DOCKER_HOST_NAME"),
            url,
            public_hostname: get("DOCKER_HOST_PUBLIC_HOSTNAME"),
            order: 0,
        });
    }

    let numbered = Regex::new(r"^DOCKER_HOST_(\d+)_URL$").expect("static regex");
    let mut by_index: BTreeMap<u32, String> = BTreeMap::new();
    for key in std::env::vars().map(|(k, _)| k) {
        if let Some(caps) = numbered.captures(&key) {
            if let Ok(idx) = caps[1].parse::<u32>() {
                if let Some(url) = get(&key) {
                    by_index.insert(idx, url);
                }
            }
        }
    }

    for (idx, url) in by_index {
        endpoints.push(HostEndpointConfig {
            name: get(&format!("DOCKER_HOST_{idx}_NAME")),
            url,
            public_hostname: get(&format!("DOCKER_HOST_{idx}_PUBLIC_HOSTNAME")),
            order: idx + 1,
        });
    }

    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_primary_plus_numbered_endpoints_in_order() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("DOCKER_HOST", "unix:///var/run/docker.sock");
        env.insert("DOCKER_HOST_NAME", "local");
        env.insert("DOCKER_HOST_2_URL", "tcp://10.0.0.2:2375");
        env.insert("DOCKER_HOST_2_NAME", "beta");
        env.insert("DOCKER_HOST_1_URL", "tcp://10.0.0.1:2375");

        unsafe {
            for (k, v) in &env {
                std::env::set_var(k, v);
            }
        }

        let endpoints = parse_from_env(|key| env.get(key).map(|s| s.to_string()));
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0].name.as_deref(), Some("local"));
        assert_eq!(endpoints[1].order, 2);
        assert_eq!(endpoints[2].order, 3);

        unsafe {
            for k in env.keys() {
                std::env::remove_var(k);
            }
        }
    }
}
