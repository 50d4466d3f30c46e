use std::collections::HashMap;

use bollard::models::{ContainerInspectResponse, EndpointSettings};

/// One label that compose stamps with the resolved image digest and
/// rewrites on every deploy; carrying it forward would pin the recreated
/// container right back to the digest we are replacing.
const STALE_DIGEST_LABEL: &str = "com.docker.compose.image";

/// A network attachment captured before removal, re-attached after the
/// replacement container exists.
#[derive(Debug, Clone)]
pub struct NetworkAttachment {
    pub network_name: String,
    pub aliases: Vec<String>,
    pub ipv4_address: Option<String>,
}

/// Everything needed to recreate a container identically (modulo image),
/// extracted once up front so the replace step never re-reads live state
/// that might have changed underneath it.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub name: String,
    pub image: String,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub working_dir: Option<String>,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub binds: Vec<String>,
    pub port_bindings: HashMap<String, Option<Vec<(String, String)>>>,
    pub network_mode: Option<String>,
    pub restart_policy: Option<(String, i64)>,
    pub privileged: bool,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub devices: Vec<String>,
    pub security_opt: Vec<String>,
    pub networks: Vec<NetworkAttachment>,
}

impl EffectiveConfig {
    /// Returns `None` when hostname is meaningless (container-network mode
    /// shares the target's network namespace and hostname).
    fn effective_hostname(config_hostname: Option<String>, network_mode: &Option<String>) -> Option<String> {
        match network_mode {
            Some(mode) if mode.starts_with("container:") => None,
            _ => config_hostname,
        }
    }

    pub fn extract(inspect: &ContainerInspectResponse) -> Self {
        let config = inspect.config.clone().unwrap_or_default();
        let host_config = inspect.host_config.clone().unwrap_or_default();
        let network_mode = host_config.network_mode.clone();

        let mut labels = config.labels.clone().unwrap_or_default();
        labels.remove(STALE_DIGEST_LABEL);

        let port_bindings = host_config
            .port_bindings
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| {
                let mapped = bindings.map(|bs| {
                    bs.into_iter()
                        .map(|b| (b.host_ip.unwrap_or_default(), b.host_port.unwrap_or_default()))
                        .collect()
                });
                (port, mapped)
            })
            .collect();

        let restart_policy = host_config
            .restart_policy
            .and_then(|rp| rp.name.map(|name| (name.to_string(), rp.maximum_retry_count.unwrap_or(0))));

        let networks = inspect
            .network_settings
            .as_ref()
            .and_then(|ns| ns.networks.as_ref())
            .map(|nets| {
                nets.iter()
                    .filter(|(name, _)| name.as_str() != "bridge" && name.as_str() != "none" && name.as_str() != "host")
                    .map(|(name, settings): (&String, &EndpointSettings)| NetworkAttachment {
                        network_name: name.clone(),
                        aliases: settings.aliases.clone().unwrap_or_default(),
                        ipv4_address: settings
                            .ip_address
                            .clone()
                            .filter(|ip| !ip.is_empty()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let hostname = Self::effective_hostname(config.hostname, &network_mode);

        Self {
            name: inspect.name.clone().unwrap_or_default().trim_start_matches('/').to_string(),
            image: config.image.clone().unwrap_or_default(),
            hostname,
            user: config.user.filter(|u| !u.is_empty()),
            working_dir: config.working_dir.filter(|w| !w.is_empty()),
            labels,
            env: config.env.unwrap_or_default(),
            cmd: config.cmd,
            entrypoint: config.entrypoint,
            binds: host_config.binds.unwrap_or_default(),
            port_bindings,
            network_mode,
            restart_policy,
            privileged: host_config.privileged.unwrap_or(false),
            cap_add: host_config.cap_add.unwrap_or_default(),
            cap_drop: host_config.cap_drop.unwrap_or_default(),
            devices: host_config
                .devices
                .unwrap_or_default()
                .into_iter()
                .filter_map(|d| d.path_on_host)
                .collect(),
            security_opt: host_config.security_opt.unwrap_or_default(),
            networks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, HostConfig};

    fn inspect_with(labels: HashMap<String, String>, network_mode: Option<String>) -> ContainerInspectResponse {
        ContainerInspectResponse {
            name: Some("/sonarr".into()),
            config: Some(ContainerConfig {
                image: Some("linuxserver/sonarr:4.0.17".into()),
                labels: Some(labels),
                hostname: Some("sonarr-host".into()),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                network_mode,
                ..Default::default()
            }),
            network_settings: None,
            ..Default::default()
        }
    }

    #[test]
    fn strips_stale_digest_label_preserves_others() {
        let mut labels = HashMap::new();
        labels.insert(STALE_DIGEST_LABEL.to_string(), "sonarr@sha256:old".into());
        labels.insert("config-hash".to_string(), "abc123".into());
        let inspect = inspect_with(labels, None);

        let config = EffectiveConfig::extract(&inspect);
        assert!(!config.labels.contains_key(STALE_DIGEST_LABEL));
        assert_eq!(config.labels.get("config-hash"), Some(&"abc123".to_string()));
    }

    #[test]
    fn hostname_dropped_in_container_network_mode() {
        let inspect = inspect_with(HashMap::new(), Some("container:abc123".into()));
        let config = EffectiveConfig::extract(&inspect);
        assert_eq!(config.hostname, None);
    }

    #[test]
    fn hostname_preserved_outside_container_network_mode() {
        let inspect = inspect_with(HashMap::new(), Some("bridge".into()));
        let config = EffectiveConfig::extract(&inspect);
        assert_eq!(config.hostname, Some("sonarr-host".into()));
    }

    #[test]
    fn name_strips_leading_slash() {
        let inspect = inspect_with(HashMap::new(), None);
        let config = EffectiveConfig::extract(&inspect);
        assert_eq!(config.name, "sonarr");
    }
}
