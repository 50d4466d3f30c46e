use std::collections::HashMap;

use kernel::domain::container::{OrchestrationHints, UpdatePolicy};

const LABEL_STACK_COMPOSE: &str = "com.docker.compose.project";
const LABEL_STACK_SWARM: &str = "com.docker.stack.namespace";
const LABEL_STACK_OVERRIDE: &str = "dockpeek.stack";

const LABEL_ROLE: &str = "dockpeek.role";
const LABEL_ANCHOR: &str = "dockpeek.anchor";
const LABEL_HIDE: &str = "dockpeek.hide";
const LABEL_UPDATE_ACTION: &str = "dockpeek.update.action";
const LABEL_UPDATE_ORDER: &str = "dockpeek.update.order";
const LABEL_SECURITY_SKIP: &str = "dockpeek.security.skip";

const LABEL_LINK: &str = "dockpeek.link";
const LABEL_PORTS: &str = "dockpeek.ports";
const LABEL_PORT: &str = "dockpeek.port";
const LABEL_TAGS: &str = "dockpeek.tags";
const LABEL_TAG: &str = "dockpeek.tag";
const LABEL_HTTPS: &str = "dockpeek.https";
const LABEL_PORT_RANGE_GROUPING: &str = "dockpeek.port-range-grouping";

fn is_truthy(labels: &HashMap<String, String>, key: &str) -> bool {
    labels.get(key).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn parse_comma_separated(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// The compose/stack namespace a container belongs to, preferring an
/// explicit `dockpeek.stack` override over the compose/swarm-derived name.
pub fn stack_name(labels: &HashMap<String, String>) -> Option<String> {
    labels
        .get(LABEL_STACK_OVERRIDE)
        .or_else(|| labels.get(LABEL_STACK_COMPOSE))
        .or_else(|| labels.get(LABEL_STACK_SWARM))
        .filter(|v| !v.is_empty())
        .cloned()
}

/// Parses the `dockpeek.*` orchestration namespace into the shared
/// `OrchestrationHints` type, grounded in `get_data.py`'s
/// `extract_orchestration_labels`/`extract_labels_data`.
pub fn orchestration_hints(labels: &HashMap<String, String>, tags_enabled: bool) -> OrchestrationHints {
    let custom_tags = labels.get(LABEL_TAGS).or_else(|| labels.get(LABEL_TAG));
    let tags = if tags_enabled { parse_comma_separated(custom_tags) } else { Vec::new() };

    OrchestrationHints {
        stack_name: stack_name(labels),
        role: labels.get(LABEL_ROLE).cloned(),
        anchor: labels.get(LABEL_ANCHOR).cloned(),
        hidden: is_truthy(labels, LABEL_HIDE),
        security_skip: is_truthy(labels, LABEL_SECURITY_SKIP),
        update_policy: labels.get(LABEL_UPDATE_ACTION).map(|v| UpdatePolicy::from_label_value(v)).unwrap_or_default(),
        order: labels.get(LABEL_UPDATE_ORDER).and_then(|v| v.parse().ok()),
        tags,
    }
}

pub fn custom_link(labels: &HashMap<String, String>) -> Option<String> {
    labels.get(LABEL_LINK).filter(|v| !v.is_empty()).cloned()
}

pub fn custom_ports(labels: &HashMap<String, String>) -> Vec<String> {
    parse_comma_separated(labels.get(LABEL_PORTS).or_else(|| labels.get(LABEL_PORT)))
}

pub fn https_ports(labels: &HashMap<String, String>) -> Vec<String> {
    parse_comma_separated(labels.get(LABEL_HTTPS))
}

pub fn port_range_grouping(labels: &HashMap<String, String>) -> Option<String> {
    labels.get(LABEL_PORT_RANGE_GROUPING).map(|v| v.to_lowercase()).filter(|v| !v.is_empty())
}

/// True when `container_port`/`host_port` should be rendered as an https
/// link: explicit port 443, a port ending in 443, or explicitly listed in
/// the `dockpeek.https` label.
pub fn should_use_https(host_port: &str, container_port: &str, https_ports_list: &[String]) -> bool {
    container_port == "443/tcp"
        || host_port == "443"
        || host_port.ends_with("443")
        || https_ports_list.iter().any(|p| p == host_port)
}

pub fn port_link(host: &str, host_port: &str, container_port: &str, https_ports_list: &[String]) -> String {
    let protocol = if should_use_https(host_port, container_port, https_ports_list) { "https" } else { "http" };
    if host_port == "443" {
        format!("{protocol}://{host}")
    } else {
        format!("{protocol}://{host}:{host_port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn stack_override_takes_priority_over_compose_project() {
        let labels = labels_with(&[("dockpeek.stack", "custom"), ("com.docker.compose.project", "compose-project")]);
        assert_eq!(stack_name(&labels), Some("custom".into()));
    }

    #[test]
    fn falls_back_to_compose_project_then_swarm_namespace() {
        let labels = labels_with(&[("com.docker.compose.project", "compose-project")]);
        assert_eq!(stack_name(&labels), Some("compose-project".into()));

        let labels = labels_with(&[("com.docker.stack.namespace", "swarm-stack")]);
        assert_eq!(stack_name(&labels), Some("swarm-stack".into()));
    }

    #[test]
    fn anchor_role_and_hidden_flag_parsed() {
        let labels = labels_with(&[("dockpeek.role", "anchor"), ("dockpeek.hide", "true"), ("dockpeek.anchor", "vpn")]);
        let hints = orchestration_hints(&labels, true);
        assert_eq!(hints.role, Some("anchor".into()));
        assert!(hints.hidden);
        assert_eq!(hints.anchor, Some("vpn".into()));
    }

    #[test]
    fn update_action_maps_to_policy() {
        let labels = labels_with(&[("dockpeek.update.action", "pin")]);
        let hints = orchestration_hints(&labels, true);
        assert_eq!(hints.update_policy, UpdatePolicy::Pin);
    }

    #[test]
    fn tags_disabled_flag_suppresses_custom_tags() {
        let labels = labels_with(&[("dockpeek.tags", "media,arr")]);
        let hints = orchestration_hints(&labels, false);
        assert!(hints.tags.is_empty());
        let hints = orchestration_hints(&labels, true);
        assert_eq!(hints.tags, vec!["media".to_string(), "arr".to_string()]);
    }

    #[test]
    fn port_443_link_omits_explicit_port() {
        let link = port_link("fleet.example.com", "443", "443/tcp", &[]);
        assert_eq!(link, "https://fleet.example.com");
    }

    #[test]
    fn https_ports_list_forces_https_for_non_443_port() {
        assert!(should_use_https("8443", "8443/tcp", &["8443".to_string()]));
        let link = port_link("fleet.example.com", "8443", "8443/tcp", &["8443".to_string()]);
        assert_eq!(link, "https://fleet.example.com:8443");
    }

    #[test]
    fn plain_port_defaults_to_http() {
        let link = port_link("fleet.example.com", "8080", "8080/tcp", &[]);
        assert_eq!(link, "http://fleet.example.com:8080");
    }
}
