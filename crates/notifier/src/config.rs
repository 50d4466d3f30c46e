/// Configuration for the ntfy-style push-notification client, loaded from
/// environment variables with the same defaults as the reference service.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub server_url: String,
    pub topic: String,
    pub priority_critical: String,
    pub priority_high: String,
    pub cooldown_minutes: i64,
    pub min_critical_threshold: u32,
    pub min_high_threshold: u32,
}

impl NotifierConfig {
    pub fn from_env(get: impl Fn(&str) -> Option<String>) -> Self {
        let server_url = get("NTFY_URL").unwrap_or_default().trim_end_matches('/').to_string();
        let enabled = !server_url.is_empty()
            && get("NTFY_ENABLED").map(|v| v.to_ascii_lowercase() != "false").unwrap_or(true);

        Self {
            enabled,
            server_url,
            topic: get("NTFY_TOPIC").unwrap_or_else(|| "security-alerts".to_string()),
            priority_critical: get("NTFY_PRIORITY_CRITICAL").unwrap_or_else(|| "urgent".to_string()),
            priority_high: get("NTFY_PRIORITY_HIGH").unwrap_or_else(|| "high".to_string()),
            cooldown_minutes: get("NTFY_COOLDOWN_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            min_critical_threshold: get("NTFY_MIN_CRITICAL").and_then(|v| v.parse().ok()).unwrap_or(1),
            min_high_threshold: get("NTFY_MIN_HIGH").and_then(|v| v.parse().ok()).unwrap_or(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn disabled_without_a_server_url() {
        let cfg = NotifierConfig::from_env(|_| None);
        assert!(!cfg.enabled);
    }

    #[test]
    fn enabled_when_url_configured() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("NTFY_URL", "https://ntfy.sh");
        let cfg = NotifierConfig::from_env(|key| env.get(key).map(|s| s.to_string()));
        assert!(cfg.enabled);
        assert_eq!(cfg.topic, "security-alerts");
    }
}
