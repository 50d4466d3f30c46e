//! Loads and validates every environment variable named in the external
//! interfaces contract, aggregating every problem found into a single
//! diagnostic rather than failing on the first one.

use std::path::PathBuf;

use host_registry::HostEndpointConfig;
use update_checker::floating_tag::FloatingTagMode;

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> Result<u64, String> {
    match env(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| format!("{key} must be a non-negative integer, got {v:?}")),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth_enabled: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub session_lifetime_days: u64,

    pub hosts: Vec<HostEndpointConfig>,
    pub engine_connect_timeout_secs: u64,
    pub host_discovery_cache_ttl_secs: u64,

    pub scanner_url: Option<String>,
    pub scanner_timeout_secs: u64,
    pub scan_cache_path: PathBuf,
    pub scan_cache_ttl_secs: u64,

    pub history_enabled: bool,
    pub history_db_path: PathBuf,

    pub version_cache_path: PathBuf,
    pub version_cache_ttl_secs: u64,

    pub update_cache_path: PathBuf,
    pub update_cache_ttl_secs: u64,
    pub update_pull_timeout_secs: u64,
    pub floating_tag_mode: FloatingTagMode,

    pub notifier_enabled: bool,

    pub dns_cache_ttl_secs: u64,

    pub scheduler_enabled: bool,
    pub scheduler_lock_path: PathBuf,
    pub scheduler_refresh_interval_secs: u64,
    pub scheduler_version_interval_secs: u64,

    pub auto_update_enabled: bool,
    pub auto_update_interval_secs: u64,
    pub auto_update_dry_run: bool,
    pub auto_update_batch_size: usize,
    pub auto_update_journal_path: PathBuf,

    pub update_lock_dir: PathBuf,
    pub credential_store_path: PathBuf,

    pub trusted_proxy_headers: bool,
    pub trusted_hop_count: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("configuration invalid:\n{}", .0.join("\n"))]
pub struct ConfigError(Vec<String>);

impl kernel::error::Classified for ConfigError {
    fn kind(&self) -> kernel::ErrorKind {
        kernel::ErrorKind::Config
    }
}

impl AppConfig {
    /// Reads every variable named in the external interfaces contract,
    /// applying the stated defaults and collecting every validation
    /// failure before returning, so a misconfigured deployment gets one
    /// complete diagnostic instead of a fix-one-crash-again loop.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let data_dir = env("DATA_DIR").unwrap_or_else(|| "./data".to_string());
        let data_dir = PathBuf::from(data_dir);

        let mut u64_field = |key: &str, default: u64| match env_u64(key, default) {
            Ok(v) => v,
            Err(e) => {
                problems.push(e);
                default
            }
        };

        let engine_connect_timeout_secs = u64_field("ENGINE_CONNECT_TIMEOUT_SECS", 2);
        let host_discovery_cache_ttl_secs = u64_field("HOST_DISCOVERY_CACHE_TTL_SECS", 30);
        let scanner_timeout_secs = u64_field("SCANNER_TIMEOUT_SECS", 120);
        let scan_cache_ttl_secs = u64_field("SCANNER_CACHE_TTL_SECS", 3600);
        let version_cache_ttl_secs = u64_field("VERSION_CACHE_TTL_SECS", 3600);
        let update_cache_ttl_secs = u64_field("UPDATE_CACHE_TTL_SECS", 3600);
        let update_pull_timeout_secs = u64_field("UPDATE_PULL_TIMEOUT_SECS", 300);
        let dns_cache_ttl_secs = u64_field("DNS_CACHE_TTL_SECS", 300);
        let scheduler_refresh_interval_secs = u64_field("SCHEDULER_REFRESH_INTERVAL_SECS", 300);
        let scheduler_version_interval_secs = u64_field("SCHEDULER_VERSION_INTERVAL_SECS", 3600);
        let auto_update_interval_secs = u64_field("AUTO_UPDATE_INTERVAL_SECS", 86400);
        let session_lifetime_days = u64_field("SESSION_LIFETIME_DAYS", 14);

        let auto_update_batch_size = match env("AUTO_UPDATE_BATCH_SIZE") {
            None => 3,
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    problems.push(format!("AUTO_UPDATE_BATCH_SIZE must be a positive integer, got {v:?}"));
                    3
                }
            },
        };

        let trusted_hop_count = match env("TRUSTED_HOP_COUNT") {
            None => 1,
            Some(v) => v.parse().unwrap_or_else(|_| {
                problems.push(format!("TRUSTED_HOP_COUNT must be a non-negative integer, got {v:?}"));
                1
            }),
        };
        let trusted_proxy_headers = env_bool("TRUSTED_PROXY_HEADERS", false);
        if !trusted_proxy_headers && env("TRUSTED_HOP_COUNT").is_some() {
            // Harmless, but worth a diagnostic line: the toggle is off so
            // the hop count is dead configuration.
            problems.push("TRUSTED_HOP_COUNT is set but TRUSTED_PROXY_HEADERS is not enabled".to_string());
        }

        let floating_tag_raw = env("FLOATING_TAG_MODE").unwrap_or_else(|| "disabled".to_string());
        if !matches!(floating_tag_raw.as_str(), "disabled" | "latest" | "major" | "minor") {
            problems.push(format!(
                "FLOATING_TAG_MODE must be one of disabled|latest|major|minor, got {floating_tag_raw:?}"
            ));
        }
        let floating_tag_mode = FloatingTagMode::from_str_lossy(&floating_tag_raw);

        let auth_enabled = env_bool("AUTH_ENABLED", false);
        let admin_username = env("ADMIN_USERNAME");
        let admin_password = env("ADMIN_PASSWORD");
        if auth_enabled && (admin_username.is_none() || admin_password.is_none()) {
            problems.push("AUTH_ENABLED is true but ADMIN_USERNAME/ADMIN_PASSWORD are not both set".to_string());
        }

        let hosts = host_registry::config::parse_from_env(env);
        if hosts.is_empty() {
            problems.push("no engine endpoints configured: set DOCKER_HOST or DOCKER_HOST_<n>_URL".to_string());
        }

        let scanner_url = env("SCANNER_URL");

        if !problems.is_empty() {
            return Err(ConfigError(problems));
        }

        Ok(Self {
            auth_enabled,
            admin_username,
            admin_password,
            session_lifetime_days,

            hosts,
            engine_connect_timeout_secs,
            host_discovery_cache_ttl_secs,

            scanner_url,
            scanner_timeout_secs,
            scan_cache_path: data_dir.join("scan_cache.json"),
            scan_cache_ttl_secs,

            history_enabled: env_bool("HISTORY_ENABLED", true),
            history_db_path: PathBuf::from(env("HISTORY_DB_PATH").unwrap_or_else(|| data_dir.join("history.db").display().to_string())),

            version_cache_path: data_dir.join("version_cache.json"),
            version_cache_ttl_secs,

            update_cache_path: data_dir.join("update_cache.json"),
            update_cache_ttl_secs,
            update_pull_timeout_secs,
            floating_tag_mode,

            notifier_enabled: env("NTFY_URL").is_some(),

            dns_cache_ttl_secs,

            scheduler_enabled: env_bool("SCHEDULER_ENABLED", true),
            scheduler_lock_path: PathBuf::from(env("SCHEDULER_LOCK_PATH").unwrap_or_else(|| data_dir.join("scheduler.lock").display().to_string())),
            scheduler_refresh_interval_secs,
            scheduler_version_interval_secs,

            auto_update_enabled: env_bool("AUTO_UPDATE_ENABLED", false),
            auto_update_interval_secs,
            auto_update_dry_run: env_bool("AUTO_UPDATE_DRY_RUN", true),
            auto_update_batch_size,
            auto_update_journal_path: PathBuf::from(
                env("AUTO_UPDATE_JOURNAL_PATH").unwrap_or_else(|| data_dir.join("auto_update_journal.json").display().to_string()),
            ),

            update_lock_dir: PathBuf::from(env("UPDATE_LOCK_DIR").unwrap_or_else(|| data_dir.join("update_locks").display().to_string())),
            credential_store_path: PathBuf::from(env("CREDENTIAL_STORE_PATH").unwrap_or_else(|| data_dir.join("credentials.db").display().to_string())),

            trusted_proxy_headers,
            trusted_hop_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_all() {
        for (key, _) in std::env::vars() {
            if key.starts_with("DOCKER_HOST") || key == "AUTH_ENABLED" || key == "FLOATING_TAG_MODE" || key == "AUTO_UPDATE_BATCH_SIZE" {
                unsafe {
                    std::env::remove_var(&key);
                }
            }
        }
    }

    #[test]
    fn missing_hosts_is_one_aggregated_problem() {
        clear_all();
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("no engine endpoints configured"));
    }

    #[test]
    fn invalid_floating_tag_mode_is_reported_and_aggregated_with_missing_hosts() {
        clear_all();
        unsafe {
            std::env::set_var("FLOATING_TAG_MODE", "bogus");
        }
        let err = AppConfig::from_env().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("FLOATING_TAG_MODE"));
        assert!(message.contains("no engine endpoints configured"));
        unsafe {
            std::env::remove_var("FLOATING_TAG_MODE");
        }
    }

    #[test]
    fn valid_minimal_config_loads() {
        clear_all();
        unsafe {
            std::env::set_var("DOCKER_HOST", "unix:///var/run/docker.sock");
        }
        let config = AppConfig::from_env().expect("valid config");
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.auto_update_batch_size, 3);
        unsafe {
            std::env::remove_var("DOCKER_HOST");
        }
    }
}
