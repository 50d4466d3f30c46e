use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::NotifierConfig;
use crate::ports::PushTransport;

/// One newly-discovered critical CVE, as surfaced to `notify_new_critical_cves`.
#[derive(Debug, Clone)]
pub struct NewCriticalCve {
    pub cve_id: String,
    pub container: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotifierStatus {
    pub enabled: bool,
    pub server_url: Option<String>,
    pub topic: Option<String>,
    pub cooldown_minutes: i64,
    pub pending_cooldowns: usize,
    pub min_critical_threshold: u32,
    pub min_high_threshold: u32,
}

/// Push-notification client with per-key cooldown and per-severity
/// thresholds. Four call shapes map directly onto the external contract
/// in §6: scan-complete, new-critical-CVE digest, scanner-unhealthy, and a
/// free-form test ping.
pub struct Notifier {
    config: NotifierConfig,
    transport: Arc<dyn PushTransport>,
    last_notified: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Notifier {
    pub fn new(config: NotifierConfig, transport: Arc<dyn PushTransport>) -> Self {
        Self { config, transport, last_notified: Mutex::new(HashMap::new()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn should_notify(&self, cache_key: &str) -> bool {
        let guard = self.last_notified.lock().await;
        match guard.get(cache_key) {
            Some(last) => Utc::now() - *last >= chrono::Duration::minutes(self.config.cooldown_minutes),
            None => true,
        }
    }

    async fn mark_notified(&self, cache_key: &str) {
        self.last_notified.lock().await.insert(cache_key.to_string(), Utc::now());
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn notify_scan_complete(
        &self,
        image: &str,
        container: &str,
        server: &str,
        critical: u32,
        high: u32,
        medium: u32,
        low: u32,
        click_url: Option<&str>,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        if critical < self.config.min_critical_threshold && high < self.config.min_high_threshold {
            debug!(image, critical, high, "scan below notification threshold");
            return false;
        }

        let cache_key = format!("scan:{image}");
        if !self.should_notify(&cache_key).await {
            debug!(image, "notification cooldown active");
            return false;
        }

        let (priority, tags, severity) = if critical >= self.config.min_critical_threshold {
            (self.config.priority_critical.as_str(), vec!["rotating_light", "skull", "warning"], "CRITICAL")
        } else {
            (self.config.priority_high.as_str(), vec!["warning", "shield"], "HIGH")
        };

        let title = format!("[{severity}] Vulnerabilities in {container}");
        let message = format!(
            "Container: {container}\nServer: {server}\nImage: {image}\n\nVulnerabilities Found:\n  Critical: {critical}\n  High: {high}\n  Medium: {medium}\n  Low: {low}\n  Total: {}",
            critical + high + medium + low
        );

        let sent = self.transport.send(&title, &message, priority, &tags, click_url).await.is_ok();
        if sent {
            self.mark_notified(&cache_key).await;
            info!(image, "scan-complete notification sent");
        }
        sent
    }

    pub async fn notify_new_critical_cves(&self, cves: &[NewCriticalCve], click_url: Option<&str>) -> bool {
        if !self.config.enabled || cves.is_empty() {
            return false;
        }
        let cache_key = "new_cves";
        if !self.should_notify(cache_key).await {
            return false;
        }

        let count = cves.len();
        let title = format!("[ALERT] {count} New Critical CVEs Discovered");
        let mut cve_list: Vec<String> =
            cves.iter().take(5).map(|c| format!("  - {} in {}", c.cve_id, c.container)).collect();
        if count > 5 {
            cve_list.push(format!("  ... and {} more", count - 5));
        }
        let message = format!(
            "New critical vulnerabilities detected:\n\n{}\n\nReview in the fleet security dashboard.",
            cve_list.join("\n")
        );

        let sent = self
            .transport
            .send(&title, &message, &self.config.priority_critical, &["rotating_light", "skull", "biohazard"], click_url)
            .await
            .is_ok();
        if sent {
            self.mark_notified(cache_key).await;
        }
        sent
    }

    pub async fn notify_scanner_unhealthy(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let cache_key = "trivy_unhealthy";
        if !self.should_notify(cache_key).await {
            return false;
        }
        let sent = self
            .transport
            .send(
                "[WARNING] Scanner Unhealthy",
                "The vulnerability scanner is not responding.\n\nVulnerability scanning is temporarily unavailable.\nCheck the scanner service status.",
                "high",
                &["warning", "construction"],
                None,
            )
            .await
            .is_ok();
        if sent {
            self.mark_notified(cache_key).await;
        }
        sent
    }

    pub async fn notify_test(&self, message: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.transport.send("[TEST] Notification", message, "default", &[], None).await.is_ok()
    }

    pub async fn status(&self) -> NotifierStatus {
        let pending = self.last_notified.lock().await.len();
        NotifierStatus {
            enabled: self.config.enabled,
            server_url: self.config.enabled.then(|| self.config.server_url.clone()),
            topic: self.config.enabled.then(|| self.config.topic.clone()),
            cooldown_minutes: self.config.cooldown_minutes,
            pending_cooldowns: pending,
            min_critical_threshold: self.config.min_critical_threshold,
            min_high_threshold: self.config.min_high_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NotifyError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PushTransport for CountingTransport {
        async fn send(
            &self,
            _title: &str,
            _message: &str,
            _priority: &str,
            _tags: &[&str],
            _click_url: Option<&str>,
        ) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn enabled_config() -> NotifierConfig {
        NotifierConfig {
            enabled: true,
            server_url: "https://ntfy.sh".into(),
            topic: "alerts".into(),
            priority_critical: "urgent".into(),
            priority_high: "high".into(),
            cooldown_minutes: 60,
            min_critical_threshold: 1,
            min_high_threshold: 10,
        }
    }

    #[tokio::test]
    async fn below_threshold_is_not_sent() {
        let transport = Arc::new(CountingTransport { calls: AtomicUsize::new(0) });
        let notifier = Notifier::new(enabled_config(), transport.clone());
        assert!(!notifier.notify_scan_complete("nginx:latest", "web", "alpha", 0, 2, 0, 0, None).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn above_threshold_is_sent_once_per_cooldown() {
        let transport = Arc::new(CountingTransport { calls: AtomicUsize::new(0) });
        let notifier = Notifier::new(enabled_config(), transport.clone());
        assert!(notifier.notify_scan_complete("nginx:latest", "web", "alpha", 3, 0, 0, 0, None).await);
        assert!(!notifier.notify_scan_complete("nginx:latest", "web", "alpha", 3, 0, 0, 0, None).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cooldown_keys_are_independent_per_image() {
        let transport = Arc::new(CountingTransport { calls: AtomicUsize::new(0) });
        let notifier = Notifier::new(enabled_config(), transport.clone());
        assert!(notifier.notify_scan_complete("nginx:latest", "web", "alpha", 3, 0, 0, 0, None).await);
        assert!(notifier.notify_scan_complete("redis:latest", "cache", "alpha", 3, 0, 0, 0, None).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_notifier_never_sends() {
        let mut config = enabled_config();
        config.enabled = false;
        let transport = Arc::new(CountingTransport { calls: AtomicUsize::new(0) });
        let notifier = Notifier::new(config, transport.clone());
        assert!(!notifier.notify_scan_complete("nginx:latest", "web", "alpha", 99, 99, 0, 0, None).await);
        assert!(!notifier.notify_test("hi").await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
