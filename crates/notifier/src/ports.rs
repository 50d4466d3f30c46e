use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier request failed: {0}")]
    Request(String),
}

/// The outbound transport for a single push message. Kept as a trait so
/// the cooldown/threshold logic in `Notifier` can be tested without an
/// HTTP round trip.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        title: &str,
        message: &str,
        priority: &str,
        tags: &[&str],
        click_url: Option<&str>,
    ) -> Result<(), NotifyError>;
}
