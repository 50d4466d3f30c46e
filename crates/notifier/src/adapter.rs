use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::ports::{NotifyError, PushTransport};

/// Sends to an ntfy (or ntfy-compatible) server: `POST {server}/{topic}`
/// with the message as the body and metadata in headers.
pub struct NtfyTransport {
    client: Client,
    server_url: String,
    topic: String,
}

impl NtfyTransport {
    pub fn new(server_url: String, topic: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builder");
        Self { client, server_url, topic }
    }
}

#[async_trait]
impl PushTransport for NtfyTransport {
    async fn send(
        &self,
        title: &str,
        message: &str,
        priority: &str,
        tags: &[&str],
        click_url: Option<&str>,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/{}", self.server_url, self.topic);
        let mut request = self
            .client
            .post(&url)
            .header("Title", title)
            .header("Priority", priority)
            .body(message.to_string());

        if !tags.is_empty() {
            request = request.header("Tags", tags.join(","));
        }
        if let Some(click) = click_url {
            request = request.header("Click", click);
        }

        let response = request.send().await.map_err(|e| NotifyError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Request(format!("ntfy returned {}", response.status())));
        }
        Ok(())
    }
}
