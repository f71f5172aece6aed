use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{AlertError, Notification, NotificationChannel};
use crate::error::error_chain;

pub const DEFAULT_NTFY_BASE: &str = "https://ntfy.sh";

const CHANNEL: &str = "ntfy";

/// ntfy.sh publisher: the body is the message, the `Title` header the subject.
#[derive(Debug, Clone)]
pub struct NtfyClient {
    client: Client,
    base: String,
}

impl NtfyClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base: DEFAULT_NTFY_BASE.to_string(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), topic)
    }
}

#[async_trait]
impl NotificationChannel for NtfyClient {
    async fn submit(&self, notification: &Notification) -> Result<(), AlertError> {
        let url = self.topic_url(&notification.topic);

        let resp = self
            .client
            .post(&url)
            .header("Title", notification.title.as_str())
            .body(notification.body.clone())
            .send()
            .await
            .map_err(|e| AlertError::Transport {
                channel: CHANNEL,
                reason: error_chain(&e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AlertError::http(CHANNEL, status.as_u16(), &text));
        }

        debug!(url = %url, "ntfy accepted notification");
        Ok(())
    }
}
