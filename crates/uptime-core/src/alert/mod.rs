//! Alert channels and the per-service drivers that decide when to use them.
//!
//! Each back-end is reached through a small trait so the drivers can be
//! exercised without a network. The drivers own the decision logic; the
//! channel clients only deliver.

mod incident;
mod notify;
mod ntfy;
mod pagerduty;

pub use incident::{IncidentDriver, IncidentState};
pub use notify::{NotifyDriver, NotifyState};
pub use ntfy::{NtfyClient, DEFAULT_NTFY_BASE};
pub use pagerduty::{PagerDutyClient, DEFAULT_PAGERDUTY_ENDPOINT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const USER_AGENT: &str = concat!("uptime-monitor/", env!("CARGO_PKG_VERSION"));

/// Error bodies quoted in [`AlertError::Http`] are cut to this many characters.
const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("{channel} returned HTTP {status}: {body}")]
    Http {
        channel: &'static str,
        status: u16,
        body: String,
    },
    #[error("{channel} request failed: {reason}")]
    Transport {
        channel: &'static str,
        reason: String,
    },
    #[error("{channel} rejected the event: {message}")]
    Rejected {
        channel: &'static str,
        message: String,
    },
}

impl AlertError {
    pub(crate) fn http(channel: &'static str, status: u16, body: &str) -> Self {
        Self::Http {
            channel,
            status,
            body: body.trim().chars().take(ERROR_BODY_CHARS).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Trigger,
    Resolve,
}

/// One event for the incident-tracking channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentEvent {
    pub kind: IncidentKind,
    pub service_key: String,
    pub description: String,
    /// Correlation token of the open incident, if any.
    pub incident_key: Option<String>,
}

/// Incident-lifecycle back-end. Returns the incident key assigned to the event.
#[async_trait]
pub trait IncidentChannel: Send + Sync {
    async fn submit(&self, event: &IncidentEvent) -> Result<Option<String>, AlertError>;
}

/// One push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic: String,
    pub title: String,
    pub body: String,
}

/// Fire-and-forget notification back-end.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn submit(&self, notification: &Notification) -> Result<(), AlertError>;
}

/// What a driver did with a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Skipped,
    Sent,
}

/// HTTP client shared by the alert back-ends.
pub fn build_alert_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_body_is_trimmed() {
        let long = "e".repeat(500);
        match AlertError::http("ntfy", 500, &format!("  {long}\n")) {
            AlertError::Http { body, status, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_messages_name_the_channel() {
        let e = AlertError::Transport {
            channel: "PagerDuty",
            reason: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "PagerDuty request failed: connection refused");

        let e = AlertError::http("ntfy", 429, "slow down");
        assert_eq!(e.to_string(), "ntfy returned HTTP 429: slow down");
    }

    #[test]
    fn alert_client_builds() {
        assert!(build_alert_client().is_ok());
    }
}
