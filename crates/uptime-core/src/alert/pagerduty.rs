use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AlertError, IncidentChannel, IncidentEvent, IncidentKind};
use crate::error::error_chain;

pub const DEFAULT_PAGERDUTY_ENDPOINT: &str =
    "https://events.pagerduty.com/generic/2010-04-15/create_event.json";

const CHANNEL: &str = "PagerDuty";

/// PagerDuty Events API (v1) client.
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    service_key: &'a str,
    event_type: IncidentKind,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    incident_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    incident_key: Option<String>,
}

impl PagerDutyClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_PAGERDUTY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl IncidentChannel for PagerDutyClient {
    async fn submit(&self, event: &IncidentEvent) -> Result<Option<String>, AlertError> {
        let body = EventBody {
            service_key: &event.service_key,
            event_type: event.kind,
            description: &event.description,
            incident_key: event.incident_key.as_deref(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
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

        let parsed: EventResponse = resp.json().await.map_err(|e| AlertError::Transport {
            channel: CHANNEL,
            reason: format!("invalid response body: {e}"),
        })?;

        if let Some(ref s) = parsed.status {
            if s != "success" {
                return Err(AlertError::Rejected {
                    channel: CHANNEL,
                    message: parsed.message.unwrap_or_else(|| s.clone()),
                });
            }
        }

        debug!(kind = ?event.kind, incident_key = ?parsed.incident_key, "PagerDuty accepted event");
        Ok(parsed.incident_key.filter(|k| !k.is_empty()))
    }
}
