use std::sync::Arc;

use tracing::info;

use super::{AlertError, Delivery, IncidentChannel, IncidentEvent, IncidentKind};
use crate::status::Status;

/// Incident channel bookkeeping for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentState {
    /// Last status the channel accepted.
    pub last_sent: Status,
    /// Correlation token of the open incident. Empty when none is open.
    pub incident_key: String,
}

impl IncidentState {
    pub fn has_open_incident(&self) -> bool {
        !self.incident_key.is_empty()
    }
}

/// Drives the trigger/resolve lifecycle of incidents for one service.
pub struct IncidentDriver {
    channel: Arc<dyn IncidentChannel>,
    service_key: Option<String>,
}

impl IncidentDriver {
    /// An empty or absent key leaves the driver inactive.
    pub fn new(channel: Arc<dyn IncidentChannel>, service_key: Option<&str>) -> Self {
        Self {
            channel,
            service_key: service_key.filter(|k| !k.is_empty()).map(str::to_string),
        }
    }

    pub fn is_active(&self) -> bool {
        self.service_key.is_some()
    }

    /// The event `status` calls for, if any.
    ///
    /// Repeats of the last accepted status are dropped, and so are good
    /// statuses while nothing bad was ever reported and no incident is open.
    pub fn plan(&self, status: &Status, state: &IncidentState) -> Option<IncidentEvent> {
        let service_key = self.service_key.as_ref()?;

        if *status == state.last_sent {
            return None;
        }
        if !status.bad && !state.last_sent.bad && !state.has_open_incident() {
            return None;
        }

        Some(IncidentEvent {
            kind: if status.bad {
                IncidentKind::Trigger
            } else {
                IncidentKind::Resolve
            },
            service_key: service_key.clone(),
            description: status.message.clone(),
            incident_key: state
                .has_open_incident()
                .then(|| state.incident_key.clone()),
        })
    }

    /// Submits the planned event. `state` only changes when the channel accepts it.
    pub async fn deliver(
        &self,
        status: &Status,
        state: &mut IncidentState,
    ) -> Result<Delivery, AlertError> {
        let Some(event) = self.plan(status, state) else {
            return Ok(Delivery::Skipped);
        };

        let assigned = self.channel.submit(&event).await?;

        if status.bad && !state.has_open_incident() {
            state.incident_key = assigned.unwrap_or_default();
        } else if !status.bad && state.has_open_incident() {
            state.incident_key.clear();
        }
        state.last_sent = status.clone();

        info!(
            kind = ?event.kind,
            incident_key = %state.incident_key,
            description = %event.description,
            "Incident event submitted"
        );
        Ok(Delivery::Sent)
    }
}
