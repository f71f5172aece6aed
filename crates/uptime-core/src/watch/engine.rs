use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::alert::{Delivery, IncidentChannel, IncidentDriver, NotificationChannel, NotifyDriver};
use crate::classify::{classify, format_duration};
use crate::config::ServiceConfig;
use crate::probe::{HttpProber, ProbeError, Prober};
use crate::status::Status;

use super::state::ServiceState;

/// What happened during one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub status: Status,
    /// A status line was written to the log.
    pub logged: bool,
    /// The status was confirmed and shown to the alert drivers.
    pub alerted: bool,
    pub incident_sent: bool,
    pub notify_sent: bool,
    /// Alert submissions that failed this cycle.
    pub failures: u32,
}

/// Polling loop for one service. Owns all of that service's state.
pub struct Watcher {
    config: ServiceConfig,
    prober: Arc<dyn Prober>,
    incident: IncidentDriver,
    notify: NotifyDriver,
    state: ServiceState,
}

impl Watcher {
    pub fn new(
        config: ServiceConfig,
        prober: Arc<dyn Prober>,
        incident_channel: Arc<dyn IncidentChannel>,
        notify_channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        let incident = IncidentDriver::new(incident_channel, config.incident_key());
        let notify = NotifyDriver::new(notify_channel, config.notify_topic(), config.url.clone());
        Self {
            config,
            prober,
            incident,
            notify,
            state: ServiceState::default(),
        }
    }

    /// Builds a watcher probing over HTTP with the service's own timeout.
    pub fn with_http_prober(
        config: ServiceConfig,
        incident_channel: Arc<dyn IncidentChannel>,
        notify_channel: Arc<dyn NotificationChannel>,
    ) -> Result<Self, ProbeError> {
        let prober = Arc::new(HttpProber::new(config.timeout)?);
        Ok(Self::new(config, prober, incident_channel, notify_channel))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    /// Probe, classify, debounce, and alert once.
    pub async fn poll_once(&mut self) -> CycleReport {
        let outcome = self.prober.probe(&self.config.url).await;
        let status = classify(&outcome, &self.config.certificates, Utc::now());
        let gate = self.state.debounce.observe(&status);

        if gate.log {
            if status.bad {
                warn!("{}", status.log_line(&self.config.url));
            } else {
                info!("{}", status.log_line(&self.config.url));
            }
        }

        let mut report = CycleReport {
            status,
            logged: gate.log,
            alerted: gate.alert,
            incident_sent: false,
            notify_sent: false,
            failures: 0,
        };

        if !gate.alert {
            return report;
        }

        match self
            .incident
            .deliver(&report.status, &mut self.state.incident)
            .await
        {
            Ok(delivery) => report.incident_sent = delivery == Delivery::Sent,
            Err(e) => {
                error!(url = %self.config.url, error = %e, "Incident alert failed");
                report.failures += 1;
                self.backoff().await;
            }
        }

        match self
            .notify
            .deliver(&report.status, &mut self.state.notify)
            .await
        {
            Ok(delivery) => report.notify_sent = delivery == Delivery::Sent,
            Err(e) => {
                error!(url = %self.config.url, error = %e, "Notification failed");
                report.failures += 1;
                self.backoff().await;
            }
        }

        report
    }

    async fn backoff(&self) {
        warn!(
            url = %self.config.url,
            backoff = %format_duration(self.config.alert_backoff),
            "Backing off after alert failure"
        );
        tokio::time::sleep(self.config.alert_backoff).await;
    }

    /// Polls forever, sleeping the configured interval between cycles.
    pub async fn run(mut self) {
        info!(
            url = %self.config.url,
            interval = %format_duration(self.config.interval),
            timeout = %format_duration(self.config.timeout),
            incident = self.incident.is_active(),
            notify = self.notify.is_active(),
            "Watching service"
        );

        loop {
            self.poll_once().await;
            tokio::time::sleep(self.config.interval).await;
        }
    }
}

/// Spawns one independent task per watcher.
pub fn spawn_all(watchers: Vec<Watcher>) -> Vec<JoinHandle<()>> {
    watchers
        .into_iter()
        .map(|watcher| tokio::spawn(watcher.run()))
        .collect()
}

/// Runs every watcher until all tasks end, which only happens if they panic.
pub async fn run_all(watchers: Vec<Watcher>) {
    let count = watchers.len();
    info!(count, "Starting service watchers");

    for result in join_all(spawn_all(watchers)).await {
        if let Err(e) = result {
            error!(error = %e, "Service watcher task ended");
        }
    }
}
