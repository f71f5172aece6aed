//! Uptime monitoring core: probe HTTP(S) endpoints, classify each response
//! into a [`Status`], and raise or clear alerts when a service's health
//! changes for longer than a single poll.
//!
//! ```text
//! Watcher (one tokio task per service)
//!   ├── Prober::probe()        → ProbeResponse | ProbeError
//!   ├── classify()             → Status
//!   ├── Debouncer::observe()   → Gate { log, alert }
//!   ├── IncidentDriver         → IncidentChannel (PagerDuty)
//!   └── NotifyDriver           → NotificationChannel (ntfy)
//! ```

#![forbid(unsafe_code)]

pub mod alert;
pub mod classify;
pub mod config;
mod error;
pub mod probe;
pub mod status;
pub mod watch;

pub use alert::{
    build_alert_client, AlertError, Delivery, IncidentChannel, IncidentDriver, IncidentEvent,
    IncidentKind, Notification, NotificationChannel, NotifyDriver, NtfyClient, PagerDutyClient,
    DEFAULT_NTFY_BASE, DEFAULT_PAGERDUTY_ENDPOINT,
};
pub use classify::{classify, format_duration};
pub use config::{CertificatePolicy, ServiceConfig};
pub use probe::{HttpProber, PeerCertificate, ProbeError, ProbeResponse, Prober};
pub use status::Status;
pub use watch::{
    run_all, spawn_all, CycleReport, Debouncer, Gate, IncidentState, NotifyState, ServiceState,
    Watcher,
};
