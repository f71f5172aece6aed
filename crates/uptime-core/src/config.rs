use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_ALERT_BACKOFF: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CERT_WARNING_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for one monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Endpoint polled with a GET every cycle.
    pub url: String,
    /// Incident channel service key. Empty or absent disables the channel.
    pub incident_key: Option<String>,
    /// Notification channel topic. Empty or absent disables the channel.
    pub notify_topic: Option<String>,
    /// HTTP request timeout for one probe (default: 10s).
    pub timeout: Duration,
    /// Sleep between poll cycles (default: 10s).
    pub interval: Duration,
    /// Sleep after a failed alert submission (default: 5 minutes).
    pub alert_backoff: Duration,
    pub certificates: CertificatePolicy,
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            incident_key: None,
            notify_topic: None,
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            alert_backoff: DEFAULT_ALERT_BACKOFF,
            certificates: CertificatePolicy::default(),
        }
    }

    pub fn incident_key(&self) -> Option<&str> {
        self.incident_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn notify_topic(&self) -> Option<&str> {
        self.notify_topic.as_deref().filter(|t| !t.is_empty())
    }

    pub fn with_incident_key(mut self, key: impl Into<String>) -> Self {
        self.incident_key = Some(key.into());
        self
    }

    pub fn with_notify_topic(mut self, topic: impl Into<String>) -> Self {
        self.notify_topic = Some(topic.into());
        self
    }

    /// A zero timeout means "unset" and keeps the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// A zero interval means "unset" and keeps the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    pub fn with_alert_backoff(mut self, backoff: Duration) -> Self {
        self.alert_backoff = backoff;
        self
    }

    pub fn with_certificate_policy(mut self, policy: CertificatePolicy) -> Self {
        self.certificates = policy;
        self
    }
}

/// Rules for the TLS certificate expiry override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificatePolicy {
    /// Certificates expiring sooner than this mark the service bad.
    pub warning_window: Duration,
    /// Issuer/subject fragments of legacy trust anchors to ignore.
    pub skip_issuers: Vec<String>,
}

impl Default for CertificatePolicy {
    fn default() -> Self {
        Self {
            warning_window: DEFAULT_CERT_WARNING_WINDOW,
            skip_issuers: vec!["DST Root CA X3".to_string()],
        }
    }
}

impl CertificatePolicy {
    pub fn with_warning_window(mut self, window: Duration) -> Self {
        self.warning_window = window;
        self
    }

    pub fn with_skip_issuers(mut self, issuers: Vec<String>) -> Self {
        self.skip_issuers = issuers;
        self
    }

    pub fn is_skipped(&self, issuer: &str, subject: &str) -> bool {
        self.skip_issuers
            .iter()
            .filter(|s| !s.is_empty())
            .any(|s| issuer.contains(s.as_str()) || subject.contains(s.as_str()))
    }
}
