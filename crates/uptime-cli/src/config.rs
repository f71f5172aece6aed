//! Configuration file schema and parsing.
//!
//! Two formats are accepted, chosen by file extension. A `.json` file holds
//! a bare array of services:
//!
//! ```json
//! [
//!   { "url": "https://example.com/health", "pagerduty": "service-key", "ntfy": "my-topic" },
//!   { "url": "https://api.example.com/ping", "timeout": 5, "interval": 30 }
//! ]
//! ```
//!
//! Anything else is read as TOML:
//!
//! ```toml
//! [settings]
//! log_format = "json"
//!
//! [defaults]
//! timeout_secs = 10
//! interval_secs = 10
//! alert_backoff_secs = 300
//! cert_warning_days = 7
//! cert_skip_issuers = ["DST Root CA X3"]
//!
//! [channels]
//! pagerduty_endpoint = "https://events.pagerduty.com/generic/2010-04-15/create_event.json"
//! ntfy_base = "https://ntfy.sh"
//!
//! [[service]]
//! url = "https://example.com/health"
//! pagerduty = "service-key"
//! ntfy = "my-topic"
//! interval = 30
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use uptime_core::{CertificatePolicy, ServiceConfig, DEFAULT_NTFY_BASE, DEFAULT_PAGERDUTY_ENDPOINT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to parse config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,

    #[serde(default)]
    pub service: Vec<ServiceDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_alert_backoff_secs")]
    pub alert_backoff_secs: u64,

    #[serde(default = "default_cert_warning_days")]
    pub cert_warning_days: u64,

    #[serde(default)]
    pub cert_skip_issuers: Option<Vec<String>>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interval_secs: default_interval_secs(),
            alert_backoff_secs: default_alert_backoff_secs(),
            cert_warning_days: default_cert_warning_days(),
            cert_skip_issuers: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    10
}

fn default_alert_backoff_secs() -> u64 {
    300
}

fn default_cert_warning_days() -> u64 {
    7
}

impl DefaultsConfig {
    fn certificate_policy(&self) -> CertificatePolicy {
        let mut policy = CertificatePolicy::default()
            .with_warning_window(Duration::from_secs(self.cert_warning_days * 86_400));
        if let Some(ref issuers) = self.cert_skip_issuers {
            policy = policy.with_skip_issuers(issuers.clone());
        }
        policy
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_pagerduty_endpoint")]
    pub pagerduty_endpoint: String,

    #[serde(default = "default_ntfy_base")]
    pub ntfy_base: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            pagerduty_endpoint: default_pagerduty_endpoint(),
            ntfy_base: default_ntfy_base(),
        }
    }
}

fn default_pagerduty_endpoint() -> String {
    DEFAULT_PAGERDUTY_ENDPOINT.into()
}

fn default_ntfy_base() -> String {
    DEFAULT_NTFY_BASE.into()
}

/// One service entry. Field names match the legacy `services.json` layout.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDef {
    pub url: String,

    /// Incident channel service key.
    #[serde(default)]
    pub pagerduty: Option<String>,

    /// Notification channel topic.
    #[serde(default)]
    pub ntfy: Option<String>,

    /// Probe timeout in seconds; 0 or absent uses the default.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Poll interval in seconds; 0 or absent uses the default.
    #[serde(default)]
    pub interval: Option<u64>,
}

impl ServiceDef {
    pub fn to_service_config(&self, defaults: &DefaultsConfig) -> ServiceConfig {
        let mut c = ServiceConfig::new(&self.url)
            .with_timeout(Duration::from_secs(defaults.timeout_secs))
            .with_interval(Duration::from_secs(defaults.interval_secs))
            .with_alert_backoff(Duration::from_secs(defaults.alert_backoff_secs))
            .with_certificate_policy(defaults.certificate_policy());
        if let Some(ref key) = self.pagerduty {
            c = c.with_incident_key(key);
        }
        if let Some(ref topic) = self.ntfy {
            c = c.with_notify_topic(topic);
        }
        if let Some(t) = self.timeout {
            c = c.with_timeout(Duration::from_secs(t));
        }
        if let Some(i) = self.interval {
            c = c.with_interval(Duration::from_secs(i));
        }
        c
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Legacy format: a bare array of services, everything else defaulted.
    fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let service: Vec<ServiceDef> = serde_json::from_str(content)?;
        Ok(Self {
            settings: Settings::default(),
            defaults: DefaultsConfig::default(),
            channels: ChannelsConfig::default(),
            service,
        })
    }

    pub fn to_service_configs(&self) -> Vec<ServiceConfig> {
        self.service
            .iter()
            .map(|s| s.to_service_config(&self.defaults))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::Invalid("No services configured".into()));
        }

        let mut seen = HashSet::new();
        for (i, s) in self.service.iter().enumerate() {
            if s.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Service at index {} has no URL",
                    i
                )));
            }
            let parsed = url::Url::parse(&s.url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "Invalid service URL at index {}: {} ({})",
                    i, s.url, e
                ))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "Service URL must use http or https: {}",
                    s.url
                )));
            }
            if !seen.insert(s.url.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate service URL: {}",
                    s.url
                )));
            }
        }

        for (name, value) in [
            ("pagerduty_endpoint", &self.channels.pagerduty_endpoint),
            ("ntfy_base", &self.channels.ntfy_base),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::Invalid(format!("Invalid {}: {} ({})", name, value, e))
            })?;
        }

        match self.settings.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                )));
            }
        }

        Ok(())
    }
}
