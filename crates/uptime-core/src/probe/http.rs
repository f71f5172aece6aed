use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use super::tls::{mozilla_roots, recording_client_config, CertificateLog};
use super::{ProbeError, ProbeResponse, Prober};
use crate::error::error_chain;

/// Bodies are read up to this many bytes; the rest is left unread.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const USER_AGENT: &str = concat!("uptime-monitor/", env!("CARGO_PKG_VERSION"));

/// reqwest-based prober for one service.
///
/// Connection pooling is disabled so that every probe performs its own TLS
/// handshake and the recorded certificate chain belongs to that probe. TLS
/// session resumption is off for the same reason. Probes through one instance
/// are expected to run one at a time.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
    certificates: CertificateLog,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        Self::with_roots(timeout, mozilla_roots())
    }

    pub(crate) fn with_roots(
        timeout: Duration,
        roots: rustls::RootCertStore,
    ) -> Result<Self, ProbeError> {
        let certificates = CertificateLog::default();
        let tls = recording_client_config(certificates.clone(), roots)
            .map_err(|reason| ProbeError::Setup { reason })?;

        let client = Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .gzip(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProbeError::Setup {
                reason: error_chain(&e),
            })?;

        Ok(Self {
            client,
            timeout,
            certificates,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.certificates.clear();

        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                debug!(url, "Probe timed out");
                return Err(ProbeError::Timeout {
                    after: self.timeout,
                });
            }
            Err(e) => {
                debug!(url, error = %e, "Probe transport error");
                return Err(ProbeError::Transport {
                    reason: error_chain(&e),
                });
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_tls = response.url().scheme() == "https";

        let mut body = Vec::new();
        let mut body_error = None;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = MAX_BODY_BYTES - body.len();
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                    if body.len() >= MAX_BODY_BYTES {
                        debug!(url, limit = MAX_BODY_BYTES, "Probe body capped");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(url, error = %e, "Failed to read probe body");
                    body_error = Some(error_chain(&e));
                    break;
                }
            }
        }

        let certificates = if is_tls {
            self.certificates.take()
        } else {
            Vec::new()
        };

        Ok(ProbeResponse {
            status,
            content_type,
            body,
            body_error,
            certificates,
        })
    }
}
