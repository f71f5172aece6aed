mod http;
mod tls;

pub use http::{HttpProber, MAX_BODY_BYTES};
pub use tls::PeerCertificate;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::classify::format_duration;

/// A failed probe. Always classified into a bad status, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Timed out after {}", format_duration(*after))]
    Timeout { after: Duration },
    #[error("{reason}")]
    Transport { reason: String },
    #[error("Failed to build HTTP client: {reason}")]
    Setup { reason: String },
}

/// A completed HTTP exchange, whatever its status code.
#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Response body, capped at [`MAX_BODY_BYTES`].
    pub body: Vec<u8>,
    /// Set when the body could not be read to the end.
    pub body_error: Option<String>,
    /// Chain presented by the server, leaf first. Empty for plain HTTP.
    pub certificates: Vec<PeerCertificate>,
}

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_body_error(mut self, error: impl Into<String>) -> Self {
        self.body_error = Some(error.into());
        self
    }

    pub fn with_certificates(mut self, certificates: Vec<PeerCertificate>) -> Self {
        self.certificates = certificates;
        self
    }
}

/// Performs one GET against a service endpoint.
///
/// Implementations must not retry: one call is one poll cycle's observation.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message() {
        let e = ProbeError::Timeout {
            after: Duration::from_secs(10),
        };
        assert_eq!(e.to_string(), "Timed out after 10s");
    }

    #[test]
    fn transport_message_is_reason() {
        let e = ProbeError::Transport {
            reason: "error sending request: dns error".into(),
        };
        assert_eq!(e.to_string(), "error sending request: dns error");
    }
}
