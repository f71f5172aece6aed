//! Certificate capture for TLS probes.
//!
//! reqwest only exposes the leaf certificate of a connection, while the
//! expiry check has to see the whole chain the server sent. The probe's
//! rustls config therefore wraps the standard WebPKI verifier with one
//! that records the presented chain after successful verification.
//!
//! A resumed session skips certificate verification and would leave the
//! log empty, so session resumption is turned off along with connection
//! pooling in the prober.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, Error, SignatureScheme};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The parts of a peer certificate the classifier looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCertificate {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
}

impl PeerCertificate {
    pub fn new(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        not_after: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            not_after,
        }
    }

    pub fn from_der(der: &[u8]) -> Result<Self, String> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| format!("invalid certificate: {e}"))?;
        let ts = cert.validity().not_after.timestamp();
        let not_after = DateTime::<Utc>::from_timestamp(ts, 0)
            .ok_or_else(|| format!("certificate notAfter out of range: {ts}"))?;
        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_after,
        })
    }
}

/// Chain recorded by the most recent handshake of one client.
#[derive(Debug, Clone, Default)]
pub(crate) struct CertificateLog {
    chain: Arc<Mutex<Vec<CertificateDer<'static>>>>,
}

impl CertificateLog {
    pub(crate) fn clear(&self) {
        self.chain.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, end_entity: &CertificateDer<'_>, intermediates: &[CertificateDer<'_>]) {
        let mut chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        chain.clear();
        chain.push(end_entity.clone().into_owned());
        chain.extend(intermediates.iter().map(|c| c.clone().into_owned()));
    }

    /// Parses and drains the recorded chain. Unparseable entries are skipped.
    pub(crate) fn take(&self) -> Vec<PeerCertificate> {
        let chain = std::mem::take(&mut *self.chain.lock().unwrap_or_else(|e| e.into_inner()));
        chain
            .iter()
            .filter_map(|der| match PeerCertificate::from_der(der.as_ref()) {
                Ok(cert) => Some(cert),
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable peer certificate");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    log: CertificateLog,
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;
        self.log.record(end_entity, intermediates);
        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// The Mozilla root set bundled with `webpki-roots`.
pub(crate) fn mozilla_roots() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Client TLS config trusting `roots`, recording every verified chain into `log`.
///
/// Resumption is disabled: every handshake must present and verify a chain.
pub(crate) fn recording_client_config(
    log: CertificateLog,
    roots: rustls::RootCertStore,
) -> Result<rustls::ClientConfig, String> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| format!("tls verifier error: {e}"))?;

    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("tls protocol version error: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(RecordingVerifier { inner, log }))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    config.resumption = rustls::client::Resumption::disabled();

    Ok(config)
}
