//! Turns one probe outcome into a [`Status`].
//!
//! The message always has the shape `HTTP <code>: <text>` for completed
//! exchanges, or the probe error text for transport failures. `<text>` is the
//! plain-text body when the server sent UTF-8 `text/plain`, and the
//! content type otherwise, so HTML and binary payloads never end up in alerts.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::CertificatePolicy;
use crate::probe::{PeerCertificate, ProbeError, ProbeResponse};
use crate::status::Status;

/// Display text longer than this is cut.
pub const MAX_TEXT_BYTES: usize = 1024;

pub const NO_BODY: &str = "(no response body)";

pub fn classify(
    outcome: &Result<ProbeResponse, ProbeError>,
    policy: &CertificatePolicy,
    now: DateTime<Utc>,
) -> Status {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Status::bad(e.to_string()),
    };

    let mut bad = false;
    let mut text = match &response.body_error {
        Some(error) => {
            bad = true;
            error.clone()
        }
        None => {
            let mut text = display_text(response);
            if let Some(warning) = certificate_warning(&response.certificates, policy, now) {
                bad = true;
                text = warning;
            }
            text
        }
    };

    if !(200..300).contains(&response.status) {
        bad = true;
    }

    if text.is_empty() {
        text = NO_BODY.to_string();
    }

    Status {
        message: format!("HTTP {}: {}", response.status, trim_text(text)),
        bad,
    }
}

fn display_text(response: &ProbeResponse) -> String {
    let content_type = response
        .content_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if is_utf8_plain_text(&content_type) {
        String::from_utf8_lossy(&response.body).into_owned()
    } else {
        content_type
    }
}

fn is_utf8_plain_text(content_type: &str) -> bool {
    if !content_type.starts_with("text/plain") {
        return false;
    }
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .filter(|(key, _)| matches!(key.trim(), "charset" | "encoding"))
        .all(|(_, value)| matches!(value.trim().trim_matches('"'), "utf-8" | "utf8" | "us-ascii"))
}

/// Warning for the soonest-expiring certificate inside the policy window.
fn certificate_warning(
    certificates: &[PeerCertificate],
    policy: &CertificatePolicy,
    now: DateTime<Utc>,
) -> Option<String> {
    let window = TimeDelta::from_std(policy.warning_window).unwrap_or(TimeDelta::MAX);

    certificates
        .iter()
        .filter(|cert| !policy.is_skipped(&cert.issuer, &cert.subject))
        .map(|cert| (cert, cert.not_after - now))
        .filter(|(_, left)| *left < window)
        .min_by_key(|(_, left)| *left)
        .map(|(cert, left)| expiry_message(&cert.subject, TimeDelta::hours(left.num_hours())))
}

fn expiry_message(subject: &str, left: TimeDelta) -> String {
    if left > TimeDelta::days(1) {
        format!(
            "Certificate {:?} expires in {:.0} days",
            subject,
            left.num_hours() as f64 / 24.0
        )
    } else if left >= TimeDelta::zero() {
        format!(
            "Certificate {:?} expires in {}",
            subject,
            format_duration(left.to_std().unwrap_or_default())
        )
    } else {
        format!(
            "Certificate {:?} expired {} ago",
            subject,
            format_duration((-left).to_std().unwrap_or_default())
        )
    }
}

fn trim_text(text: String) -> String {
    if text.len() <= MAX_TEXT_BYTES {
        return text;
    }
    let mut cut = MAX_TEXT_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{} ... (trimmed {} bytes)", &text[..cut], text.len() - cut)
}

/// Compact duration rendering: `250ms`, `10s`, `1m30s`, `5h0m0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = decimal(
        u128::from(secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos()),
        1_000_000_000,
    );

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn run(response: ProbeResponse) -> Status {
        classify(&Ok(response), &CertificatePolicy::default(), now())
    }

    fn plain(status: u16, body: &str) -> ProbeResponse {
        ProbeResponse::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_body(body)
    }

    fn cert(subject: &str, issuer: &str, left: TimeDelta) -> PeerCertificate {
        PeerCertificate::new(subject, issuer, now() + left)
    }

    #[test]
    fn plain_text_ok() {
        assert_eq!(run(plain(200, "ok")), Status::good("HTTP 200: ok"));
    }

    #[test]
    fn plain_text_without_charset_uses_body() {
        let r = ProbeResponse::new(200)
            .with_content_type("Text/Plain")
            .with_body("all good");
        assert_eq!(run(r), Status::good("HTTP 200: all good"));
    }

    #[test]
    fn non_utf8_charset_uses_content_type() {
        let r = ProbeResponse::new(200)
            .with_content_type("text/plain; charset=ISO-8859-1")
            .with_body("ok");
        assert_eq!(
            run(r),
            Status::good("HTTP 200: text/plain; charset=iso-8859-1")
        );
    }

    #[test]
    fn html_uses_content_type() {
        let r = ProbeResponse::new(200)
            .with_content_type("text/html; charset=utf-8")
            .with_body("<html><body>hello</body></html>");
        assert_eq!(run(r), Status::good("HTTP 200: text/html; charset=utf-8"));
    }

    #[test]
    fn non_2xx_is_bad() {
        assert_eq!(
            run(plain(500, "boom")),
            Status::bad("HTTP 500: boom")
        );
        assert!(run(plain(302, "moved")).bad);
        assert!(run(plain(199, "early")).bad);
        assert!(!run(plain(204, "")).bad);
        assert!(run(plain(300, "choices")).bad);
    }

    #[test]
    fn empty_body_placeholder() {
        assert_eq!(
            run(plain(200, "")),
            Status::good("HTTP 200: (no response body)")
        );
        assert_eq!(
            run(ProbeResponse::new(503)),
            Status::bad("HTTP 503: (no response body)")
        );
    }

    #[test]
    fn long_text_is_trimmed() {
        let body = "x".repeat(MAX_TEXT_BYTES + 100);
        let status = run(plain(200, &body));
        let expected = format!("HTTP 200: {} ... (trimmed 100 bytes)", "x".repeat(MAX_TEXT_BYTES));
        assert_eq!(status.message, expected);
    }

    #[test]
    fn text_at_limit_is_kept() {
        let body = "y".repeat(MAX_TEXT_BYTES);
        let status = run(plain(200, &body));
        assert_eq!(status.message, format!("HTTP 200: {body}"));
    }

    #[test]
    fn trim_respects_char_boundaries() {
        // 1023 ASCII bytes followed by a two-byte character straddling the limit.
        let body = format!("{}é{}", "a".repeat(MAX_TEXT_BYTES - 1), "b".repeat(10));
        let status = run(plain(200, &body));
        let expected = format!("HTTP 200: {} ... (trimmed 12 bytes)", "a".repeat(MAX_TEXT_BYTES - 1));
        assert_eq!(status.message, expected);
    }

    #[test]
    fn body_error_is_bad() {
        let r = plain(200, "partial").with_body_error("connection reset");
        assert_eq!(run(r), Status::bad("HTTP 200: connection reset"));
    }

    #[test]
    fn probe_errors_are_bad() {
        let timeout = classify(
            &Err(ProbeError::Timeout {
                after: Duration::from_secs(10),
            }),
            &CertificatePolicy::default(),
            now(),
        );
        assert_eq!(timeout, Status::bad("Timed out after 10s"));

        let refused = classify(
            &Err(ProbeError::Transport {
                reason: "error sending request: connection refused".into(),
            }),
            &CertificatePolicy::default(),
            now(),
        );
        assert_eq!(refused, Status::bad("error sending request: connection refused"));
    }

    #[test]
    fn expiring_certificate_overrides_good_response() {
        let r = plain(200, "ok").with_certificates(vec![cert(
            "CN=example.com",
            "CN=R3",
            TimeDelta::days(3),
        )]);
        let status = run(r);
        assert!(status.bad);
        assert_eq!(
            status.message,
            "HTTP 200: Certificate \"CN=example.com\" expires in 3 days"
        );
    }

    #[test]
    fn healthy_certificates_leave_status_alone() {
        let r = plain(200, "ok").with_certificates(vec![
            cert("CN=example.com", "CN=R3", TimeDelta::days(60)),
            cert("CN=R3", "CN=ISRG Root X1", TimeDelta::days(400)),
        ]);
        assert_eq!(run(r), Status::good("HTTP 200: ok"));
    }

    #[test]
    fn skipped_issuer_is_ignored() {
        let r = plain(200, "ok").with_certificates(vec![
            cert("CN=example.com", "CN=R3", TimeDelta::days(60)),
            cert("CN=ISRG Root X1", "O=Digital Signature Trust Co., CN=DST Root CA X3", TimeDelta::days(-900)),
        ]);
        assert_eq!(run(r), Status::good("HTTP 200: ok"));
    }

    #[test]
    fn soonest_expiry_wins() {
        let r = plain(200, "ok").with_certificates(vec![
            cert("CN=example.com", "CN=R3", TimeDelta::days(5)),
            cert("CN=R3", "CN=ISRG Root X1", TimeDelta::days(2)),
        ]);
        assert_eq!(
            run(r).message,
            "HTTP 200: Certificate \"CN=R3\" expires in 2 days"
        );
    }

    #[test]
    fn under_a_day_renders_hours() {
        let r = plain(200, "ok").with_certificates(vec![cert(
            "CN=example.com",
            "CN=R3",
            TimeDelta::hours(5) + TimeDelta::minutes(40),
        )]);
        assert_eq!(
            run(r).message,
            "HTTP 200: Certificate \"CN=example.com\" expires in 5h0m0s"
        );
    }

    #[test]
    fn expired_certificate() {
        let r = plain(200, "ok").with_certificates(vec![cert(
            "CN=example.com",
            "CN=R3",
            -TimeDelta::hours(30),
        )]);
        let status = run(r);
        assert!(status.bad);
        assert_eq!(
            status.message,
            "HTTP 200: Certificate \"CN=example.com\" expired 30h0m0s ago"
        );
    }

    #[test]
    fn custom_warning_window() {
        let policy = CertificatePolicy::default().with_warning_window(Duration::from_secs(30 * 86_400));
        let r = plain(200, "ok").with_certificates(vec![cert("CN=example.com", "CN=R3", TimeDelta::days(20))]);
        let status = classify(&Ok(r), &policy, now());
        assert!(status.bad);
        assert!(status.message.contains("expires in 20 days"));
    }

    #[test]
    fn certificate_warning_on_error_status_keeps_code() {
        let r = plain(502, "bad gateway").with_certificates(vec![cert(
            "CN=example.com",
            "CN=R3",
            TimeDelta::days(4),
        )]);
        assert_eq!(
            run(r),
            Status::bad("HTTP 502: Certificate \"CN=example.com\" expires in 4 days")
        );
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_millis(200)), "200ms");
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(5 * 3600)), "5h0m0s");
    }
}
