use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified health of a service for one poll cycle.
///
/// Two statuses are the same only when both the message and the flag match;
/// the debounce gate and both alert drivers rely on that full equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub message: String,
    pub bad: bool,
}

impl Status {
    pub fn good(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bad: false,
        }
    }

    pub fn bad(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bad: true,
        }
    }

    pub fn symbol(&self) -> &'static str {
        if self.bad {
            "✗"
        } else {
            "✓"
        }
    }

    /// Operator log line: `<symbol> <url> <message>`.
    pub fn log_line<'a>(&'a self, url: &'a str) -> LogLine<'a> {
        LogLine { url, status: self }
    }
}

pub struct LogLine<'a> {
    url: &'a str,
    status: &'a Status,
}

impl fmt::Display for LogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.status.symbol(),
            self.url,
            self.status.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_needs_message_and_flag() {
        assert_eq!(Status::good("HTTP 200: ok"), Status::good("HTTP 200: ok"));
        assert_ne!(Status::good("HTTP 200: ok"), Status::bad("HTTP 200: ok"));
        assert_ne!(Status::good("HTTP 200: ok"), Status::good("HTTP 200: fine"));
    }

    #[test]
    fn default_is_empty_and_good() {
        let s = Status::default();
        assert!(s.message.is_empty());
        assert!(!s.bad);
    }

    #[test]
    fn log_line_format() {
        let ok = Status::good("HTTP 200: ok");
        assert_eq!(
            ok.log_line("https://example.com/health").to_string(),
            "✓ https://example.com/health HTTP 200: ok"
        );

        let down = Status::bad("HTTP 500: text/html");
        assert_eq!(
            down.log_line("https://example.com/").to_string(),
            "✗ https://example.com/ HTTP 500: text/html"
        );
    }
}
