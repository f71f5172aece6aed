use crate::status::Status;

/// What one observed status is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// The status differs from the last logged one.
    pub log: bool,
    /// The status repeated the previous cycle's and may reach the alert drivers.
    pub alert: bool,
}

/// Log and alert debounce slots for one service.
///
/// Logging fires on every distinct status. Alerting needs the same status on
/// two consecutive polls, so a single-poll blip never reaches the drivers.
/// A status that alternates every cycle never alerts at all.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    logged: Status,
    previous: Status,
}

impl Debouncer {
    pub fn observe(&mut self, status: &Status) -> Gate {
        let log = *status != self.logged;
        if log {
            self.logged = status.clone();
        }

        let alert = *status == self.previous;
        if !alert {
            self.previous = status.clone();
        }

        Gate { log, alert }
    }

    pub fn logged(&self) -> &Status {
        &self.logged
    }

    /// The previous cycle's status, compared against the next one.
    pub fn alert_status(&self) -> &Status {
        &self.previous
    }
}
