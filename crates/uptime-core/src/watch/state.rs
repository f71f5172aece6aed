use crate::alert::{IncidentState, NotifyState};

use super::debounce::Debouncer;

/// Everything one service's loop remembers between cycles.
///
/// Owned by exactly one [`Watcher`](super::Watcher); nothing else reads or
/// writes it, and it lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct ServiceState {
    pub debounce: Debouncer,
    pub incident: IncidentState,
    pub notify: NotifyState,
}
