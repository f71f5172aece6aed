pub mod debounce;
pub mod engine;
pub mod state;

pub use crate::alert::{IncidentState, NotifyState};
pub use debounce::{Debouncer, Gate};
pub use engine::{run_all, spawn_all, CycleReport, Watcher};
pub use state::ServiceState;
