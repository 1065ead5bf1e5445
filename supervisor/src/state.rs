//! Lifecycle state machine for the supervised service
//!
//! Transitions are driven by explicit events (spawn requested, spawn
//! confirmed, termination requested, exit observed) so tests can assert
//! on states directly instead of timing-dependent callbacks.

use std::sync::Arc;

use tokio::sync::watch;

/// States the supervised recommender process moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No process has been requested
    Idle,
    /// A spawn was requested but the OS has not confirmed it yet
    Spawning,
    /// The OS confirmed the spawn and no exit has been observed
    Running { pid: u32 },
    /// Termination was requested; the exit event has not fired yet
    Stopping { pid: u32 },
    /// The process exited, for any reason and with any code
    Exited { code: Option<i32> },
}

impl ServiceState {
    /// True once a spawn was observed and no exit has been seen yet
    ///
    /// This answers "did we observe the process alive", not "is it
    /// currently healthy"; a process being stopped still counts until
    /// its exit event lands.
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running { .. } | ServiceState::Stopping { .. })
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            ServiceState::Running { pid } | ServiceState::Stopping { pid } => Some(*pid),
            _ => None,
        }
    }
}

/// Shared, watchable state cell
///
/// Reads are lock-free snapshots, so `is_running` and `health_status`
/// never block on an in-flight lifecycle operation. The exit monitor
/// transitions the cell independently of lifecycle calls.
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<ServiceState>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ServiceState {
        *self.tx.borrow()
    }

    pub fn set(&self, next: ServiceState) {
        self.tx.send_replace(next);
    }

    pub fn is_running(&self) -> bool {
        self.get().is_running()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.tx.subscribe()
    }

    /// Record an exit observed for `pid`
    ///
    /// Pid-guarded so a stale child's exit cannot clobber the state of a
    /// replacement process spawned after it. Returns whether the
    /// transition was applied.
    pub fn record_exit(&self, pid: u32, code: Option<i32>) -> bool {
        let mut applied = false;
        self.tx.send_modify(|state| {
            if state.pid() == Some(pid) {
                *state = ServiceState::Exited { code };
                applied = true;
            }
        });
        applied
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_not_running() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), ServiceState::Idle);
        assert!(!cell.is_running());
    }

    #[test]
    fn running_and_stopping_both_count_as_running() {
        let cell = StateCell::new();

        cell.set(ServiceState::Running { pid: 42 });
        assert!(cell.is_running());
        assert_eq!(cell.get().pid(), Some(42));

        cell.set(ServiceState::Stopping { pid: 42 });
        assert!(cell.is_running());
    }

    #[test]
    fn record_exit_clears_the_matching_process() {
        let cell = StateCell::new();
        cell.set(ServiceState::Running { pid: 42 });

        assert!(cell.record_exit(42, Some(0)));
        assert_eq!(cell.get(), ServiceState::Exited { code: Some(0) });
        assert!(!cell.is_running());
    }

    #[test]
    fn record_exit_ignores_a_stale_pid() {
        let cell = StateCell::new();
        cell.set(ServiceState::Running { pid: 43 });

        assert!(!cell.record_exit(42, Some(1)));
        assert_eq!(cell.get(), ServiceState::Running { pid: 43 });
    }

    #[test]
    fn subscribers_observe_transitions() {
        let cell = StateCell::new();
        let rx = cell.subscribe();

        cell.set(ServiceState::Spawning);
        cell.set(ServiceState::Running { pid: 7 });

        assert_eq!(*rx.borrow(), ServiceState::Running { pid: 7 });
    }
}
