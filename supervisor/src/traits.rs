//! Trait definitions with mockall annotations for testing
//!
//! These traits are the seams between the supervisor, its health probing
//! backend, and the web tier. The generated mocks let tests substitute
//! fake probe and lifecycle behavior without touching the network or
//! spawning processes.

use std::time::Duration;

use serde_json::Value;
use shared::HealthStatus;

use crate::error::SupervisorResult;

/// Outcome of a single health probe
///
/// Always a value, never an error: network failures, timeouts, and
/// non-2xx statuses all map to `Down` with a reason string.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Up { payload: Option<Value> },
    Down { reason: String },
}

impl ProbeOutcome {
    pub fn down(reason: impl Into<String>) -> Self {
        Self::Down { reason: reason.into() }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, ProbeOutcome::Up { .. })
    }
}

/// Bounded health probing against a local HTTP endpoint
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthProber: Send + Sync {
    /// Issue one HTTP GET; success is any 2xx status within the timeout
    async fn probe_once(&self, url: &str, timeout: Duration) -> ProbeOutcome;

    /// Probe at a fixed interval until `Up` or until the ceiling elapses
    ///
    /// The ceiling is enforced independently of the polling loop's own
    /// scheduling, so this terminates even when individual attempts
    /// resolve immediately.
    async fn poll_until_ready(&self, url: &str, interval: Duration, ceiling: Duration) -> bool;
}

/// Single source of truth for "is the companion service usable right now"
///
/// The only component permitted to mutate supervised-service state.
/// Lifecycle operations (`start`/`stop`/`restart`) serialize against each
/// other; `is_running` and `health_status` are snapshot reads that never
/// block on an in-flight lifecycle call.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ServiceSupervisor: Send + Sync {
    /// Spawn the companion and wait, bounded, for it to become healthy
    ///
    /// No-op returning `Ok(true)` when already running. Resolves `Ok(true)`
    /// on a successful probe or when the startup ceiling is reached with
    /// the process still alive; fails only when the process never spawned
    /// or died before becoming healthy.
    async fn start(&self) -> SupervisorResult<bool>;

    /// Request graceful termination, bounded by the stop grace period
    ///
    /// No-op returning `Ok(true)` when not running; no signal is sent.
    async fn stop(&self) -> SupervisorResult<bool>;

    /// `stop()` followed by `start()`, serialized with other lifecycle calls
    async fn restart(&self) -> SupervisorResult<bool>;

    /// Cheap in-memory snapshot; answers "did we observe the process
    /// alive", not "is it currently healthy" — never touches the network
    fn is_running(&self) -> bool;

    /// Offline without probing when not running; otherwise one probe,
    /// mapped to online (merging the endpoint's payload) or error
    async fn health_status(&self) -> HealthStatus;

    /// Passthrough of the companion's performance diagnostics
    ///
    /// Returns the upstream JSON, or an `{"error": ...}` object when the
    /// service is unreachable or not running. Never an `Err`.
    async fn performance_stats(&self) -> Value;
}
