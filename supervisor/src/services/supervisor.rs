//! Recommender service supervisor
//!
//! Owns the single companion process: entry-point validation, spawning,
//! readiness polling, health classification, and graceful shutdown.
//! Lifecycle operations serialize on the handle mutex; state reads are
//! lock-free snapshots, so concurrent HTTP requests are never blocked by
//! an in-flight start or stop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;

use shared::HealthStatus;

use crate::config::RecommenderConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::services::process_handle::{ExitEvent, ProcessHandle, SpawnSpec};
use crate::state::{ServiceState, StateCell};
use crate::traits::{HealthProber, ProbeOutcome, ServiceSupervisor};

type HandleSlot = Arc<Mutex<Option<ProcessHandle>>>;

pub struct RecommenderSupervisor<H: HealthProber> {
    config: RecommenderConfig,
    prober: H,
    state: StateCell,

    /// Exclusive owner of the child process. Doubles as the lifecycle
    /// lock: start/stop/restart hold it for their whole duration, so
    /// overlapping calls serialize instead of racing the process handle.
    handle: HandleSlot,

    client: reqwest::Client,
}

impl<H: HealthProber> RecommenderSupervisor<H> {
    pub fn new(config: RecommenderConfig, prober: H) -> Self {
        Self {
            config,
            prober,
            state: StateCell::new(),
            handle: Arc::new(Mutex::new(None)),
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Current lifecycle state snapshot
    pub fn state(&self) -> ServiceState {
        self.state.get()
    }

    fn spawn_spec(&self) -> SpawnSpec {
        SpawnSpec {
            program: self.config.runtime.clone(),
            args: vec![self.config.entry_point.to_string_lossy().into_owned()],
            working_dir: self.config.working_dir.clone(),
            env: self.config.extra_env.clone(),
            log_path: self.config.log_path.clone(),
        }
    }

    /// Watch the spawned process and clear supervised state when it exits
    ///
    /// The transition is pid-guarded, so a stale child's exit cannot
    /// clobber the state of a replacement spawned after it.
    fn monitor_exit(&self, handle: &ProcessHandle) {
        let mut exit = handle.exit_events();
        let pid = handle.pid();
        let state = self.state.clone();
        let slot = Arc::clone(&self.handle);

        tokio::spawn(async move {
            let event = match wait_for_exit(&mut exit).await {
                Some(event) => event,
                None => return,
            };

            if state.record_exit(pid, event.code) {
                tracing::warn!("⚠️ Recommender process {} exited with code {:?}", pid, event.code);
            }

            let mut guard = slot.lock().await;
            if guard.as_ref().map(ProcessHandle::pid) == Some(pid) {
                *guard = None;
            }
        });
    }

    async fn start_locked(&self, slot: &mut Option<ProcessHandle>) -> SupervisorResult<bool> {
        if self.state.is_running() {
            tracing::debug!("Recommender already running; start is a no-op");
            return Ok(true);
        }

        if !self.config.entry_point.exists() {
            return Err(SupervisorError::configuration(
                self.config.entry_point.display().to_string(),
            ));
        }

        tracing::info!("🚀 Starting recommender service on port {}", self.config.port);
        self.state.set(ServiceState::Spawning);

        let handle = match ProcessHandle::spawn(self.spawn_spec()).await {
            Ok(handle) => handle,
            Err(e) => {
                self.state.set(ServiceState::Idle);
                return Err(e);
            }
        };

        let pid = handle.pid();
        self.state.set(ServiceState::Running { pid });
        self.monitor_exit(&handle);
        *slot = Some(handle);

        let ready = self
            .prober
            .poll_until_ready(
                self.config.health_url().as_str(),
                self.config.startup_probe_interval,
                self.config.startup_ceiling,
            )
            .await;

        if ready {
            tracing::info!("✅ Recommender service is healthy on port {}", self.config.port);
            return Ok(true);
        }

        if self.state.is_running() {
            // Slow starter that is still alive: let it keep warming up
            // rather than holding the web tier hostage.
            tracing::warn!(
                "⚠️ Recommender not confirmed healthy within {:?}; continuing anyway",
                self.config.startup_ceiling
            );
            return Ok(true);
        }

        *slot = None;
        self.state.set(ServiceState::Idle);
        Err(SupervisorError::spawn(
            "recommender process exited before becoming healthy",
        ))
    }

    async fn stop_locked(&self, slot: &mut Option<ProcessHandle>) -> SupervisorResult<bool> {
        if !self.state.is_running() {
            tracing::debug!("Recommender not running; stop is a no-op");
            return Ok(true);
        }

        let handle = match slot.as_ref() {
            Some(handle) => handle,
            None => {
                // Spawn was observed but the handle is already gone
                self.state.set(ServiceState::Idle);
                return Ok(true);
            }
        };

        let pid = handle.pid();
        tracing::info!("🛑 Stopping recommender service (pid {})", pid);
        self.state.set(ServiceState::Stopping { pid });
        handle.terminate();

        let mut exit = handle.exit_events();
        let confirmed = timeout(self.config.stop_grace, wait_for_exit(&mut exit))
            .await
            .is_ok();

        if confirmed {
            *slot = None;
            self.state.set(ServiceState::Idle);
            tracing::info!("✅ Recommender service stopped");
        } else {
            // Bounded-wait design: report success now and let the exit
            // monitor clear state when the exit event finally lands.
            tracing::warn!(
                "⚠️ Recommender did not exit within {:?}; exit monitor will reap it",
                self.config.stop_grace
            );
        }

        Ok(true)
    }
}

#[async_trait]
impl<H: HealthProber> ServiceSupervisor for RecommenderSupervisor<H> {
    async fn start(&self) -> SupervisorResult<bool> {
        let mut slot = self.handle.lock().await;
        self.start_locked(&mut slot).await
    }

    async fn stop(&self) -> SupervisorResult<bool> {
        let mut slot = self.handle.lock().await;
        self.stop_locked(&mut slot).await
    }

    async fn restart(&self) -> SupervisorResult<bool> {
        let mut slot = self.handle.lock().await;
        tracing::info!("🔄 Restarting recommender service");
        self.stop_locked(&mut slot).await?;
        self.start_locked(&mut slot).await
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    async fn health_status(&self) -> HealthStatus {
        if !self.state.is_running() {
            return HealthStatus::offline("recommender process is not running");
        }

        let outcome = self
            .prober
            .probe_once(self.config.health_url().as_str(), self.config.probe_timeout)
            .await;

        match outcome {
            ProbeOutcome::Up { payload } => HealthStatus::online(payload),
            ProbeOutcome::Down { reason } => HealthStatus::error(reason),
        }
    }

    async fn performance_stats(&self) -> Value {
        if !self.state.is_running() {
            return json!({ "error": "recommender process is not running" });
        }

        let url = self.config.stats_url();
        let response = match self
            .client
            .get(url.as_str())
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return json!({ "error": format!("failed to reach recommender: {e}") }),
        };

        if !response.status().is_success() {
            return json!({ "error": format!("recommender returned {}", response.status()) });
        }

        response
            .json::<Value>()
            .await
            .unwrap_or_else(|e| json!({ "error": format!("invalid stats payload: {e}") }))
    }
}

/// Resolve once the exit event lands, or `None` if the channel closed
/// before one was observed
async fn wait_for_exit(exit: &mut watch::Receiver<Option<ExitEvent>>) -> Option<ExitEvent> {
    loop {
        if let Some(event) = *exit.borrow() {
            return Some(event);
        }
        if exit.changed().await.is_err() {
            return *exit.borrow();
        }
    }
}
