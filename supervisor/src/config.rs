//! Fixed-at-boot configuration for the supervised recommender service

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Configuration read once at supervisor construction
///
/// The port and entry point are fixed for the lifetime of the supervisor;
/// there is no dynamic reconfiguration.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Loopback port the companion service binds
    pub port: u16,

    /// Script the runtime executes
    pub entry_point: PathBuf,

    /// Interpreter used to launch the entry point
    pub runtime: String,

    /// Working directory for the child process
    pub working_dir: PathBuf,

    /// Append-only sink for captured child output
    pub log_path: PathBuf,

    /// Extra environment variables passed to the child
    pub extra_env: Vec<(String, String)>,

    /// Interval between startup health probes
    pub startup_probe_interval: Duration,

    /// Ceiling on the whole startup poll
    pub startup_ceiling: Duration,

    /// Timeout for a single health probe
    pub probe_timeout: Duration,

    /// Bounded wait for the exit event during stop
    pub stop_grace: Duration,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            entry_point: PathBuf::from("./recommender/recommender_service.py"),
            runtime: "python3".to_string(),
            working_dir: PathBuf::from("."),
            log_path: PathBuf::from("./logs/recommender.log"),
            extra_env: vec![("PYTHONUNBUFFERED".to_string(), "1".to_string())],
            startup_probe_interval: Duration::from_secs(1),
            startup_ceiling: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(3),
            stop_grace: Duration::from_secs(2),
        }
    }
}

impl RecommenderConfig {
    pub fn new(port: u16, entry_point: impl Into<PathBuf>) -> Self {
        Self {
            port,
            entry_point: entry_point.into(),
            ..Self::default()
        }
    }

    /// Configure the interpreter (fluent API)
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Configure the child working directory (fluent API)
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Configure the output log sink (fluent API)
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    /// Configure startup polling cadence and ceiling (fluent API)
    pub fn with_startup_probe(mut self, interval: Duration, ceiling: Duration) -> Self {
        self.startup_probe_interval = interval;
        self.startup_ceiling = ceiling;
        self
    }

    /// Configure the per-probe timeout (fluent API)
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Configure the stop grace period (fluent API)
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Base URL of the companion service on loopback
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}", self.port)).expect("loopback URL is valid")
    }

    /// Readiness endpoint polled during startup and health checks
    pub fn health_url(&self) -> Url {
        self.base_url().join("/health").expect("health path is valid")
    }

    /// Fixed diagnostic path for the performance-stats passthrough
    pub fn stats_url(&self) -> Url {
        self.base_url()
            .join("/api/recommendations/performance-stats")
            .expect("stats path is valid")
    }
}
