//! Supervisor for the companion recommender service
//!
//! This library launches, health-checks, restarts, and gracefully tears
//! down the separate long-running recommender process. The web tier reads
//! supervisor state through the [`traits::ServiceSupervisor`] trait and
//! falls back to a local algorithm whenever the service is unusable, so
//! the request-serving path never hangs or crashes because the companion
//! is slow, crashed, or never started.

pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod traits;

// Re-export commonly used types
pub use config::RecommenderConfig;
pub use error::{SupervisorError, SupervisorResult};
pub use services::{ProcessHandle, RealHealthProber, RecommenderSupervisor, SpawnSpec};
pub use state::ServiceState;
pub use traits::{HealthProber, ProbeOutcome, ServiceSupervisor};
