//! Shared types and logging for the recommendation supervisor workspace
//!
//! This crate holds the value types exchanged between the supervisor and
//! the web tier, plus the tracing bootstrap used by every binary.

pub mod logging;
pub mod types;

pub use types::{ForwardedRequest, HealthState, HealthStatus, ProxiedResponse};
