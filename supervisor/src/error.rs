//! Supervisor-specific error types
//!
//! Only configuration and spawn failures escape the lifecycle methods;
//! every other failure mode in this subsystem is absorbed into a typed
//! status value or a fallback invocation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Recommender entry point not found: {path}")]
    Configuration { path: String },

    #[error("Failed to spawn recommender process: {message}")]
    Spawn { message: String },
}

impl SupervisorError {
    pub fn configuration(path: impl Into<String>) -> Self {
        Self::Configuration { path: path.into() }
    }

    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn { message: message.into() }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
