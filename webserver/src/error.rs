//! WebServer-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("HTTP server startup failed: {message}")]
    Startup { message: String },

    #[error("Invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("Local recommendation failed: {message}")]
    Recommendation { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WebServerError {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup { message: message.into() }
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::InvalidRequest { details: details.into() }
    }

    pub fn recommendation(message: impl Into<String>) -> Self {
        Self::Recommendation { message: message.into() }
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
