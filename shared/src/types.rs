//! Value types exchanged between the supervisor and the web tier

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification of the companion recommender service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// No process is currently tracked as running
    Offline,
    /// The last probe answered successfully within its timeout
    Online,
    /// A process is tracked as running but the last probe failed
    Error,
}

/// Outcome of a supervisor health check
///
/// `details` carries whatever JSON the companion's `/health` endpoint
/// returned, flattened into the serialized object so callers see the
/// upstream fields at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HealthStatus {
    pub fn offline(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Offline,
            message: Some(message.into()),
            details: Map::new(),
        }
    }

    /// Online status, merging any JSON object the health endpoint returned
    pub fn online(payload: Option<Value>) -> Self {
        let details = match payload {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            status: HealthState::Online,
            message: None,
            details,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Error,
            message: Some(message.into()),
            details: Map::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == HealthState::Online
    }
}

/// Inbound request captured for forwarding to the companion service
///
/// Built once per HTTP request and discarded after the response is sent.
/// The body is fully buffered; only POST and PUT requests carry one.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ForwardedRequest {
    /// Convenience constructor for a bodyless GET
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path_and_query: path_and_query.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// True when the method carries a body and one was buffered
    pub fn has_body(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT") && self.body.is_some()
    }
}

/// Response produced by the companion service or the local fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: Value,
}

impl ProxiedResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}
