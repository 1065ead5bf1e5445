//! Fallback proxy for recommendation requests
//!
//! Forwards inbound requests to the supervised recommender service over
//! loopback HTTP and invokes the caller-supplied local fallback whenever
//! the service is unusable or the forward fails. Clients only ever see a
//! normal response from one of the two paths; a 500 is produced only when
//! both fail.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use shared::{ForwardedRequest, ProxiedResponse};
use supervisor::traits::ServiceSupervisor;

use crate::error::{WebServerError, WebServerResult};

/// Largest request body the proxy will buffer for forwarding
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Forwarding endpoint and bounds, fixed at construction
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub upstream_base: Url,
    pub forward_timeout: Duration,
    pub settle_delay: Duration,
}

impl ProxyConfig {
    pub fn new(upstream_base: Url) -> Self {
        Self {
            upstream_base,
            forward_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
        }
    }

    /// Configure the per-forward timeout (fluent API)
    pub fn with_forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = timeout;
        self
    }

    /// Configure the post-lazy-start settle delay (fluent API)
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Why a forward attempt was abandoned; logged, never propagated
enum ForwardFailure {
    Unreachable(String),
    UpstreamStatus(u16),
    MalformedBody(String),
}

impl fmt::Display for ForwardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardFailure::Unreachable(reason) => write!(f, "unreachable: {reason}"),
            ForwardFailure::UpstreamStatus(status) => write!(f, "upstream status {status}"),
            ForwardFailure::MalformedBody(reason) => write!(f, "malformed body: {reason}"),
        }
    }
}

pub struct FallbackProxy<S: ServiceSupervisor> {
    supervisor: Arc<S>,
    client: reqwest::Client,
    config: ProxyConfig,
}

impl<S: ServiceSupervisor> Clone for FallbackProxy<S> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: ServiceSupervisor> FallbackProxy<S> {
    pub fn new(supervisor: Arc<S>, config: ProxyConfig) -> Self {
        Self {
            supervisor,
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Serve one request from the companion service or the local fallback
    ///
    /// The fallback runs whenever the service is unusable or the forward
    /// fails; it must not itself depend on the companion service.
    pub async fn handle<F, Fut>(&self, request: ForwardedRequest, fallback: F) -> ProxiedResponse
    where
        F: FnOnce(ForwardedRequest) -> Fut,
        Fut: Future<Output = WebServerResult<ProxiedResponse>>,
    {
        let request_id = Uuid::new_v4();

        if !self.supervisor.is_running() {
            // Lazy on-demand boot, distinct from the eager path at startup
            tracing::info!(%request_id, "Recommender not running; attempting on-demand start");
            match self.supervisor.start().await {
                Ok(_) => tokio::time::sleep(self.config.settle_delay).await,
                Err(e) => tracing::warn!(%request_id, "On-demand start failed: {e}"),
            }
        }

        if !self.supervisor.is_running() {
            tracing::warn!(
                %request_id,
                "Recommender unavailable; serving local fallback for {} {}",
                request.method,
                request.path_and_query
            );
            return run_fallback(request, fallback, request_id).await;
        }

        match self.forward(&request).await {
            Ok(response) => response,
            Err(failure) => {
                tracing::warn!(
                    %request_id,
                    "Forward of {} {} failed ({failure}); serving local fallback",
                    request.method,
                    request.path_and_query
                );
                run_fallback(request, fallback, request_id).await
            }
        }
    }

    async fn forward(&self, request: &ForwardedRequest) -> Result<ProxiedResponse, ForwardFailure> {
        let url = self
            .config
            .upstream_base
            .join(&request.path_and_query)
            .map_err(|e| ForwardFailure::Unreachable(format!("invalid forward path: {e}")))?;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| ForwardFailure::Unreachable(format!("invalid method: {e}")))?;

        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.config.forward_timeout)
            .headers(forwardable_headers(&request.headers));

        if request.has_body() {
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ForwardFailure::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardFailure::UpstreamStatus(status.as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ForwardFailure::MalformedBody(e.to_string()))?;

        Ok(ProxiedResponse { status: status.as_u16(), body })
    }
}

async fn run_fallback<F, Fut>(request: ForwardedRequest, fallback: F, request_id: Uuid) -> ProxiedResponse
where
    F: FnOnce(ForwardedRequest) -> Fut,
    Fut: Future<Output = WebServerResult<ProxiedResponse>>,
{
    match fallback(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%request_id, "Local fallback failed as well: {e}");
            ProxiedResponse {
                status: 500,
                body: json!({ "error": "recommendation services unavailable" }),
            }
        }
    }
}

/// Copy inbound headers, dropping hop-by-hop fields the client set
fn forwardable_headers(headers: &[(String, String)]) -> HeaderMap {
    const SKIP: [&str; 4] = ["host", "content-length", "connection", "transfer-encoding"];

    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if SKIP.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            map.append(name, value);
        }
    }
    map
}

/// Buffer an inbound axum request into a forwardable context
pub async fn buffer_request(req: axum::extract::Request) -> WebServerResult<ForwardedRequest> {
    let (parts, body) = req.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| WebServerError::invalid_request(format!("failed to read body: {e}")))?;
    let body = if bytes.is_empty() { None } else { Some(bytes.to_vec()) };

    Ok(ForwardedRequest {
        method: parts.method.as_str().to_string(),
        path_and_query,
        headers,
        body,
    })
}
