//! Main webserver assembly
//!
//! Builds the axum router over the shared application state and runs it
//! with graceful shutdown. Recommendation routes go through the fallback
//! proxy; service routes expose the supervisor's lifecycle and
//! diagnostics.

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use shared::{HealthStatus, ProxiedResponse};
use supervisor::error::SupervisorResult;
use supervisor::traits::ServiceSupervisor;

use crate::error::{WebServerError, WebServerResult};
use crate::proxy::buffer_request;
use crate::state::AppState;

pub struct WebServer<S: ServiceSupervisor> {
    bind_address: SocketAddr,
    state: AppState<S>,
}

impl<S: ServiceSupervisor + 'static> WebServer<S> {
    pub fn new(bind_address: SocketAddr, state: AppState<S>) -> Self {
        Self { bind_address, state }
    }

    /// Build the axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            // Recommendation surface, proxied with local fallback
            .route("/api/recommendations/general", get(general_recommendations))
            .route("/api/recommendations/personalized", get(personalized_recommendations))
            .route("/api/recommendations/similar/:track_id", get(similar_recommendations))
            // Companion service diagnostics
            .route("/api/recommendations/health", get(recommender_health))
            .route("/api/recommendations/performance-stats", get(recommender_stats))
            // Ops surface for the supervised service
            .route("/api/service/start", post(start_service))
            .route("/api/service/stop", post(stop_service))
            .route("/api/service/restart", post(restart_service))
            // Own liveness
            .route("/health", get(health_check))
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()).into_inner())
            .with_state(self.state.clone())
    }

    /// Serve until the shutdown future resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> WebServerResult<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| WebServerError::startup(format!("failed to bind {}: {e}", self.bind_address)))?;

        tracing::info!("🌐 Webserver listening on {}", self.bind_address);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WebServerError::startup(format!("server error: {e}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub limit: Option<usize>,
    pub user_id: Option<String>,
}

fn into_response(proxied: ProxiedResponse) -> Response {
    let status = StatusCode::from_u16(proxied.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(proxied.body)).into_response()
}

fn bad_request(error: WebServerError) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error.to_string() }))).into_response()
}

async fn general_recommendations<S>(
    State(app): State<AppState<S>>,
    Query(params): Query<RecommendationParams>,
    req: Request,
) -> Response
where
    S: ServiceSupervisor + 'static,
{
    let forwarded = match buffer_request(req).await {
        Ok(forwarded) => forwarded,
        Err(e) => return bad_request(e),
    };

    let recommender = app.recommender.clone();
    let proxied = app
        .proxy
        .handle(forwarded, move |_req| async move { recommender.general(params.limit) })
        .await;

    into_response(proxied)
}

async fn personalized_recommendations<S>(
    State(app): State<AppState<S>>,
    Query(params): Query<RecommendationParams>,
    req: Request,
) -> Response
where
    S: ServiceSupervisor + 'static,
{
    let forwarded = match buffer_request(req).await {
        Ok(forwarded) => forwarded,
        Err(e) => return bad_request(e),
    };

    let recommender = app.recommender.clone();
    let proxied = app
        .proxy
        .handle(forwarded, move |_req| async move {
            recommender.personalized(params.user_id.as_deref(), params.limit)
        })
        .await;

    into_response(proxied)
}

async fn similar_recommendations<S>(
    State(app): State<AppState<S>>,
    Path(track_id): Path<String>,
    Query(params): Query<RecommendationParams>,
    req: Request,
) -> Response
where
    S: ServiceSupervisor + 'static,
{
    let forwarded = match buffer_request(req).await {
        Ok(forwarded) => forwarded,
        Err(e) => return bad_request(e),
    };

    let recommender = app.recommender.clone();
    let proxied = app
        .proxy
        .handle(forwarded, move |_req| async move {
            recommender.similar(&track_id, params.limit)
        })
        .await;

    into_response(proxied)
}

async fn recommender_health<S>(State(app): State<AppState<S>>) -> Json<HealthStatus>
where
    S: ServiceSupervisor + 'static,
{
    Json(app.supervisor.health_status().await)
}

async fn recommender_stats<S>(State(app): State<AppState<S>>) -> Json<Value>
where
    S: ServiceSupervisor + 'static,
{
    Json(app.supervisor.performance_stats().await)
}

async fn start_service<S>(State(app): State<AppState<S>>) -> Response
where
    S: ServiceSupervisor + 'static,
{
    lifecycle_response("start", app.supervisor.start().await)
}

async fn stop_service<S>(State(app): State<AppState<S>>) -> Response
where
    S: ServiceSupervisor + 'static,
{
    lifecycle_response("stop", app.supervisor.stop().await)
}

async fn restart_service<S>(State(app): State<AppState<S>>) -> Response
where
    S: ServiceSupervisor + 'static,
{
    lifecycle_response("restart", app.supervisor.restart().await)
}

fn lifecycle_response(action: &str, result: SupervisorResult<bool>) -> Response {
    match result {
        Ok(_) => {
            let body = json!({
                "status": "success",
                "message": format!("recommender {action} completed")
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Recommender {action} failed: {e}");
            let body = json!({ "status": "error", "message": e.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
