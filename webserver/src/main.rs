//! Main entry point for the webserver binary
//!
//! Boots the recommender supervisor (best effort), serves the HTTP API,
//! and ties supervisor shutdown to process termination signals. The
//! companion service is an optional accelerator, never a hard dependency
//! for booting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use shared::logging;
use supervisor::traits::ServiceSupervisor;
use supervisor::{RealHealthProber, RecommenderConfig, RecommenderSupervisor};
use webserver::{AppState, CatalogRecommender, FallbackProxy, ProxyConfig, WebServer, WebServerResult};

/// Web tier for the streaming backend's recommendation API
#[derive(Parser)]
#[command(name = "webserver")]
#[command(about = "Serves recommendations, supervising the companion recommender service")]
pub struct Args {
    /// HTTP port (falls back to the PORT environment variable, then 5000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Loopback port the recommender service binds
    #[arg(long, default_value = "5001")]
    pub recommender_port: u16,

    /// Entry-point script for the recommender service
    #[arg(long, default_value = "./recommender/recommender_service.py")]
    pub recommender_entry: PathBuf,

    /// Interpreter used to launch the recommender
    #[arg(long, default_value = "python3")]
    pub recommender_runtime: String,

    /// Directory for captured recommender output
    #[arg(long, default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Track catalog backing the local fallback recommender
    #[arg(long, default_value = "./data/catalog.json")]
    pub catalog: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing(Some(&args.log_level));

    let port = args
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|raw| raw.parse().ok()))
        .unwrap_or(5000);

    let config = RecommenderConfig::new(args.recommender_port, args.recommender_entry.clone())
        .with_runtime(args.recommender_runtime.clone())
        .with_log_path(args.log_dir.join("recommender.log"));
    let proxy_config = ProxyConfig::new(config.base_url());

    let supervisor = Arc::new(RecommenderSupervisor::new(config, RealHealthProber::new()));

    logging::log_startup("webserver", &format!("recommendation API on port {port}"));

    // The recommender is an accelerator: log failures and keep serving
    match supervisor.start().await {
        Ok(_) => {
            let health = supervisor.health_status().await;
            if health.is_online() {
                logging::log_success("recommender service is healthy and ready");
            } else {
                tracing::warn!("⚠️ Recommender may not be fully ready; continuing startup");
            }
        }
        Err(e) => logging::log_error("recommender startup", &e),
    }

    let recommender = match CatalogRecommender::from_json_file(&args.catalog) {
        Ok(recommender) => {
            tracing::info!(
                "📚 Loaded {} catalog tracks for the local recommender",
                recommender.len()
            );
            recommender
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Could not load catalog {}: {e}; local fallback starts empty",
                args.catalog.display()
            );
            CatalogRecommender::new(Vec::new())
        }
    };

    let state = AppState {
        supervisor: Arc::clone(&supervisor),
        proxy: FallbackProxy::new(Arc::clone(&supervisor), proxy_config),
        recommender,
    };

    let bind_address = SocketAddr::from(([0, 0, 0, 0], port));
    let server = WebServer::new(bind_address, state);

    // On termination signals, stop the recommender before the server
    // drains; shutdown must never hang, so stop errors are only logged.
    let shutdown_supervisor = Arc::clone(&supervisor);
    let shutdown = async move {
        wait_for_termination().await;
        logging::log_shutdown("webserver", "termination signal received");
        if let Err(e) = shutdown_supervisor.stop().await {
            logging::log_error("recommender shutdown", &e);
        }
    };

    server.run(shutdown).await?;

    logging::log_success("webserver stopped gracefully");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        logging::log_error("signal handling", &e);
    }
}
