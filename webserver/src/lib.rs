//! Web tier for the streaming backend's recommendation surface
//!
//! Exposes the recommendation API over axum, proxying requests to the
//! supervised recommender service with transparent fallback to the local
//! catalog algorithm whenever the service is slow, crashed, or never
//! started.

pub mod error;
pub mod proxy;
pub mod recommender;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use error::{WebServerError, WebServerResult};
pub use proxy::{FallbackProxy, ProxyConfig};
pub use recommender::{CatalogRecommender, TrackSummary};
pub use server::WebServer;
pub use state::AppState;
