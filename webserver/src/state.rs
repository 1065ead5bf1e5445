//! Shared application state for the axum router

use std::sync::Arc;

use supervisor::traits::ServiceSupervisor;

use crate::proxy::FallbackProxy;
use crate::recommender::CatalogRecommender;

/// Dependency container handed to every handler
///
/// The supervisor is shared read-mostly: handlers reach its state only
/// through the trait's public methods, and writes happen inside its own
/// serialized lifecycle calls.
pub struct AppState<S: ServiceSupervisor> {
    pub supervisor: Arc<S>,
    pub proxy: FallbackProxy<S>,
    pub recommender: CatalogRecommender,
}

impl<S: ServiceSupervisor> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
            proxy: self.proxy.clone(),
            recommender: self.recommender.clone(),
        }
    }
}
