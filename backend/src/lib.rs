//! Stockroom backend
//!
//! Multi-tenant stock inventory: a weighted-average-cost ledger, a
//! category tree dashboard and the HTTP API over both.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{CatalogService, DashboardService, InventoryLedger};
use store::{InventoryStore, MemoryStore};

/// Upper bound for `?limit` on movement history
pub const MAX_HISTORY_LIMIT: i64 = 1000;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    pub fn ledger(&self) -> InventoryLedger {
        InventoryLedger::new(
            self.store.clone(),
            self.config.ledger.selling_price_fallback,
        )
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store.clone())
    }

    /// Requested history size, defaulted from config and clamped
    pub fn history_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.config.ledger.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stockroom Inventory API v1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit_is_clamped() {
        let state = AppState::in_memory(Config::in_memory("secret"));
        assert_eq!(state.history_limit(None), 100);
        assert_eq!(state.history_limit(Some(0)), 1);
        assert_eq!(state.history_limit(Some(5000)), MAX_HISTORY_LIMIT);
    }
}
