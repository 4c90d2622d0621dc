//! Route definitions for the stock API

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock items, movements and dashboard
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - category management
        .nest("/categories", category_routes(state))
}

/// Stock routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route("/movement", post(handlers::record_movement))
        .route("/scan-transaction", post(handlers::scan_transaction))
        .route("/scan-out", post(handlers::scan_out))
        .route("/movements", get(handlers::list_movements))
        .route("/low-stock", get(handlers::low_stock))
        .route("/tree", get(handlers::get_tree))
        .route("/report.csv", get(handlers::get_report))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/:item_id/movements", get(handlers::item_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Category routes (protected)
fn category_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/:category_id", delete(handlers::delete_category))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
