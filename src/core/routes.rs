// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints
        .route("/", get(crate::handlers::register::index_handler))
        .route("/register", post(crate::handlers::register::register_handler))
        .route("/health", get(crate::handlers::health::health_handler))

        // Admin endpoints (require ?key=)
        .route("/admin", get(crate::handlers::admin::admin_handler))
        .route("/delete/{id}", get(crate::handlers::admin::delete_handler))
        .route("/export", get(crate::handlers::admin::export_handler))
        .route("/download-db", get(crate::handlers::admin::download_db_handler))

        // Removed; answers 404 and logs the probe
        .route("/debug-key", get(crate::handlers::admin::debug_key_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
