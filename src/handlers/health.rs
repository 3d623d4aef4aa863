use axum::{http::StatusCode, response::IntoResponse};

/// Health check handler
///
/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
