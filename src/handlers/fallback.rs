use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::debug;

pub async fn fallback_handler(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No route");
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
