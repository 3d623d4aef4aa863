use crate::core::error::{AdminError, StoreError};
use crate::core::state::AppState;
use crate::models::admin::KeyQuery;
use crate::security::client_ip::ClientIp;
use crate::security::flash::{clear_cookie, Flash};
use crate::services::export::{render_workbook, XLSX_CONTENT_TYPE};
use crate::utils::auth::is_authorized;
use crate::utils::time::now_utc;
use crate::views::pages::render_admin;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Limiter entries above which expired windows are swept on the next failure
const LIMITER_SWEEP_THRESHOLD: usize = 1024;

/// Gate every admin endpoint.
///
/// A wrong or missing key is always 403 and counts against the caller's IP.
/// The right key from an IP that is over its failure budget gets 429.
fn authorize(
    state: &AppState,
    client_ip: Option<IpAddr>,
    supplied: &str,
    action: &'static str,
) -> Result<(), AdminError> {
    let now = now_utc().timestamp();

    if !is_authorized(supplied, &state.config.admin.key) {
        let failures = client_ip.map(|ip| state.admin_limiter.record_failure(ip, now));

        if state.admin_limiter.len() > LIMITER_SWEEP_THRESHOLD {
            state.admin_limiter.cleanup_old_entries(now);
        }

        warn!(action, client_ip = ?client_ip, failures = ?failures, "Unauthorized admin attempt");
        return Err(AdminError::Forbidden);
    }

    if let Some(ip) = client_ip {
        if state.admin_limiter.is_blocked(ip, now) {
            warn!(action, client_ip = %ip, "Admin access throttled after repeated failures");
            return Err(AdminError::TooManyAttempts);
        }
    }

    Ok(())
}

/// An unparseable query string carries no usable key
fn parse_key_query(query: Result<Query<KeyQuery>, QueryRejection>) -> KeyQuery {
    match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable admin query");
            KeyQuery::default()
        }
    }
}

/// Run a blocking store call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Registrant list
///
/// GET /admin?key=<key>
pub async fn admin_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    query: Result<Query<KeyQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, AdminError> {
    let params = parse_key_query(query);
    authorize(&state, client_ip, &params.key, "list")?;

    let store = state.store.clone();
    let students = blocking(move || store.list_all()).await?;

    let key_query = params
        .to_query_string()
        .map_err(|e| AdminError::InternalError(e.to_string()))?;

    let flash = state.flash.from_headers(&headers);
    let page = Html(render_admin(
        &students,
        state.config.registration.max_per_cohort,
        &key_query,
        flash.as_ref(),
    ));

    info!(students = students.len(), "Admin list viewed");

    Ok(match flash {
        Some(_) => ([(header::SET_COOKIE, clear_cookie())], page).into_response(),
        None => page.into_response(),
    })
}

/// Delete a registrant. Deleting an id that does not exist looks exactly like
/// deleting one that does.
///
/// GET /delete/{id}?key=<key>
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    Path(id): Path<String>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Response, AdminError> {
    let params = parse_key_query(query);
    authorize(&state, client_ip, &params.key, "delete")?;

    // Non-negative decimal ids only, like an integer route segment
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AdminError::NotFound);
    }
    let id: i64 = id.parse().map_err(|_| AdminError::NotFound)?;

    let store = state.store.clone();
    let removed = blocking(move || store.delete_by_id(id)).await?;

    info!(student_id = id, removed, "Admin delete");

    let key_query = params
        .to_query_string()
        .map_err(|e| AdminError::InternalError(e.to_string()))?;

    Ok(state.flash.redirect(
        &format!("/admin?{}", key_query),
        &Flash::success(format!("Student {} deleted successfully.", id)),
    ))
}

/// Spreadsheet of all registrants, same order as the list
///
/// GET /export?key=<key>
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Response, AdminError> {
    let params = parse_key_query(query);
    authorize(&state, client_ip, &params.key, "export")?;

    let store = state.store.clone();
    let export = tokio::task::spawn_blocking(move || {
        let students = store.export_all()?;
        render_workbook(&students, now_utc())
    })
    .await
    .map_err(StoreError::from)??;

    info!(filename = %export.filename, bytes = export.bytes.len(), "Admin export");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

/// Raw database file. Off unless `admin.allow_db_download` is set, since the
/// file contains every password hash.
///
/// GET /download-db?key=<key>
pub async fn download_db_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Response, AdminError> {
    if !state.config.admin.allow_db_download {
        return Err(AdminError::NotFound);
    }

    let params = parse_key_query(query);
    authorize(&state, client_ip, &params.key, "download_db")?;

    let store = state.store.clone();
    let bytes = blocking(move || store.read_raw()).await?;

    warn!(bytes = bytes.len(), "Raw database downloaded");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"akathon.db\""),
        ],
        bytes,
    )
        .into_response())
}

/// Formerly echoed the admin key. Kept as a route so probes are logged.
///
/// GET /debug-key
pub async fn debug_key_handler(ClientIp(client_ip): ClientIp) -> Response {
    warn!(client_ip = ?client_ip, "Request for removed /debug-key endpoint");
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
