use crate::core::error::{AppError, RegistrationError, ValidationError};
use crate::core::state::AppState;
use crate::security::flash::{clear_cookie, Flash};
use crate::validation::registration::RegistrationForm;
use crate::views::pages::render_index;
use axum::{
    extract::{rejection::FormRejection, Form, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUCCESS_MESSAGE: &str = "Registration successful — welcome to Akathon!";

/// Registration form
///
/// GET /
pub async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let flash = state.flash.from_headers(&headers);
    let page = Html(render_index(flash.as_ref()));

    match flash {
        Some(_) => ([(header::SET_COOKIE, clear_cookie())], page).into_response(),
        None => page.into_response(),
    }
}

/// Validate and store a registration, then bounce back to the form with a
/// flash message describing the outcome. A body that cannot be read as the
/// form counts as missing fields.
///
/// POST /register (form: username, password, cohort)
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> Result<Response, AppError> {
    let outcome = match form {
        Ok(Form(form)) => match form.validate() {
            Ok(registration) => state.registration.register_async(registration).await,
            Err(e) => Err(RegistrationError::from(e)),
        },
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable registration body");
            Err(RegistrationError::from(ValidationError::MissingFields))
        }
    };

    match outcome {
        Ok(_) => Ok(state.flash.redirect("/", &Flash::success(SUCCESS_MESSAGE))),
        Err(e) if e.is_user_facing() => {
            info!(reason = e.reason(), "Registration rejected");
            Ok(state.flash.redirect("/", &Flash::danger(e.to_string())))
        }
        Err(e) => {
            warn!(reason = e.reason(), "Registration failed");
            Err(AppError::InternalError(e.to_string()))
        }
    }
}
