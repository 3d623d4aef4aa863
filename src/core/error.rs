// Centralized error handling for the portal

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Reasons a registration form is rejected before touching the store.
/// The display text is shown to the student as a flash message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill all fields and choose a cohort.")]
    MissingFields,

    #[error("Username must be in the format PLASU/YEAR/FNAS/MAT (MAT = 4 digits).")]
    BadUsernameFormat,

    #[error("Password must be in the format AKTH/YEAR/CCC/MAT (MAT = 4 digits).")]
    BadPasswordFormat,

    #[error("YEAR in username/password must match the chosen cohort.")]
    YearMismatch,

    #[error("MAT in username and password must be the same 4-digit number.")]
    MatMismatch,
}

impl ValidationError {
    /// Short machine-readable reason for logs
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingFields => "missing_fields",
            ValidationError::BadUsernameFormat => "bad_username_format",
            ValidationError::BadPasswordFormat => "bad_password_format",
            ValidationError::YearMismatch => "year_mismatch",
            ValidationError::MatMismatch => "mat_mismatch",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Registration for cohort {cohort} is full ({max} students).")]
    CohortFull { cohort: String, max: u32 },

    #[error("Username already registered.")]
    DuplicateUsername,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistrationError {
    /// Whether the student should see this as a flash message rather than a 500
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RegistrationError::Invalid(_)
                | RegistrationError::CohortFull { .. }
                | RegistrationError::DuplicateUsername
        )
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RegistrationError::Invalid(e) => e.reason(),
            RegistrationError::CohortFull { .. } => "cohort_full",
            RegistrationError::DuplicateUsername => "duplicate_username",
            RegistrationError::Hashing(_) => "hashing",
            RegistrationError::Store(_) => "store",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Too many failed attempts")]
    TooManyAttempts,

    #[error("Not Found")]
    NotFound,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        AdminError::InternalError(e.to_string())
    }
}

impl From<ExportError> for AdminError {
    fn from(e: ExportError) -> Self {
        AdminError::InternalError(e.to_string())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        // Bodies carry no detail; the cause goes to the log only
        let (status, message) = match &self {
            AdminError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            AdminError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"),
            AdminError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            AdminError::InternalError(detail) => {
                tracing::error!(error = %detail, "Admin request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, message).into_response()
    }
}

/// Failures on the public side that are not shown as flash messages
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::InternalError(detail) = &self;
        tracing::error!(error = %detail, "Request failed");

        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
