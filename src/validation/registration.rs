use crate::core::error::ValidationError;
use crate::models::student::Cohort;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PLASU/(2024|2025)/FNAS/([0-9]{4})$").expect("username pattern is valid")
});

static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^AKTH/(2024|2025)/CCC/([0-9]{4})$").expect("password pattern is valid")
});

/// Form body of POST /register
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub cohort: String,
}

/// A submission that passed every format and consistency check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub username: String,
    pub password: String,
    pub cohort: Cohort,
    pub mat: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        validate_registration(&self.username, &self.password, &self.cohort)
    }
}

/// Check a raw registration submission.
///
/// Fields are trimmed first. Checks run in a fixed order and the first
/// failure is returned: presence and cohort, username format, password
/// format, year agreement, MAT agreement.
pub fn validate_registration(
    username: &str,
    password: &str,
    cohort: &str,
) -> Result<ValidRegistration, ValidationError> {
    let username = username.trim();
    let password = password.trim();
    let cohort = cohort.trim();

    let cohort = match Cohort::parse(cohort) {
        Some(cohort) if !username.is_empty() && !password.is_empty() => cohort,
        _ => return Err(ValidationError::MissingFields),
    };

    let (user_year, user_mat) = capture(&USERNAME_RE, username)
        .ok_or(ValidationError::BadUsernameFormat)?;

    let (pass_year, pass_mat) = capture(&PASSWORD_RE, password)
        .ok_or(ValidationError::BadPasswordFormat)?;

    if user_year != cohort.as_str() || pass_year != cohort.as_str() {
        return Err(ValidationError::YearMismatch);
    }

    if user_mat != pass_mat {
        return Err(ValidationError::MatMismatch);
    }

    Ok(ValidRegistration {
        username: username.to_string(),
        password: password.to_string(),
        cohort,
        mat: user_mat.to_string(),
    })
}

/// Returns the (year, mat) capture groups of a full match
fn capture<'a>(re: &Regex, value: &'a str) -> Option<(&'a str, &'a str)> {
    let caps = re.captures(value)?;
    let year = caps.get(1)?.as_str();
    let mat = caps.get(2)?.as_str();
    Some((year, mat))
}
