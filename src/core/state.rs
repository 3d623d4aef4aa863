// Application state (AppState)

use crate::core::config::Config;
use crate::security::{flash::FlashCodec, rate_limiter::FailedAttemptLimiter};
use crate::services::registration::RegistrationService;
use crate::stores::student_store::StudentStore;
use std::sync::Arc;

/// Shared application state
///
/// Built once at startup from the loaded [`Config`]; handlers only ever read
/// configuration through it.
#[derive(Clone)]
pub struct AppState {
    /// Path-only handle to the registrant database
    pub store: StudentStore,

    /// Capacity/uniqueness checks and inserts
    pub registration: RegistrationService,

    /// Signs flash cookies with the session secret
    pub flash: FlashCodec,

    /// Throttles clients that keep guessing the admin key
    pub admin_limiter: Arc<FailedAttemptLimiter>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let store = StudentStore::new(config.database.path.clone());
        let registration =
            RegistrationService::new(store.clone(), config.registration.max_per_cohort);

        Self {
            store,
            registration,
            flash: FlashCodec::new(&config.session.secret),
            admin_limiter: Arc::new(FailedAttemptLimiter::new(
                config.admin.max_failed_attempts_per_minute,
            )),
            config,
        }
    }
}
