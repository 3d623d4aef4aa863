pub mod core {
    pub mod config;
    pub mod error;
    pub mod state;
    pub mod routes;
    pub mod tracing_init;
}

pub mod handlers {
    pub mod admin;
    pub mod fallback;
    pub mod health;
    pub mod register;
}

pub mod models {
    pub mod admin;
    pub mod student;
}

pub mod security {
    pub mod client_ip;
    pub mod flash;
    pub mod rate_limiter;
}

pub mod services {
    pub mod export;
    pub mod registration;
}

pub mod stores {
    pub mod student_store;
}

pub mod utils {
    pub mod auth;
    pub mod html;
    pub mod time;
}

pub mod validation {
    pub mod registration;
}

pub mod views {
    pub mod pages;
}
