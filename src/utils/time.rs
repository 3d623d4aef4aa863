use chrono::{DateTime, SecondsFormat, Utc};

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Stored form of `created_at`. Fixed width with a `Z` suffix so string order
/// matches time order.
pub fn format_created_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `YYYYMMDD_HHMMSS`, used in export filenames
pub fn export_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
