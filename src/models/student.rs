use serde::Serialize;
use std::fmt;

/// Event cohorts that accept registrations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Cohort {
    Y2024,
    Y2025,
}

impl Cohort {
    pub const ALL: [Cohort; 2] = [Cohort::Y2024, Cohort::Y2025];

    pub fn year(self) -> i64 {
        match self {
            Cohort::Y2024 => 2024,
            Cohort::Y2025 => 2025,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cohort::Y2024 => "2024",
            Cohort::Y2025 => "2025",
        }
    }

    /// Parse the exact year string; no trimming, no other years.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "2024" => Some(Cohort::Y2024),
            "2025" => Some(Cohort::Y2025),
            _ => None,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored registrant as the admin side sees it. The password hash never
/// leaves the store through this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: i64,
    pub username: String,
    /// Raw cohort column; rows written by this service are always 2024 or 2025
    pub cohort: i64,
    /// 4-digit matriculation number shared by username and password
    pub mat: String,
    /// RFC 3339 UTC timestamp
    pub created_at: String,
}

/// Row about to be inserted
#[derive(Clone, Debug)]
pub struct NewStudent {
    pub username: String,
    pub password_hash: String,
    pub cohort: Cohort,
    pub mat: String,
    pub created_at: String,
}
