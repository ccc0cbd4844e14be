// src/status/level.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a check outcome, ordered by increasing urgency.
///
/// `Unknown` is reserved for the monitor itself: it is what a service
/// reports when its check failed or produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLevel {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl StatusLevel {
    /// Conventional passive-check return code (0..=3).
    pub fn code(self) -> u8 {
        match self {
            StatusLevel::Ok => 0,
            StatusLevel::Warning => 1,
            StatusLevel::Critical => 2,
            StatusLevel::Unknown => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Ok => "OK",
            StatusLevel::Warning => "WARNING",
            StatusLevel::Critical => "CRITICAL",
            StatusLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
