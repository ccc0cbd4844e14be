// src/status/status.rs
use super::StatusLevel;
use serde::Serialize;
use std::fmt;

/// Immutable outcome of one check execution.
///
/// Only the named factories build a `Status`; the `*f` variants take a
/// pre-formatted template, e.g. `Status::okf(format_args!("{}% used", pct))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    level: StatusLevel,
    message: String,
}

impl Status {
    fn new(level: StatusLevel, message: String) -> Self {
        Self { level, message }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Ok, message.into())
    }

    pub fn okf(args: fmt::Arguments<'_>) -> Self {
        Self::new(StatusLevel::Ok, args.to_string())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, message.into())
    }

    pub fn warningf(args: fmt::Arguments<'_>) -> Self {
        Self::new(StatusLevel::Warning, args.to_string())
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Critical, message.into())
    }

    pub fn criticalf(args: fmt::Arguments<'_>) -> Self {
        Self::new(StatusLevel::Critical, args.to_string())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Unknown, message.into())
    }

    pub fn unknownf(args: fmt::Arguments<'_>) -> Self {
        Self::new(StatusLevel::Unknown, args.to_string())
    }

    pub fn level(&self) -> StatusLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.message)
    }
}
