// src/status/mod.rs
mod level;
mod status;

pub use level::StatusLevel;
pub use status::Status;
