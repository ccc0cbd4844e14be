// src/lib.rs
pub mod check;
pub mod config;
pub mod export;
pub mod metrics;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod server;
pub mod sink;
pub mod status;

pub use check::Check;
pub use registry::{MonitorError, MonitorRegistry};
pub use runner::{RegisteredService, RunnerState};
pub use sink::{ReportSink, SinkError};
pub use status::{Status, StatusLevel};
