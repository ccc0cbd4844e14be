// src/sink/mod.rs
mod log;
mod relay;

pub use self::log::LogSink;
pub use relay::{HttpRelaySink, PassiveCheckPayload};

use crate::config::SinkConfig;
use crate::status::Status;
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers a service's status to a monitoring backend.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, service_name: &str, status: &Status) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay rejected status with HTTP {0}")]
    Rejected(reqwest::StatusCode),

    #[error("Sink misconfigured: {0}")]
    Client(String),
}

/// Build the sink described by the configuration.
pub fn from_config(config: &SinkConfig) -> Result<Arc<dyn ReportSink>, SinkError> {
    match config {
        SinkConfig::Log => Ok(Arc::new(LogSink::new())),
        SinkConfig::Relay(relay) => Ok(Arc::new(HttpRelaySink::new(relay)?)),
    }
}
