// src/sink/log.rs
use super::{ReportSink, SinkError};
use crate::status::Status;
use async_trait::async_trait;
use tracing::info;

/// Development sink: logs what would have been reported and never fails.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSink for LogSink {
    async fn send(&self, service_name: &str, status: &Status) -> Result<(), SinkError> {
        info!("Service [{}] would have reported: {}", service_name, status);
        Ok(())
    }
}
