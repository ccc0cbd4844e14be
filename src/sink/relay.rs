// src/sink/relay.rs
use super::{ReportSink, SinkError};
use crate::config::RelayConfig;
use crate::retry::{RetryDecision, RetryStrategy};
use crate::status::Status;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// One passive check result as submitted to the relay.
#[derive(Debug, Serialize)]
pub struct PassiveCheckPayload<'a> {
    pub host: &'a str,
    pub service: &'a str,
    pub level: u8,
    pub message: &'a str,
}

/// Submits statuses to a passive-monitoring relay over HTTP.
///
/// Transient failures (transport errors, 408/429/5xx) are retried with
/// backoff; anything else is returned to the caller on the first attempt.
pub struct HttpRelaySink {
    client: Client,
    endpoint: Url,
    hostname: String,
    retry: RetryStrategy,
}

impl HttpRelaySink {
    pub fn new(config: &RelayConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;

        let hostname = config
            .hostname
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "localhost".to_string());

        Ok(Self {
            client,
            endpoint: config.url.clone(),
            hostname,
            retry: RetryStrategy::new(config.retry.clone()),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn post(&self, payload: &PassiveCheckPayload<'_>) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected(status))
        }
    }
}

fn retry_decision(error: &SinkError) -> RetryDecision {
    match error {
        SinkError::Transport(_) => RetryDecision::Retry,
        SinkError::Rejected(status) => RetryStrategy::is_retryable_status(*status),
        SinkError::Client(_) => RetryDecision::NoRetry,
    }
}

#[async_trait]
impl ReportSink for HttpRelaySink {
    async fn send(&self, service_name: &str, status: &Status) -> Result<(), SinkError> {
        let payload = PassiveCheckPayload {
            host: &self.hostname,
            service: service_name,
            level: status.level().code(),
            message: status.message(),
        };

        self.retry
            .execute_with_decision(|| self.post(&payload), retry_decision)
            .await?;

        debug!(
            "Service [{}] submitted {} to {}",
            service_name, status, self.endpoint
        );
        Ok(())
    }
}
