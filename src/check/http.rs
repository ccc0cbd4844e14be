// src/check/http.rs
use super::Check;
use crate::config::HttpCheckConfig;
use crate::status::Status;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

/// Probes an HTTP endpoint: 2xx is OK (or WARNING when slow), anything
/// else is CRITICAL.
pub struct HttpCheck {
    url: Url,
    client: Client,
    timeout: Duration,
    warn_latency: Option<Duration>,
}

impl HttpCheck {
    pub fn new(config: &HttpCheckConfig) -> anyhow::Result<Self> {
        // The request deadline is enforced around `send` in `check_status`.
        let client = Client::builder().build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
            timeout: config.timeout(),
            warn_latency: config.warn_latency(),
        })
    }
}

#[async_trait]
impl Check for HttpCheck {
    async fn check_status(&self) -> anyhow::Result<Option<Status>> {
        let start = Instant::now();

        let result = timeout(self.timeout, self.client.get(self.url.as_str()).send()).await;
        let elapsed_ms = start.elapsed().as_millis();

        let status = match result {
            Ok(Ok(response)) => {
                let code = response.status();
                if !code.is_success() {
                    Status::criticalf(format_args!("HTTP {} from {}", code, self.url))
                } else if self
                    .warn_latency
                    .is_some_and(|limit| start.elapsed() > limit)
                {
                    Status::warningf(format_args!("HTTP {} in {}ms (slow)", code, elapsed_ms))
                } else {
                    Status::okf(format_args!("HTTP {} in {}ms", code, elapsed_ms))
                }
            }
            Ok(Err(e)) => Status::criticalf(format_args!("Request to {} failed: {}", self.url, e)),
            Err(_) => Status::criticalf(format_args!(
                "Request to {} timed out after {:?}",
                self.url, self.timeout
            )),
        };

        Ok(Some(status))
    }
}
