// src/check/mod.rs
mod http;

pub use http::HttpCheck;

use crate::status::Status;
use async_trait::async_trait;
use std::future::Future;

/// User-supplied health-check logic.
///
/// Called repeatedly for as long as the service is registered. `Ok(None)`
/// means the check produced nothing; the monitor reports that as UNKNOWN,
/// the same as an `Err`.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check_status(&self) -> anyhow::Result<Option<Status>>;
}

/// Adapter turning an async closure into a [`Check`].
pub struct FnCheck<F> {
    f: F,
}

pub fn from_fn<F, Fut>(f: F) -> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Status>>> + Send,
{
    FnCheck { f }
}

#[async_trait]
impl<F, Fut> Check for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Status>>> + Send,
{
    async fn check_status(&self) -> anyhow::Result<Option<Status>> {
        (self.f)().await
    }
}

/// Turn a raw check outcome into the status that gets reported.
pub fn normalize(outcome: anyhow::Result<Option<Status>>) -> Status {
    match outcome {
        Ok(Some(status)) => status,
        Ok(None) => Status::unknown("Null status"),
        Err(e) => Status::unknown(format!("Check threw exception: {:#}", e)),
    }
}
