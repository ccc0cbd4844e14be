// src/runner/handle.rs
use crate::status::Status;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerState {
    Running,
    /// Stopped through [`RegisteredService::stop`].
    Stopped,
    /// The next tick could not be scheduled; the service no longer reports.
    Halted,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunnerState::Running,
            1 => RunnerState::Stopped,
            _ => RunnerState::Halted,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            RunnerState::Running => 0,
            RunnerState::Stopped => 1,
            RunnerState::Halted => 2,
        }
    }
}

#[derive(Debug)]
struct LastReport {
    status: Status,
    checked_at: DateTime<Utc>,
}

/// State shared between a runner task and the handles pointing at it.
/// Only the runner writes tick results.
pub(crate) struct RunnerInner {
    ticks: AtomicU64,
    check_failures: AtomicU64,
    report_failures: AtomicU64,
    last_report: ArcSwapOption<LastReport>,
    state: AtomicU8,
    shutdown_tx: watch::Sender<bool>,
}

impl RunnerInner {
    pub(crate) fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            ticks: AtomicU64::new(0),
            check_failures: AtomicU64::new(0),
            report_failures: AtomicU64::new(0),
            last_report: ArcSwapOption::empty(),
            state: AtomicU8::new(RunnerState::Running.as_u8()),
            shutdown_tx,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub(crate) fn record(&self, status: Status) {
        self.last_report.store(Some(Arc::new(LastReport {
            status,
            checked_at: Utc::now(),
        })));
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_check_failure(&self) {
        self.check_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_report_failure(&self) {
        self.report_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn halt(&self) {
        self.state.store(RunnerState::Halted.as_u8(), Ordering::SeqCst);
    }

    pub(crate) fn mark_stopped(&self) {
        let _ = self.state.compare_exchange(
            RunnerState::Running.as_u8(),
            RunnerState::Stopped.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn state(&self) -> RunnerState {
        RunnerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Ask the runner to stop. The state changes once its loop has exited.
    fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Handle to a registered service and its running loop.
#[derive(Clone)]
pub struct RegisteredService {
    name: Arc<str>,
    check_period: Duration,
    inner: Arc<RunnerInner>,
}

impl RegisteredService {
    pub(crate) fn new(name: Arc<str>, check_period: Duration, inner: Arc<RunnerInner>) -> Self {
        Self {
            name,
            check_period,
            inner,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.name
    }

    pub fn check_period(&self) -> Duration {
        self.check_period
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.inner.ticks.load(Ordering::Relaxed)
    }

    pub fn last_status(&self) -> Option<Status> {
        self.inner
            .last_report
            .load_full()
            .map(|report| report.status.clone())
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.inner
            .last_report
            .load_full()
            .map(|report| report.checked_at)
    }

    pub fn state(&self) -> RunnerState {
        self.inner.state()
    }

    /// Stop ticking. An in-flight tick completes; no further tick starts.
    /// [`state`](Self::state) reads `Stopped` once the loop has exited.
    /// The name stays registered.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        let last = self.inner.last_report.load_full();

        ServiceSnapshot {
            name: self.name.to_string(),
            check_period_ms: u64::try_from(self.check_period.as_millis()).unwrap_or(u64::MAX),
            state: self.state(),
            ticks: self.tick_count(),
            check_failures: self.inner.check_failures.load(Ordering::Relaxed),
            report_failures: self.inner.report_failures.load(Ordering::Relaxed),
            last_status: last.as_ref().map(|report| report.status.clone()),
            last_checked_at: last.as_ref().map(|report| report.checked_at),
        }
    }
}

impl fmt::Display for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredService")
            .field("name", &self.name)
            .field("check_period", &self.check_period)
            .field("state", &self.state())
            .finish()
    }
}

/// Point-in-time view of a service, as served by the introspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub check_period_ms: u64,
    pub state: RunnerState,
    pub ticks: u64,
    pub check_failures: u64,
    pub report_failures: u64,
    pub last_status: Option<Status>,
    pub last_checked_at: Option<DateTime<Utc>>,
}
