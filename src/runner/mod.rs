// src/runner/mod.rs
mod handle;

pub use handle::{RegisteredService, RunnerState, ServiceSnapshot};

use crate::check::{normalize, Check};
use crate::metrics::MetricsCollector;
use crate::sink::ReportSink;
use crate::status::Status;
use anyhow::anyhow;
use futures::FutureExt;
use handle::RunnerInner;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Delay before the next tick: whatever is left of the period after the
/// tick's own execution time, never negative.
pub fn next_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Runs one service's check on a fixed period until stopped.
///
/// Each tick checks, normalizes, reports, then sleeps for the remainder of
/// the period. Ticks of one runner never overlap. Failures of the check or
/// the sink are contained in the tick that produced them.
pub struct ServiceRunner {
    name: Arc<str>,
    period: Duration,
    check: Arc<dyn Check>,
    sink: Arc<dyn ReportSink>,
    metrics: Option<Arc<MetricsCollector>>,
    inner: Arc<RunnerInner>,
}

impl ServiceRunner {
    pub fn new(
        name: impl Into<Arc<str>>,
        period: Duration,
        check: Arc<dyn Check>,
        sink: Arc<dyn ReportSink>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            name: name.into(),
            period,
            check,
            sink,
            metrics,
            inner: Arc::new(RunnerInner::new()),
        }
    }

    fn handle(&self) -> RegisteredService {
        RegisteredService::new(self.name.clone(), self.period, self.inner.clone())
    }

    /// Start ticking on `runtime`. The first tick runs without delay.
    pub fn spawn(self, runtime: &Handle) -> RegisteredService {
        let service = self.handle();
        let shutdown_rx = self.inner.subscribe();
        runtime.spawn(self.run(shutdown_rx));
        service
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        debug!("Service [{}] runner started", self.name);

        loop {
            let stopping = *shutdown_rx.borrow_and_update();
            if stopping {
                break;
            }

            let started = Instant::now();
            let span = info_span!("tick", service = %self.name, tick_id = %Uuid::new_v4());

            if let Err(panic) = AssertUnwindSafe(self.tick().instrument(span))
                .catch_unwind()
                .await
            {
                warn!(
                    "Service [{}] had completely unexpected failure somewhere: {}",
                    self.name,
                    panic_message(&*panic)
                );
            }

            // A stop requested during the tick wins over rescheduling.
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            let delay = next_delay(self.period, started.elapsed());
            let Some(deadline) = Instant::now().checked_add(delay) else {
                error!(
                    "Service [{}] could not reschedule its next check (delay {:?}); monitoring halted",
                    self.name, delay
                );
                self.inner.halt();
                if let Some(metrics) = &self.metrics {
                    metrics.record_scheduling_failure(&self.name);
                }
                return;
            };

            tokio::select! {
                _ = sleep_until(deadline) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        self.inner.mark_stopped();
        info!("Service [{}] stopped", self.name);
    }

    async fn tick(&self) {
        let started = Instant::now();

        let status = self.run_check().await;
        self.report(&status).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_tick(&self.name, &status, started.elapsed());
        }
        self.inner.record(status);
    }

    async fn run_check(&self) -> Status {
        let outcome = match AssertUnwindSafe(self.check.check_status())
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(anyhow!("panicked: {}", panic_message(&*panic))),
        };

        match &outcome {
            Ok(Some(status)) => {
                debug!("Service [{}] returned status [{}]", self.name, status);
            }
            Ok(None) => {
                warn!("Service [{}] returned no status", self.name);
            }
            Err(e) => {
                warn!("Service [{}] threw exception: {:#}", self.name, e);
            }
        }

        if !matches!(outcome, Ok(Some(_))) {
            self.inner.record_check_failure();
            if let Some(metrics) = &self.metrics {
                metrics.record_check_failure(&self.name);
            }
        }

        normalize(outcome)
    }

    async fn report(&self, status: &Status) {
        let failure = match AssertUnwindSafe(self.sink.send(&self.name, status))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("sink panicked: {}", panic_message(&*panic)),
        };

        warn!(
            "Service [{}] failed sending status [{}]: {}",
            self.name, status, failure
        );
        self.inner.record_report_failure();
        if let Some(metrics) = &self.metrics {
            metrics.record_report_failure(&self.name);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::from_fn;
    use crate::sink::SinkError;
    use crate::status::StatusLevel;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::sleep;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, Status)>>,
    }

    impl RecordingSink {
        fn statuses(&self) -> Vec<Status> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, status)| status.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn send(&self, service_name: &str, status: &Status) -> Result<(), SinkError> {
            self.calls
                .lock()
                .unwrap()
                .push((service_name.to_string(), status.clone()));
            Ok(())
        }
    }

    struct PanickingCheck;

    #[async_trait]
    impl Check for PanickingCheck {
        async fn check_status(&self) -> anyhow::Result<Option<Status>> {
            panic!("check blew up");
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl ReportSink for PanickingSink {
        async fn send(&self, _service_name: &str, _status: &Status) -> Result<(), SinkError> {
            panic!("sink exploded");
        }
    }

    /// Check that sleeps for `work` and records when each invocation began.
    fn timed_check(work: Duration, starts: Arc<Mutex<Vec<Instant>>>) -> Arc<dyn Check> {
        Arc::new(from_fn(move || {
            let starts = starts.clone();
            async move {
                starts.lock().unwrap().push(Instant::now());
                sleep(work).await;
                anyhow::Ok(Some(Status::ok("done")))
            }
        }))
    }

    fn up_check() -> Arc<dyn Check> {
        Arc::new(from_fn(|| async { anyhow::Ok(Some(Status::ok("up"))) }))
    }

    fn gaps(starts: &[Instant]) -> Vec<Duration> {
        starts.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn test_next_delay_compensates_elapsed_time() {
        let period = Duration::from_secs(10);
        assert_eq!(next_delay(period, Duration::ZERO), period);
        assert_eq!(next_delay(period, Duration::from_secs(3)), Duration::from_secs(7));
    }

    #[test]
    fn test_next_delay_is_zero_on_overrun() {
        let period = Duration::from_secs(1);
        assert_eq!(next_delay(period, period), Duration::ZERO);
        assert_eq!(next_delay(period, Duration::from_millis(1500)), Duration::ZERO);
        assert_eq!(next_delay(Duration::ZERO, Duration::from_millis(5)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drift_does_not_accumulate() {
        let period = Duration::from_secs(1);
        let starts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::default());

        let service = ServiceRunner::new(
            "slow-check",
            period,
            timed_check(Duration::from_millis(300), starts.clone()),
            sink,
            None,
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(5_500)).await;
        service.stop();

        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 6);
        for gap in gaps(&starts) {
            assert!(gap >= period, "gap {:?} shorter than period", gap);
            assert!(gap < period + Duration::from_millis(5), "gap {:?} drifted", gap);
        }
        let total = starts[5] - starts[0];
        assert!(total < Duration::from_millis(5_010), "accumulated drift: {:?}", total);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_fires_next_tick_immediately() {
        let period = Duration::from_secs(1);
        let starts = Arc::new(Mutex::new(Vec::new()));

        let service = ServiceRunner::new(
            "overrun",
            period,
            timed_check(Duration::from_millis(1_500), starts.clone()),
            Arc::new(RecordingSink::default()),
            None,
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(4_000)).await;
        service.stop();

        let starts = starts.lock().unwrap().clone();
        assert!(starts.len() >= 3);
        for gap in gaps(&starts) {
            assert!(gap >= Duration::from_millis(1_500));
            assert!(gap < Duration::from_millis(1_505), "waited after overrun: {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_check_reports_unknown_and_keeps_ticking() {
        let sink = Arc::new(RecordingSink::default());
        let service = ServiceRunner::new(
            "panicky",
            Duration::from_secs(1),
            Arc::new(PanickingCheck),
            sink.clone(),
            None,
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(1_500)).await;
        service.stop();

        let statuses = sink.statuses();
        assert_eq!(statuses.len(), 2);
        for status in statuses {
            assert_eq!(status.level(), StatusLevel::Unknown);
            assert!(status.message().starts_with("Check threw exception:"));
            assert!(status.message().contains("check blew up"));
        }
        assert_eq!(service.snapshot().check_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_sink_is_contained() {
        let check = up_check();

        let service = ServiceRunner::new(
            "bad-sink",
            Duration::from_secs(1),
            check,
            Arc::new(PanickingSink),
            None,
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(2_500)).await;
        service.stop();

        assert_eq!(service.tick_count(), 3);
        assert_eq!(service.snapshot().report_failures, 3);
        assert_eq!(service.last_status(), Some(Status::ok("up")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_ticking() {
        let sink = Arc::new(RecordingSink::default());
        let check = up_check();

        let service =
            ServiceRunner::new("stoppable", Duration::from_secs(1), check, sink.clone(), None)
                .spawn(&Handle::current());

        sleep(Duration::from_millis(1_500)).await;
        service.stop();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.statuses().len(), 2);
        assert_eq!(service.state(), RunnerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_tick_reports_running_until_loop_exits() {
        let sink = Arc::new(RecordingSink::default());
        let starts = Arc::new(Mutex::new(Vec::new()));

        let service = ServiceRunner::new(
            "in-flight",
            Duration::MAX,
            timed_check(Duration::from_millis(500), starts.clone()),
            sink.clone(),
            None,
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(100)).await;
        service.stop();
        assert_eq!(service.state(), RunnerState::Running);
        assert!(sink.statuses().is_empty());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.statuses().len(), 1);
        assert_eq!(starts.lock().unwrap().len(), 1);
        // The unschedulable period is never reached: the stop wins.
        assert_eq!(service.state(), RunnerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unschedulable_period_halts_service() {
        let registry = crate::metrics::MetricsRegistry::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let check = up_check();

        let service = ServiceRunner::new(
            "forever",
            Duration::MAX,
            check,
            sink.clone(),
            Some(registry.collector()),
        )
        .spawn(&Handle::current());

        sleep(Duration::from_millis(10)).await;

        assert_eq!(sink.statuses().len(), 1);
        assert_eq!(service.state(), RunnerState::Halted);
        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains("monitor_scheduling_failures_total{service=\"forever\"} 1"));
    }
}
