// tests/monitor_tests.rs
use anyhow::anyhow;
use async_trait::async_trait;
use service_monitor::check::from_fn;
use service_monitor::{
    MonitorError, MonitorRegistry, ReportSink, RunnerState, SinkError, Status, StatusLevel,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const PERIOD: Duration = Duration::from_secs(1);

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, Status)>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<(String, Status)> {
        self.calls.lock().unwrap().clone()
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

struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn send(&self, _service_name: &str, _status: &Status) -> Result<(), SinkError> {
        Err(SinkError::Client("relay unreachable".to_string()))
    }
}

/// Time to wait so that exactly `ticks` ticks have fired (at 0, 1, .. ticks-1 periods).
fn within_ticks(ticks: u32) -> Duration {
    PERIOD * ticks - PERIOD / 2
}

#[tokio::test(start_paused = true)]
async fn test_disk_space_reports_ok_every_period() {
    let sink = Arc::new(RecordingSink::default());
    let registry = MonitorRegistry::new(PERIOD, sink.clone());

    registry
        .register(
            "disk-space",
            from_fn(|| async { anyhow::Ok(Some(Status::ok("42% used"))) }),
        )
        .unwrap();

    sleep(within_ticks(3)).await;
    registry.shutdown();

    let calls = sink.calls();
    assert_eq!(calls.len(), 3);
    for (service, status) in calls {
        assert_eq!(service, "disk-space");
        assert_eq!(status.level(), StatusLevel::Ok);
        assert_eq!(status.message(), "42% used");
    }
}

#[tokio::test(start_paused = true)]
async fn test_db_ping_errors_report_unknown() {
    let sink = Arc::new(RecordingSink::default());
    let registry = MonitorRegistry::new(PERIOD, sink.clone());

    registry
        .register(
            "db-ping",
            from_fn(|| async { Err::<Option<Status>, _>(anyhow!("connection refused")) }),
        )
        .unwrap();

    sleep(within_ticks(2)).await;
    registry.shutdown();

    let calls = sink.calls();
    assert_eq!(calls.len(), 2);
    for (_, status) in calls {
        assert_eq!(status.level(), StatusLevel::Unknown);
        assert!(status.message().starts_with("Check threw exception:"));
        assert!(status.message().contains("connection refused"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_reports_null_status() {
    let sink = Arc::new(RecordingSink::default());
    let registry = MonitorRegistry::new(PERIOD, sink.clone());

    registry
        .register("cache", from_fn(|| async { anyhow::Ok(None::<Status>) }))
        .unwrap();

    sleep(within_ticks(1)).await;
    registry.shutdown();

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, Status::unknown("Null status"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_registration_leaves_original_running() {
    let sink = Arc::new(RecordingSink::default());
    let registry = MonitorRegistry::new(PERIOD, sink.clone());
    let second_calls = Arc::new(AtomicU32::new(0));

    let original = registry
        .register(
            "disk-space",
            from_fn(|| async { anyhow::Ok(Some(Status::ok("first"))) }),
        )
        .unwrap();

    let counter = second_calls.clone();
    let err = registry
        .register(
            "disk-space",
            from_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { anyhow::Ok(Some(Status::ok("second"))) }
            }),
        )
        .unwrap_err();

    assert!(matches!(err, MonitorError::DuplicateRegistration(ref name) if name == "disk-space"));
    assert_eq!(
        err.to_string(),
        "Service check [disk-space] has already been registered"
    );

    sleep(within_ticks(3)).await;

    assert_eq!(registry.len(), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(original.tick_count(), 3);
    assert_eq!(original.state(), RunnerState::Running);
    assert!(sink
        .calls()
        .iter()
        .all(|(_, status)| status.message() == "first"));

    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_failing_sink_does_not_stop_checks() {
    let registry = MonitorRegistry::new(PERIOD, Arc::new(FailingSink));
    let runs = Arc::new(AtomicU32::new(0));

    let counter = runs.clone();
    let service = registry
        .register(
            "queue-depth",
            from_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { anyhow::Ok(Some(Status::warning("backlog growing"))) }
            }),
        )
        .unwrap();

    sleep(within_ticks(5)).await;
    registry.shutdown();

    assert_eq!(runs.load(Ordering::SeqCst), 5);
    let snapshot = service.snapshot();
    assert_eq!(snapshot.ticks, 5);
    assert_eq!(snapshot.report_failures, 5);
}

#[tokio::test(start_paused = true)]
async fn test_services_tick_independently() {
    let sink = Arc::new(RecordingSink::default());
    let registry = MonitorRegistry::new(PERIOD, sink.clone());

    registry
        .register(
            "stuck",
            from_fn(|| async {
                sleep(Duration::from_secs(3600)).await;
                anyhow::Ok(Some(Status::ok("finally")))
            }),
        )
        .unwrap();
    let healthy = registry
        .register(
            "healthy",
            from_fn(|| async { anyhow::Ok(Some(Status::ok("up"))) }),
        )
        .unwrap();

    sleep(within_ticks(4)).await;
    registry.shutdown();

    assert_eq!(healthy.tick_count(), 4);
    assert!(sink.calls().iter().all(|(name, _)| name == "healthy"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_has_single_winner() {
    let registry = Arc::new(MonitorRegistry::new(
        Duration::from_secs(60),
        Arc::new(RecordingSink::default()),
    ));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry
                .register(
                    "contended",
                    from_fn(|| async { anyhow::Ok(Some(Status::ok("up"))) }),
                )
                .is_ok()
        }));
    }

    let results = futures::future::join_all(tasks).await;
    let winners = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
    registry.shutdown();
}
