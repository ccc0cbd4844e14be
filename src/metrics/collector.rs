// src/metrics/collector.rs
use crate::status::Status;
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Per-service tick metrics
    pub ticks_total: IntCounterVec,
    pub check_failures_total: IntCounterVec,
    pub report_failures_total: IntCounterVec,
    pub scheduling_failures_total: IntCounterVec,
    pub tick_duration_seconds: HistogramVec,
    pub status_level: IntGaugeVec,

    // Registry metrics
    pub registered_services: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let ticks_total = IntCounterVec::new(
            Opts::new("monitor_ticks_total", "Total check executions"),
            &["service"],
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let check_failures_total = IntCounterVec::new(
            Opts::new(
                "monitor_check_failures_total",
                "Checks that failed or returned no status",
            ),
            &["service"],
        )?;
        registry.register(Box::new(check_failures_total.clone()))?;

        let report_failures_total = IntCounterVec::new(
            Opts::new(
                "monitor_report_failures_total",
                "Statuses the sink failed to deliver",
            ),
            &["service"],
        )?;
        registry.register(Box::new(report_failures_total.clone()))?;

        let scheduling_failures_total = IntCounterVec::new(
            Opts::new(
                "monitor_scheduling_failures_total",
                "Services halted because their next tick could not be scheduled",
            ),
            &["service"],
        )?;
        registry.register(Box::new(scheduling_failures_total.clone()))?;

        let tick_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "monitor_tick_duration_seconds",
                "Time spent checking and reporting, in seconds",
            ),
            &["service"],
        )?;
        registry.register(Box::new(tick_duration_seconds.clone()))?;

        let status_level = IntGaugeVec::new(
            Opts::new(
                "monitor_status_level",
                "Last reported level (0=OK, 1=WARNING, 2=CRITICAL, 3=UNKNOWN)",
            ),
            &["service"],
        )?;
        registry.register(Box::new(status_level.clone()))?;

        let registered_services =
            IntGauge::new("monitor_registered_services", "Number of registered services")?;
        registry.register(Box::new(registered_services.clone()))?;

        Ok(Self {
            ticks_total,
            check_failures_total,
            report_failures_total,
            scheduling_failures_total,
            tick_duration_seconds,
            status_level,
            registered_services,
        })
    }

    pub fn record_tick(&self, service: &str, status: &Status, duration: Duration) {
        self.ticks_total.with_label_values(&[service]).inc();
        self.tick_duration_seconds
            .with_label_values(&[service])
            .observe(duration.as_secs_f64());
        self.status_level
            .with_label_values(&[service])
            .set(status.level().code() as i64);
    }

    pub fn record_check_failure(&self, service: &str) {
        self.check_failures_total.with_label_values(&[service]).inc();
    }

    pub fn record_report_failure(&self, service: &str) {
        self.report_failures_total.with_label_values(&[service]).inc();
    }

    pub fn record_scheduling_failure(&self, service: &str) {
        self.scheduling_failures_total
            .with_label_values(&[service])
            .inc();
    }

    pub fn update_registered_services(&self, count: usize) {
        self.registered_services.set(count as i64);
    }
}
