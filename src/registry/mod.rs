// src/registry/mod.rs
use crate::check::Check;
use crate::export::{object_name, MetadataExporter, NoopExporter};
use crate::metrics::MetricsCollector;
use crate::runner::{RegisteredService, ServiceRunner};
use crate::sink::ReportSink;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Service check [{0}] has already been registered")]
    DuplicateRegistration(String),

    #[error("No tokio runtime available to run service checks")]
    NoRuntime,
}

/// Entry point for registering checks.
///
/// Every service registered here shares the registry's check period and
/// sink. Names are unique for the registry's lifetime.
pub struct MonitorRegistry {
    services: DashMap<String, RegisteredService>,
    check_period: Duration,
    sink: Arc<dyn ReportSink>,
    exporter: Arc<dyn MetadataExporter>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl MonitorRegistry {
    pub fn new(check_period: Duration, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            services: DashMap::new(),
            check_period,
            sink,
            exporter: Arc::new(NoopExporter),
            metrics: None,
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn MetadataExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn check_period(&self) -> Duration {
        self.check_period
    }

    /// Register `check` under `service_name` and start running it.
    ///
    /// Must be called from within a tokio runtime. The first check runs
    /// immediately.
    pub fn register<C>(
        &self,
        service_name: impl Into<String>,
        check: C,
    ) -> Result<RegisteredService, MonitorError>
    where
        C: Check + 'static,
    {
        self.register_arc(service_name, Arc::new(check))
    }

    pub fn register_arc(
        &self,
        service_name: impl Into<String>,
        check: Arc<dyn Check>,
    ) -> Result<RegisteredService, MonitorError> {
        let service_name = service_name.into();
        if service_name.trim().is_empty() {
            return Err(MonitorError::EmptyServiceName);
        }
        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let service = match self.services.entry(service_name) {
            Entry::Occupied(entry) => {
                return Err(MonitorError::DuplicateRegistration(entry.key().clone()));
            }
            Entry::Vacant(entry) => {
                let runner = ServiceRunner::new(
                    entry.key().as_str(),
                    self.check_period,
                    check,
                    self.sink.clone(),
                    self.metrics.clone(),
                );
                let service = runner.spawn(&runtime);
                entry.insert(service.clone());
                service
            }
        };

        info!(
            "Added service [{}] with check rate of [{:?}]",
            service, self.check_period
        );

        if let Some(metrics) = &self.metrics {
            metrics.update_registered_services(self.services.len());
        }

        let name = object_name(service.service_name());
        if let Err(e) = self.exporter.export(&name, &service) {
            warn!("Failed to export service metadata as [{}]: {:#}", name, e);
        }

        Ok(service)
    }

    pub fn get(&self, service_name: &str) -> Option<RegisteredService> {
        self.services.get(service_name).map(|entry| entry.clone())
    }

    /// All registered services, sorted by name.
    pub fn services(&self) -> Vec<RegisteredService> {
        let mut services: Vec<RegisteredService> = self
            .services
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        services.sort_by(|a, b| a.service_name().cmp(b.service_name()));
        services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Stop every registered service. Names stay reserved.
    pub fn shutdown(&self) {
        for entry in self.services.iter() {
            entry.value().stop();
        }
        info!("Stopped {} service(s)", self.services.len());
    }
}
