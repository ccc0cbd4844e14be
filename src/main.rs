// src/main.rs
use anyhow::{Context, Result};
use service_monitor::{
    check::HttpCheck,
    config::{self, Config},
    export::ServiceDirectory,
    metrics::MetricsRegistry,
    server::{IntrospectionHandler, ServerBuilder},
    sink, MonitorRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("service_monitor=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "monitor.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    let sink = sink::from_config(&config.sink).context("Failed to build report sink")?;
    let directory = Arc::new(ServiceDirectory::new());

    let mut registry =
        MonitorRegistry::new(config.check_period(), sink).with_exporter(directory.clone());

    let metrics_registry = if config.metrics.enabled {
        let metrics_registry = Arc::new(MetricsRegistry::new()?);
        registry = registry.with_metrics(metrics_registry.collector());
        Some(metrics_registry)
    } else {
        None
    };

    register_checks(&registry, &config)?;

    if let Some(metrics_registry) = metrics_registry {
        start_introspection_server(&config, directory, metrics_registry);
    }

    shutdown_signal().await;
    registry.shutdown();

    Ok(())
}

fn register_checks(registry: &MonitorRegistry, config: &Config) -> Result<()> {
    if config.checks.is_empty() {
        info!("No checks configured");
    }

    for check in &config.checks {
        let http_check = HttpCheck::new(check)
            .with_context(|| format!("Failed to build check [{}]", check.name))?;
        registry.register(check.name.clone(), http_check)?;
    }

    Ok(())
}

fn start_introspection_server(
    config: &Config,
    directory: Arc<ServiceDirectory>,
    metrics: Arc<MetricsRegistry>,
) {
    let addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
    let handler = IntrospectionHandler::new(directory).with_metrics(metrics, &config.metrics.path);

    tokio::spawn(async move {
        if let Err(e) = ServerBuilder::new(addr).with_handler(handler).serve().await {
            error!("Introspection server error: {:#}", e);
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
