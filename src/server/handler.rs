// src/server/handler.rs
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use crate::export::ServiceDirectory;
use crate::metrics::MetricsRegistry;

/// Serves Prometheus metrics and service snapshots.
#[derive(Clone)]
pub struct IntrospectionHandler {
    directory: Arc<ServiceDirectory>,
    metrics: Option<Arc<MetricsRegistry>>,
    metrics_path: Arc<str>,
}

impl IntrospectionHandler {
    pub fn new(directory: Arc<ServiceDirectory>) -> Self {
        Self {
            directory,
            metrics: None,
            metrics_path: Arc::from("/metrics"),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>, path: &str) -> Self {
        self.metrics = Some(metrics);
        self.metrics_path = Arc::from(path);
        self
    }

    fn route(&self, req: &Request<Body>) -> Response<Body> {
        if *req.method() != Method::GET {
            return respond(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "Method Not Allowed");
        }

        let path = req.uri().path();
        if path == "/services" {
            return match serde_json::to_vec(&self.directory.snapshots()) {
                Ok(body) => respond(StatusCode::OK, "application/json", body),
                Err(e) => {
                    tracing::error!(%e, "failed to encode service snapshots");
                    respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "Internal Server Error")
                }
            };
        }

        match &self.metrics {
            Some(metrics) if path == &*self.metrics_path => match metrics.gather() {
                Ok(body) => respond(StatusCode::OK, "text/plain; version=0.0.4", body),
                Err(e) => {
                    tracing::error!(%e, "failed to encode metrics");
                    respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "Internal Server Error")
                }
            },
            _ => respond(StatusCode::NOT_FOUND, "text/plain", "Not Found"),
        }
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl Service<Request<Body>> for IntrospectionHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        futures::future::ready(Ok(self.route(&req)))
    }
}
