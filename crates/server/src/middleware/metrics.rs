//! Prometheus request metrics
//!
//! Every request increments `http_requests_total` and records
//! `http_request_duration_seconds`. The `path` label is the route template
//! (`/conversations/{id}`), so ids never become label values. Requests that
//! match no route share the `unmatched` label.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Label for requests no route matched
pub const UNMATCHED_ROUTE: &str = "unmatched";

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Handle to the process-wide Prometheus recorder, installed on first use.
///
/// If another recorder is already installed the handle renders nothing.
pub fn prometheus_handle() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("A metrics recorder is already installed; /metrics will be empty");
            }
            handle
        })
        .clone()
}

fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Record request count and latency per method, route and status
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = route_label(request.extensions().get::<MatchedPath>());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(elapsed);

    response
}
