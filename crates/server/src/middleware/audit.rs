//! Audit log for state-changing requests

use axum::{body::Body, extract::Request, http::Method, middleware::Next, response::Response};
use std::time::Instant;

use super::request_id::RequestId;

fn is_mutation(method: &Method) -> bool {
    matches!(method, &Method::POST | &Method::PUT | &Method::DELETE)
}

/// Log chat turns, conversation changes and identity resets under the `audit` target
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    if !is_mutation(request.method()) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        target: "audit",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Mutation request"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_writes_are_audited() {
        assert!(is_mutation(&Method::POST));
        assert!(is_mutation(&Method::DELETE));
        assert!(!is_mutation(&Method::GET));
        assert!(!is_mutation(&Method::OPTIONS));
    }
}
