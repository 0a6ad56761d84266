//! Global request rate limiting

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::InMemoryState};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::ErrorBody;

/// Rate limiter state (shared across requests)
pub type SharedRateLimiter =
    Arc<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>>;

/// Create a limiter allowing `requests_per_second` (at least one)
pub fn create_rate_limiter(requests_per_second: u32) -> SharedRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Reject requests over quota with 429
pub async fn rate_limit_middleware(request: Request<Body>, next: Next) -> Response {
    let limiter = request.extensions().get::<SharedRateLimiter>().cloned();

    if let Some(limiter) = limiter {
        if limiter.check().is_err() {
            metrics::counter!("rate_limited_requests_total").increment(1);
            let body = ErrorBody::new(
                "throttled",
                "Rate limit exceeded. Please try again later.",
            );
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}
