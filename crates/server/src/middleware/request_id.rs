//! Request correlation ids

use axum::{body::Body, extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

const MAX_LEN: usize = 128;

/// Request id stored in request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accept a caller-supplied id if it is short and printable
fn accept(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_LEN {
        return None;
    }
    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return None;
    }
    Some(value.to_string())
}

/// Tag every request with an id and echo it on the response
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(accept)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
