//! Request tracing middleware

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;

/// Header carrying the request ID back to the caller.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request tracing middleware.
///
/// Assigns a request ID, logs the start and end of each request and echoes the ID
/// in the `x-request-id` response header so a delivery can be matched to its logs.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        delivery_id = request
            .headers()
            .get(branch_sentry_core::events::DELIVERY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-"),
        "Request started"
    );

    let mut response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        status = %response.status(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
