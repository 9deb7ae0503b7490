//! HTTP request handlers
//!
//! Handlers translate HTTP requests to dispatcher calls and dispatch outcomes to
//! HTTP responses. The webhook body is read as raw bytes because the signature
//! covers the exact payload GitHub sent.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use branch_sentry_core::{
    events::{DELIVERY_HEADER, EVENT_TYPE_HEADER},
    signature::{SIGNATURE_256_HEADER, SIGNATURE_SHA1_HEADER},
    WebhookRequest,
};
use prometheus::{Encoder, TextEncoder};

use crate::{
    errors::{ApiError, Delivered},
    models::response::{HealthCheckResponse, ProtectionResponse},
    routes::MAX_PAYLOAD_BYTES,
    AppState, IGNORED_HEADER,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// POST /webhook
///
/// Runs one GitHub delivery through the protection pipeline.
///
/// Returns 200 with a [`ProtectionResponse`] when protection was added, 204 when the
/// delivery was ignored and an [`ApiError`] otherwise.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| ApiError::from_body_rejection(e, MAX_PAYLOAD_BYTES))?;
    let request = WebhookRequest {
        event_type: header_str(&headers, EVENT_TYPE_HEADER),
        delivery_id: header_str(&headers, DELIVERY_HEADER),
        signature_256: header_str(&headers, SIGNATURE_256_HEADER),
        signature_sha1: header_str(&headers, SIGNATURE_SHA1_HEADER),
        body: &body,
    };

    let outcome = state.dispatcher.dispatch(request).await;

    match ApiError::from_outcome(outcome)? {
        Delivered::Protected {
            repository,
            branches,
            issues,
        } => Ok((
            StatusCode::OK,
            Json(ProtectionResponse::new(&repository, branches, &issues)),
        )
            .into_response()),
        Delivered::Ignored(message) => {
            let mut response = StatusCode::NO_CONTENT.into_response();
            // Messages echo event fields; skip the header if they are not valid header text.
            if let Ok(value) = HeaderValue::from_str(&message) {
                response.headers_mut().insert(IGNORED_HEADER, value);
            }
            Ok(response)
        }
    }
}

/// GET /health
///
/// Health check endpoint.
///
/// Returns service health status with version and timestamp.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /metrics
///
/// Renders the registry in the Prometheus text exposition format.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ApiError::Internal {
            reason: format!("failed to encode metrics: {e}"),
        })?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}

/// Fallback for paths without a route.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound {
        path: uri.path().to_string(),
    }
}

/// Fallback for routes called with a method they do not serve.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
