// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook signature middleware.

use crate::config::TERRA_SIGNATURE_HEADER;
use crate::error::AppError;
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Largest webhook body accepted (1 MiB).
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

/// Middleware that rejects deliveries whose signature does not match.
///
/// Buffers the body so the MAC is computed over the exact bytes received,
/// then hands the same bytes to the handler. Nothing is parsed before the
/// signature checks out. Bodies over [`MAX_WEBHOOK_BODY_BYTES`] get a 413.
pub async fn require_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|len| len.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_WEBHOOK_BODY_BYTES) {
        tracing::warn!(bytes = declared, "Rejected oversized webhook delivery");
        return Err(AppError::PayloadTooLarge);
    }

    // Chunked bodies carry no length; the limit trips while reading
    let bytes = to_bytes(body, MAX_WEBHOOK_BODY_BYTES).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to buffer webhook body");
        AppError::PayloadTooLarge
    })?;

    let header = parts
        .headers
        .get(TERRA_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !state.verifier.verify(&bytes, header) {
        tracing::warn!(
            provider = state.verifier.provider(),
            path = %parts.uri.path(),
            bytes = bytes.len(),
            "Rejected webhook delivery"
        );
        return Err(AppError::InvalidSignature);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::signature::sign;
    use axum::{body::Bytes, http::StatusCode, routing::post, Router};
    use tower::ServiceExt; // for oneshot

    fn app() -> Router {
        let state = Arc::new(AppState::with_memory_store(Config::test_default()).unwrap());
        Router::new()
            .route("/hook", post(|body: Bytes| async move { body }))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_signature,
            ))
            .with_state(state)
    }

    fn request(body: &'static str, header: Option<&str>) -> Request {
        let mut builder = Request::builder().method("POST").uri("/hook");
        if let Some(h) = header {
            builder = builder.header(TERRA_SIGNATURE_HEADER, h);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_signature_passes_body_through() {
        let body = r#"{"type":"healthcheck"}"#;
        let header = sign(body.as_bytes(), 1_700_000_000, "test_webhook_secret").unwrap();

        let response = app().oneshot(request(body, Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let echoed = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&echoed[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let response = app()
            .oneshot(request(r#"{"type":"healthcheck"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let body = vec![b' '; MAX_WEBHOOK_BODY_BYTES + 1];
        let header = sign(&body, 1_700_000_000, "test_webhook_secret").unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/hook")
            .header(TERRA_SIGNATURE_HEADER, header)
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"error":"payload_too_large"}"#);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/hook")
            .header(CONTENT_LENGTH, MAX_WEBHOOK_BODY_BYTES + 1)
            .body(Body::from(r#"{"type":"healthcheck"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let body = r#"{"type":"healthcheck"}"#;
        let header = sign(body.as_bytes(), 1_700_000_000, "other_secret").unwrap();

        let response = app().oneshot(request(body, Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
