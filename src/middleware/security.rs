// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response hardening for a JSON-only API carrying health data.

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Headers stamped on every response. `frame-ancestors` also covers framing.
pub const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'none'; frame-ancestors 'none'",
    ),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
    (header::CACHE_CONTROL, "no-store"),
    (header::REFERRER_POLICY, "no-referrer"),
];

pub async fn add_security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::body::Body;
    use axum::{routing::get, Router};
    use tower::ServiceExt; // for oneshot

    #[tokio::test]
    async fn test_error_responses_are_hardened() {
        let app = Router::new()
            .route(
                "/",
                get(|| async { Err::<(), _>(AppError::NotFound("x".to_string())) }),
            )
            .layer(axum::middleware::from_fn(add_security_headers));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(headers.get(&name).unwrap(), value, "{}", name);
        }
        assert!(headers.get("X-Frame-Options").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
    }
}
