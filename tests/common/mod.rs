// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use pulse_ingest::config::{Config, TERRA_SIGNATURE_HEADER};
use pulse_ingest::db::FirestoreDb;
use pulse_ingest::routes::create_router;
use pulse_ingest::services::signature::sign;
use pulse_ingest::AppState;
use std::sync::Arc;

/// Secret matching `Config::test_default()`.
#[allow(dead_code)]
pub const TEST_SECRET: &str = "test_webhook_secret";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::with_memory_store(Config::test_default()).expect("standard mappings build"),
    );
    (create_router(state.clone()), state)
}

/// Build a Terra delivery signed with the test secret.
#[allow(dead_code)]
pub fn signed_webhook(body: &str) -> Request<Body> {
    let header = sign(body.as_bytes(), chrono::Utc::now().timestamp(), TEST_SECRET)
        .expect("HMAC accepts any key length");
    webhook_with_header(body, &header)
}

/// Build a Terra delivery with an arbitrary signature header.
#[allow(dead_code)]
pub fn webhook_with_header(body: &str, header: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/terra")
        .header("content-type", "application/json")
        .header(TERRA_SIGNATURE_HEADER, header)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
