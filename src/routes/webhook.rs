// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Terra events.

use crate::config::TERRA_SIGNATURE_HEADER;
use crate::error::Result;
use crate::middleware::require_signature;
use crate::models::{PayloadType, WebhookEnvelope};
use crate::services::IngestOutcome;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::HeaderMap,
    middleware,
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Webhook routes. Every route here sits behind signature verification.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/terra", post(handle_event))
        .route_layer(middleware::from_fn_with_state(state, require_signature))
}

/// Acknowledgement returned to the sender.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WebhookAck {
    pub success: bool,
    /// Records upserted, omitted when the event was ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

/// Handle an authenticated Terra delivery (POST).
///
/// Store failures surface as 5xx so Terra redelivers; every write is an
/// upsert, so a redelivery cannot duplicate rows.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature_header = headers
        .get(TERRA_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let envelope = WebhookEnvelope::parse(body, signature_header)?;

    if envelope.payload_type == PayloadType::Healthcheck {
        tracing::debug!("Terra healthcheck received");
        return Ok(Json(WebhookAck {
            success: true,
            records: None,
        }));
    }

    let user = envelope.user();
    tracing::info!(
        payload_type = %envelope.payload_type,
        provider = user.provider_name(),
        bytes = envelope.raw_body.len(),
        "Webhook event received"
    );

    let outcome = state
        .ingest_service
        .ingest(&envelope)
        .await
        .inspect_err(|e| {
            if e.is_retryable() {
                tracing::warn!(
                    payload_type = %envelope.payload_type,
                    error = %e,
                    "Ingest failed, sender will redeliver"
                );
            }
        })?;

    let records = match outcome {
        IngestOutcome::Ignored => None,
        IngestOutcome::Stored(n) => Some(n),
    };

    Ok(Json(WebhookAck {
        success: true,
        records,
    }))
}
