// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbound webhook envelope.

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::AppError;
use crate::models::metric::MetricCategory;

/// Category of a webhook notification, taken from the top-level `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PayloadType {
    Auth,
    Activity,
    Body,
    Daily,
    Sleep,
    Nutrition,
    Athlete,
    Healthcheck,
    /// Event kinds we do not handle (yet). Acknowledged and ignored.
    Unknown(String),
}

impl PayloadType {
    pub fn as_str(&self) -> &str {
        match self {
            PayloadType::Auth => "auth",
            PayloadType::Activity => "activity",
            PayloadType::Body => "body",
            PayloadType::Daily => "daily",
            PayloadType::Sleep => "sleep",
            PayloadType::Nutrition => "nutrition",
            PayloadType::Athlete => "athlete",
            PayloadType::Healthcheck => "healthcheck",
            PayloadType::Unknown(s) => s,
        }
    }

    /// Metric categories extracted as daily metric rows for this payload type.
    ///
    /// Scoping keeps e.g. the in-sleep heart rate of a sleep payload from
    /// overwriting the day's heart rate reported by a daily payload.
    pub fn metric_categories(&self) -> &'static [MetricCategory] {
        use MetricCategory::*;
        match self {
            PayloadType::Sleep => &[Sleep, Recovery, Respiratory],
            PayloadType::Daily => &[Activity, Cardiovascular, Wellness],
            PayloadType::Body => &[Body, Cardiovascular, Metabolic],
            PayloadType::Nutrition => &[Nutrition],
            _ => &[],
        }
    }
}

impl From<&str> for PayloadType {
    fn from(s: &str) -> Self {
        match s {
            "auth" => PayloadType::Auth,
            "activity" => PayloadType::Activity,
            "body" => PayloadType::Body,
            "daily" => PayloadType::Daily,
            "sleep" => PayloadType::Sleep,
            "nutrition" => PayloadType::Nutrition,
            "athlete" => PayloadType::Athlete,
            "healthcheck" => PayloadType::Healthcheck,
            other => PayloadType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terra user block present on most notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerraUser {
    /// Terra's internal user ID
    pub user_id: Option<String>,
    /// Upstream provider (e.g. "WHOOP", "WITHINGS", "GARMIN")
    pub provider: Option<String>,
    /// Our own user ID, passed to Terra when the connection was created
    pub reference_id: Option<String>,
}

impl TerraUser {
    /// The application user this notification belongs to.
    ///
    /// Prefers our own reference ID and falls back to Terra's user ID.
    pub fn app_user_id(&self) -> Option<&str> {
        self.reference_id
            .as_deref()
            .or(self.user_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or("unknown")
    }
}

/// One inbound provider notification, created per request.
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    /// Exact bytes received. Signatures are computed over these.
    pub raw_body: Bytes,
    /// `t=<timestamp>,v1=<hex>` header value
    pub signature_header: String,
    pub payload_type: PayloadType,
    /// Parsed body
    pub payload: Value,
}

impl WebhookEnvelope {
    /// Parse an already authenticated body.
    pub fn parse(raw_body: Bytes, signature_header: String) -> Result<Self, AppError> {
        let payload: Value = serde_json::from_slice(&raw_body)
            .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {}", e)))?;

        let payload_type = payload
            .get("type")
            .and_then(Value::as_str)
            .map(PayloadType::from)
            .ok_or_else(|| AppError::BadRequest("Missing payload type".to_string()))?;

        Ok(Self {
            raw_body,
            signature_header,
            payload_type,
            payload,
        })
    }

    /// The `user` block, if present and well formed.
    pub fn user(&self) -> TerraUser {
        self.payload
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value(u).ok())
            .unwrap_or_default()
    }

    /// Data items carried by the notification.
    ///
    /// Terra sends a `data` array; some providers post a single object or a
    /// flat payload with the metrics at the top level.
    pub fn data_items(&self) -> Vec<&Value> {
        match self.payload.get("data") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(item @ Value::Object(_)) => vec![item],
            _ => vec![&self.payload],
        }
    }
}
