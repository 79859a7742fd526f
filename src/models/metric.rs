// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical metric vocabulary and stored metric rows.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Grouping of canonical metrics, used by dashboards and payload scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MetricCategory {
    Recovery,
    Sleep,
    Cardiovascular,
    Respiratory,
    Activity,
    Body,
    Metabolic,
    Wellness,
    Nutrition,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Recovery => "recovery",
            MetricCategory::Sleep => "sleep",
            MetricCategory::Cardiovascular => "cardiovascular",
            MetricCategory::Respiratory => "respiratory",
            MetricCategory::Activity => "activity",
            MetricCategory::Body => "body",
            MetricCategory::Metabolic => "metabolic",
            MetricCategory::Wellness => "wellness",
            MetricCategory::Nutrition => "nutrition",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, unit and category of a canonical metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MetricDescriptor {
    pub name: String,
    pub unit: String,
    pub category: MetricCategory,
}

/// Result of extracting one canonical metric from a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetricRecord {
    /// Stable mapping key (e.g. `sleep_duration`)
    pub key: &'static str,
    /// Canonical name (e.g. "Sleep Duration")
    pub name: &'static str,
    /// `None` if no candidate path held a number
    pub value: Option<f64>,
    pub unit: &'static str,
    pub category: MetricCategory,
}

/// Stored metric row.
///
/// Upserted by `(user_id, measurement_date, metric)`. The document ID uses
/// the mapping key, which is one-to-one with the canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Application user ID
    pub user_id: String,
    /// Day the measurement belongs to ("YYYY-MM-DD")
    pub measurement_date: String,
    /// Canonical metric name
    pub metric_name: String,
    /// Stable mapping key
    pub metric_key: String,
    pub value: f64,
    pub unit: String,
    pub category: MetricCategory,
    /// Upstream device provider (e.g. "WHOOP")
    pub provider: String,
    /// Payload type the value came from
    pub payload_type: String,
    /// When this row was written (ISO 8601)
    pub recorded_at: String,
}

impl MetricRecord {
    /// Document ID encoding the upsert key.
    pub fn document_id(&self) -> String {
        composite_document_id(&[
            self.user_id.as_str(),
            self.measurement_date.as_str(),
            self.metric_key.as_str(),
        ])
    }
}

/// Firestore document ID for a record keyed by several values.
///
/// Each component is percent-encoded, so `:` only ever appears as the
/// separator and `/` never reaches Firestore.
pub fn composite_document_id(components: &[&str]) -> String {
    components
        .iter()
        .map(|c| urlencoding::encode(c))
        .collect::<Vec<_>>()
        .join(":")
}
