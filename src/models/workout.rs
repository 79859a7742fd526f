// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout model built from `activity` notifications.

use serde::{Deserialize, Serialize};

use crate::models::metric::composite_document_id;

/// Stored workout record.
///
/// Upserted by `(user_id, external_id)` so redelivered activities replace
/// the previous copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Application user ID
    pub user_id: String,
    /// Provider-side summary ID
    pub external_id: String,
    /// Upstream device provider
    pub provider: String,
    /// Human-readable name, if the provider has one
    pub name: Option<String>,
    /// Provider activity type code
    pub activity_type: Option<i64>,
    /// Start time (ISO 8601)
    pub start_time: Option<String>,
    /// End time (ISO 8601)
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub calories: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub strain: Option<f64>,
    /// When this record was written (ISO 8601)
    pub recorded_at: String,
}

impl WorkoutRecord {
    pub fn document_id(&self) -> String {
        composite_document_id(&[self.user_id.as_str(), self.external_id.as_str()])
    }
}
