// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only views of the metric mapping table.

use crate::error::{AppError, Result};
use crate::models::{MetricCategory, MetricDescriptor};
use crate::services::normalizer::reverse_lookup;
use crate::services::{Transform, UnifiedMetricMapping};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metrics/mappings", get(list_mappings))
        .route("/metrics/lookup/{field}", get(lookup_field))
}

/// One mapping as exposed to dashboards.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MappingView {
    pub key: String,
    pub name: String,
    pub unit: String,
    pub category: MetricCategory,
    pub source_field_paths: Vec<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub transformer: Option<Transform>,
}

impl From<&UnifiedMetricMapping> for MappingView {
    fn from(mapping: &UnifiedMetricMapping) -> Self {
        Self {
            key: mapping.key.to_string(),
            name: mapping.canonical_name.to_string(),
            unit: mapping.unit.to_string(),
            category: mapping.category,
            source_field_paths: mapping
                .source_field_paths
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            transformer: mapping.transformer,
        }
    }
}

/// List every canonical metric, in table order.
async fn list_mappings(State(state): State<Arc<AppState>>) -> Json<Vec<MappingView>> {
    Json(state.mappings.iter().map(MappingView::from).collect())
}

/// Map a bare provider field name to its canonical metric.
async fn lookup_field(
    State(state): State<Arc<AppState>>,
    Path(field): Path<String>,
) -> Result<Json<MetricDescriptor>> {
    reverse_lookup(&field, &state.mappings)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No metric maps field {}", field)))
}
