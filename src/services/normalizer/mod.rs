// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-provider metric normalization.
//!
//! Searches a provider payload for each canonical metric using the mapping
//! table. Every function here is pure and total: an absent or non-numeric
//! field yields `None`, never an error.

pub mod path;

use serde_json::Value;

use crate::models::metric::{MetricCategory, MetricDescriptor, NormalizedMetricRecord};
use crate::services::mapping::{MetricMappingTable, UnifiedMetricMapping};

/// Extract one canonical metric from `payload`.
///
/// Candidate paths are tried in priority order and the first one holding a
/// JSON number wins. Numbers encoded as strings count as absent.
pub fn extract(payload: &Value, mapping: &UnifiedMetricMapping) -> Option<f64> {
    let raw = mapping
        .source_field_paths
        .iter()
        .find_map(|path| path.resolve(payload).and_then(Value::as_f64))?;

    let value = match mapping.transformer {
        Some(transform) => transform.apply(raw),
        None => raw,
    };

    value.is_finite().then_some(value)
}

/// Extract one metric, keeping the mapping's name, unit and category.
pub fn normalize(payload: &Value, mapping: &UnifiedMetricMapping) -> NormalizedMetricRecord {
    NormalizedMetricRecord {
        key: mapping.key,
        name: mapping.canonical_name,
        value: extract(payload, mapping),
        unit: mapping.unit,
        category: mapping.category,
    }
}

/// Extract every metric in `categories` that is present in `payload`.
pub fn extract_all(
    payload: &Value,
    table: &MetricMappingTable,
    categories: &[MetricCategory],
) -> Vec<NormalizedMetricRecord> {
    table
        .iter()
        .filter(|mapping| categories.contains(&mapping.category))
        .map(|mapping| normalize(payload, mapping))
        .filter(|record| record.value.is_some())
        .collect()
}

/// Find the canonical metric a bare provider field name belongs to.
///
/// Matches a source path equal to the name or ending in `.<name>`; the
/// first mapping in table order wins.
pub fn reverse_lookup(
    provider_field_name: &str,
    table: &MetricMappingTable,
) -> Option<MetricDescriptor> {
    table
        .iter()
        .find(|mapping| {
            mapping
                .source_field_paths
                .iter()
                .any(|path| path.names_field(provider_field_name))
        })
        .map(UnifiedMetricMapping::descriptor)
}
