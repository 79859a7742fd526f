// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ingest;
pub mod mapping;
pub mod normalizer;
pub mod signature;

pub use ingest::{IngestOutcome, IngestService};
pub use mapping::{MappingError, MetricMappingTable, Transform, UnifiedMetricMapping};
pub use signature::SignatureVerifier;
