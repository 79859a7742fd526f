// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod connection;
pub mod envelope;
pub mod metric;
pub mod workout;

pub use connection::{AthleteProfile, ProviderConnection};
pub use envelope::{PayloadType, TerraUser, WebhookEnvelope};
pub use metric::{MetricCategory, MetricDescriptor, MetricRecord, NormalizedMetricRecord};
pub use workout::WorkoutRecord;
