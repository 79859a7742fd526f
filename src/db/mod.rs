// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Daily metric rows, keyed by user, date and metric
    pub const HEALTH_METRICS: &str = "health_metrics";
    /// Workouts, keyed by user and provider summary ID
    pub const WORKOUTS: &str = "workouts";
    /// Wearable connections, keyed by user and provider
    pub const WEARABLE_CONNECTIONS: &str = "wearable_connections";
    /// Athlete profiles, keyed by user and provider
    pub const ATHLETE_PROFILES: &str = "athlete_profiles";
}
