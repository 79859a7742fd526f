// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed upsert operations.
//!
//! Provides high-level operations for:
//! - Health metrics (daily canonical metric rows)
//! - Workouts (activity summaries)
//! - Wearable connections and athlete profiles
//!
//! Every write is an upsert keyed by a deterministic document ID, so
//! redelivered webhooks overwrite instead of duplicating.

use crate::db::collections;
use crate::error::AppError;
use crate::models::metric::composite_document_id;
use crate::models::{AthleteProfile, MetricRecord, ProviderConnection, WorkoutRecord};
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Database client backed by Firestore, or by process memory for local runs.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Documents keyed by `(collection, document_id)`.
#[derive(Default)]
struct MemoryStore {
    documents: DashMap<(&'static str, String), serde_json::Value>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any token; skip credential discovery entirely
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory store (local development and tests).
    ///
    /// Contents live as long as the last clone of this handle.
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    // ─── Generic Document Operations ─────────────────────────────

    async fn upsert_document<T>(
        &self,
        collection: &'static str,
        document_id: &str,
        object: &T,
    ) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(document_id)
                    .object(object)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                let value = serde_json::to_value(object)
                    .map_err(|e| AppError::Database(e.to_string()))?;
                store
                    .documents
                    .insert((collection, document_id.to_string()), value);
            }
        }
        Ok(())
    }

    async fn get_document<T>(
        &self,
        collection: &'static str,
        document_id: &str,
    ) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<T>()
                .one(document_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .documents
                .get(&(collection, document_id.to_string()))
                .map(|entry| serde_json::from_value(entry.value().clone()))
                .transpose()
                .map_err(|e| AppError::Database(e.to_string())),
        }
    }

    /// Upsert many documents with bounded concurrency.
    ///
    /// Callers pass records with distinct document IDs; two writes to the
    /// same ID would race.
    async fn upsert_many<T, F>(
        &self,
        collection: &'static str,
        objects: &[T],
        document_id: F,
    ) -> Result<usize, AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
        F: Fn(&T) -> String,
    {
        let writes: Vec<_> = objects
            .iter()
            .map(|object| {
                let id = document_id(object);
                async move { self.upsert_document(collection, &id, object).await }
            })
            .collect();

        stream::iter(writes)
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(objects.len())
    }

    // ─── Health Metric Operations ────────────────────────────────

    /// Upsert metric rows keyed by `(user_id, measurement_date, metric)`.
    pub async fn upsert_metrics(&self, records: &[MetricRecord]) -> Result<usize, AppError> {
        self.upsert_many(collections::HEALTH_METRICS, records, MetricRecord::document_id)
            .await
    }

    /// Get one metric row.
    pub async fn get_metric(
        &self,
        user_id: &str,
        measurement_date: &str,
        metric_key: &str,
    ) -> Result<Option<MetricRecord>, AppError> {
        let document_id = composite_document_id(&[user_id, measurement_date, metric_key]);
        self.get_document(collections::HEALTH_METRICS, &document_id)
            .await
    }

    /// All metric rows for a user.
    pub async fn get_metrics_for_user(&self, user_id: &str) -> Result<Vec<MetricRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::HEALTH_METRICS)
                .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
                .order_by([(
                    "measurement_date",
                    firestore::FirestoreQueryDirection::Descending,
                )])
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => {
                let mut records = store
                    .documents
                    .iter()
                    .filter(|entry| entry.key().0 == collections::HEALTH_METRICS)
                    .filter_map(|entry| {
                        serde_json::from_value::<MetricRecord>(entry.value().clone()).ok()
                    })
                    .filter(|record| record.user_id == user_id)
                    .collect::<Vec<_>>();
                records.sort_by(|a, b| b.measurement_date.cmp(&a.measurement_date));
                Ok(records)
            }
        }
    }

    // ─── Workout Operations ──────────────────────────────────────

    /// Upsert workouts keyed by `(user_id, external_id)`.
    pub async fn upsert_workouts(&self, workouts: &[WorkoutRecord]) -> Result<usize, AppError> {
        self.upsert_many(collections::WORKOUTS, workouts, WorkoutRecord::document_id)
            .await
    }

    pub async fn get_workout(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<WorkoutRecord>, AppError> {
        let document_id = composite_document_id(&[user_id, external_id]);
        self.get_document(collections::WORKOUTS, &document_id).await
    }

    // ─── Connection Operations ───────────────────────────────────

    pub async fn upsert_connection(&self, connection: &ProviderConnection) -> Result<(), AppError> {
        self.upsert_document(
            collections::WEARABLE_CONNECTIONS,
            &connection.document_id(),
            connection,
        )
        .await
    }

    pub async fn get_connection(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderConnection>, AppError> {
        let document_id = composite_document_id(&[user_id, provider]);
        self.get_document(collections::WEARABLE_CONNECTIONS, &document_id)
            .await
    }

    // ─── Athlete Profile Operations ──────────────────────────────

    pub async fn upsert_athlete(&self, profile: &AthleteProfile) -> Result<(), AppError> {
        self.upsert_document(collections::ATHLETE_PROFILES, &profile.document_id(), profile)
            .await
    }

    pub async fn get_athlete(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<AthleteProfile>, AppError> {
        let document_id = composite_document_id(&[user_id, provider]);
        self.get_document(collections::ATHLETE_PROFILES, &document_id)
            .await
    }
}
