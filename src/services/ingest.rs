// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook ingestion service.
//!
//! Turns an authenticated webhook envelope into stored records:
//! 1. Resolve the application user the notification belongs to
//! 2. Normalize each data item against the mapping table
//! 3. Upsert the canonical records

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{
    AthleteProfile, MetricRecord, PayloadType, ProviderConnection, WebhookEnvelope, WorkoutRecord,
};
use crate::services::mapping::MetricMappingTable;
use crate::services::normalizer::path::lookup;
use crate::services::normalizer::{extract, extract_all};
use crate::time_utils::{format_utc_rfc3339, measurement_date, parse_calendar_date};

/// Fields that date a sleep session; the night belongs to the morning it ends.
const SLEEP_DATE_FIELDS: &[&str] = &["metadata.end_time", "metadata.start_time", "end", "date"];

/// Fields that date every other data item.
const DATE_FIELDS: &[&str] = &[
    "metadata.start_time",
    "metadata.end_time",
    "start",
    "date",
    "created_at",
];

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Acknowledged without storing anything
    Ignored,
    /// Number of records upserted
    Stored(usize),
}

/// Normalizes webhook payloads and writes them to the store.
#[derive(Clone)]
pub struct IngestService {
    db: FirestoreDb,
    mappings: Arc<MetricMappingTable>,
}

impl IngestService {
    pub fn new(db: FirestoreDb, mappings: Arc<MetricMappingTable>) -> Self {
        Self { db, mappings }
    }

    /// Process one authenticated notification.
    pub async fn ingest(&self, envelope: &WebhookEnvelope) -> Result<IngestOutcome> {
        let now = Utc::now();

        match &envelope.payload_type {
            PayloadType::Healthcheck => Ok(IngestOutcome::Ignored),
            PayloadType::Unknown(kind) => {
                tracing::info!(payload_type = %kind, "Ignoring unsupported payload type");
                Ok(IngestOutcome::Ignored)
            }
            PayloadType::Auth => self.record_connection(envelope, now).await,
            PayloadType::Athlete => self.record_athlete(envelope, now).await,
            PayloadType::Activity => {
                let Some(user_id) = resolve_user_id(envelope) else {
                    return Ok(ignore_anonymous(envelope));
                };
                let workouts = self.build_workouts(envelope, &user_id, now);
                let stored = self.db.upsert_workouts(&workouts).await?;
                tracing::info!(
                    user_id = %user_id,
                    workouts = stored,
                    "Stored workouts"
                );
                Ok(IngestOutcome::Stored(stored))
            }
            PayloadType::Body | PayloadType::Daily | PayloadType::Sleep | PayloadType::Nutrition => {
                let Some(user_id) = resolve_user_id(envelope) else {
                    return Ok(ignore_anonymous(envelope));
                };
                let records = self.build_metric_records(envelope, &user_id, now);
                let stored = self.db.upsert_metrics(&records).await?;
                tracing::info!(
                    user_id = %user_id,
                    payload_type = %envelope.payload_type,
                    items = envelope.data_items().len(),
                    metrics = stored,
                    "Stored metrics"
                );
                Ok(IngestOutcome::Stored(stored))
            }
        }
    }

    /// Build metric rows for every data item.
    ///
    /// Rows sharing an upsert key collapse to the last one, matching what
    /// sequential upserts would leave behind.
    pub fn build_metric_records(
        &self,
        envelope: &WebhookEnvelope,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<MetricRecord> {
        let categories = envelope.payload_type.metric_categories();
        let date_fields = match envelope.payload_type {
            PayloadType::Sleep => SLEEP_DATE_FIELDS,
            _ => DATE_FIELDS,
        };
        let provider = envelope.user().provider_name().to_string();
        let recorded_at = format_utc_rfc3339(now);

        let mut records = Vec::new();

        for item in envelope.data_items() {
            let date = measurement_date(item, date_fields, now);

            for metric in extract_all(item, &self.mappings, categories) {
                let Some(value) = metric.value else {
                    continue;
                };
                records.push(MetricRecord {
                    user_id: user_id.to_string(),
                    measurement_date: date.clone(),
                    metric_name: metric.name.to_string(),
                    metric_key: metric.key.to_string(),
                    value,
                    unit: metric.unit.to_string(),
                    category: metric.category,
                    provider: provider.clone(),
                    payload_type: envelope.payload_type.to_string(),
                    recorded_at: recorded_at.clone(),
                });
            }
        }

        keep_last_by(records, MetricRecord::document_id)
    }

    /// Build workout records from an `activity` notification.
    ///
    /// Items without a provider summary ID cannot be upserted and are skipped.
    /// Repeated summary IDs collapse to the last item.
    pub fn build_workouts(
        &self,
        envelope: &WebhookEnvelope,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<WorkoutRecord> {
        let provider = envelope.user().provider_name().to_string();
        let recorded_at = format_utc_rfc3339(now);
        let metric = |item: &Value, key: &str| {
            self.mappings
                .get(key)
                .and_then(|mapping| extract(item, mapping))
        };

        let workouts = envelope
            .data_items()
            .into_iter()
            .filter_map(|item| {
                let Some(external_id) = workout_external_id(item) else {
                    tracing::warn!(user_id = %user_id, "Skipping workout without summary ID");
                    return None;
                };

                Some(WorkoutRecord {
                    user_id: user_id.to_string(),
                    external_id,
                    provider: provider.clone(),
                    name: string_at(item, "metadata.name"),
                    activity_type: lookup(item, "metadata.type")
                        .or_else(|| lookup(item, "sport_id"))
                        .and_then(Value::as_i64),
                    start_time: string_at(item, "metadata.start_time")
                        .or_else(|| string_at(item, "start")),
                    end_time: string_at(item, "metadata.end_time")
                        .or_else(|| string_at(item, "end")),
                    duration_minutes: metric(item, "active_duration"),
                    distance_km: metric(item, "distance"),
                    calories: metric(item, "total_calories")
                        .or_else(|| metric(item, "active_calories"))
                        .or_else(|| metric(item, "energy_expenditure")),
                    avg_heart_rate: metric(item, "avg_heart_rate"),
                    max_heart_rate: metric(item, "max_heart_rate"),
                    strain: metric(item, "strain"),
                    recorded_at: recorded_at.clone(),
                })
            })
            .collect();

        keep_last_by(workouts, WorkoutRecord::document_id)
    }

    async fn record_connection(
        &self,
        envelope: &WebhookEnvelope,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let user = envelope.user();
        let Some(user_id) = resolve_user_id(envelope) else {
            return Ok(ignore_anonymous(envelope));
        };

        let connection = ProviderConnection {
            user_id,
            terra_user_id: user.user_id.clone(),
            provider: user.provider_name().to_string(),
            status: string_at(&envelope.payload, "status")
                .unwrap_or_else(|| "unknown".to_string()),
            message: string_at(&envelope.payload, "message"),
            updated_at: format_utc_rfc3339(now),
        };

        self.db.upsert_connection(&connection).await?;
        tracing::info!(
            user_id = %connection.user_id,
            provider = %connection.provider,
            status = %connection.status,
            "Wearable connection updated"
        );
        Ok(IngestOutcome::Stored(1))
    }

    async fn record_athlete(
        &self,
        envelope: &WebhookEnvelope,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let Some(user_id) = resolve_user_id(envelope) else {
            return Ok(ignore_anonymous(envelope));
        };

        let athlete = envelope
            .payload
            .get("athlete")
            .or_else(|| envelope.data_items().into_iter().next())
            .unwrap_or(&Value::Null);

        let profile = AthleteProfile {
            user_id,
            provider: envelope.user().provider_name().to_string(),
            first_name: string_at(athlete, "first_name"),
            last_name: string_at(athlete, "last_name"),
            sex: string_at(athlete, "sex").or_else(|| string_at(athlete, "gender")),
            date_of_birth: string_at(athlete, "date_of_birth")
                .and_then(|dob| parse_calendar_date(&dob))
                .map(|d| d.format("%Y-%m-%d").to_string()),
            updated_at: format_utc_rfc3339(now),
        };

        self.db.upsert_athlete(&profile).await?;
        tracing::info!(
            user_id = %profile.user_id,
            provider = %profile.provider,
            "Athlete profile updated"
        );
        Ok(IngestOutcome::Stored(1))
    }
}

/// Application user for a notification: the user block first, then a
/// top-level `reference_id` (sent on auth events).
fn resolve_user_id(envelope: &WebhookEnvelope) -> Option<String> {
    let user = envelope.user();
    user.reference_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            envelope
                .payload
                .get("reference_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
        })
        .or_else(|| user.app_user_id())
        .map(str::to_string)
}

fn ignore_anonymous(envelope: &WebhookEnvelope) -> IngestOutcome {
    tracing::warn!(
        payload_type = %envelope.payload_type,
        "Notification has no user reference, ignoring"
    );
    IngestOutcome::Ignored
}

/// Provider summary ID, accepting string or numeric IDs.
fn workout_external_id(item: &Value) -> Option<String> {
    let raw = lookup(item, "metadata.summary_id").or_else(|| lookup(item, "id"))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_at(value: &Value, path: &str) -> Option<String> {
    lookup(value, path)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Collapse records sharing a key to the last one, keeping first-seen order.
///
/// Sequential upserts of the same records would leave the same rows behind.
fn keep_last_by<T, F>(records: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut by_key: HashMap<String, T> = HashMap::new();
    let mut order = Vec::new();

    for record in records {
        let id = key(&record);
        if by_key.insert(id.clone(), record).is_none() {
            order.push(id);
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_key.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricCategory;
    use axum::body::Bytes;
    use chrono::TimeZone;
    use serde_json::json;

    fn service() -> IngestService {
        IngestService::new(
            FirestoreDb::new_memory(),
            Arc::new(MetricMappingTable::standard().unwrap()),
        )
    }

    fn envelope(body: Value) -> WebhookEnvelope {
        WebhookEnvelope::parse(Bytes::from(body.to_string()), String::new()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sleep_metrics_dated_by_end_time() {
        let env = envelope(json!({
            "type": "sleep",
            "user": {"user_id": "t-1", "provider": "OURA", "reference_id": "u-1"},
            "data": [{
                "metadata": {
                    "start_time": "2026-02-28T23:10:00+01:00",
                    "end_time": "2026-03-01T07:05:00+01:00"
                },
                "sleep_durations_data": {"asleep": {"duration_asleep_state_seconds": 27000}},
                "heart_rate_data": {"summary": {"avg_hr_bpm": 51}}
            }]
        }));

        let records = service().build_metric_records(&env, "u-1", now());
        let sleep = records
            .iter()
            .find(|r| r.metric_key == "sleep_duration")
            .unwrap();

        assert_eq!(sleep.value, 7.5);
        assert_eq!(sleep.unit, "hours");
        assert_eq!(sleep.category, MetricCategory::Sleep);
        assert_eq!(sleep.measurement_date, "2026-03-01");
        assert_eq!(sleep.provider, "OURA");
        assert_eq!(sleep.payload_type, "sleep");
        // Heart rate is not a sleep-scoped category
        assert!(!records.iter().any(|r| r.metric_key == "avg_heart_rate"));
    }

    #[test]
    fn test_flat_payload_uses_fallback_date() {
        let env = envelope(json!({
            "type": "sleep",
            "user": {"reference_id": "u-1"},
            "recovery_score": 87
        }));

        let records = service().build_metric_records(&env, "u-1", now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric_name, "Recovery Score");
        assert_eq!(records[0].value, 87.0);
        assert_eq!(records[0].measurement_date, "2026-03-02");
    }

    #[test]
    fn test_same_day_items_collapse_to_last() {
        let env = envelope(json!({
            "type": "body",
            "user": {"reference_id": "u-1"},
            "data": [
                {"metadata": {"start_time": "2026-03-01T07:00:00Z"}, "weight_kg": 80.1},
                {"metadata": {"start_time": "2026-03-01T19:00:00Z"}, "weight_kg": 80.7},
                {"metadata": {"start_time": "2026-03-02T07:00:00Z"}, "weight_kg": 79.9}
            ]
        }));

        let records = service().build_metric_records(&env, "u-1", now());
        let weights: Vec<(&str, f64)> = records
            .iter()
            .map(|r| (r.measurement_date.as_str(), r.value))
            .collect();
        assert_eq!(weights, vec![("2026-03-01", 80.7), ("2026-03-02", 79.9)]);
    }

    #[test]
    fn test_build_workouts() {
        let env = envelope(json!({
            "type": "activity",
            "user": {"reference_id": "u-1", "provider": "GARMIN"},
            "data": [
                {
                    "metadata": {
                        "summary_id": "run-77",
                        "name": "Morning Run",
                        "type": 8,
                        "start_time": "2026-03-01T06:00:00Z",
                        "end_time": "2026-03-01T06:45:00Z"
                    },
                    "active_durations_data": {"activity_seconds": 2700},
                    "distance_data": {"summary": {"distance_meters": 8123.0}},
                    "calories_data": {"total_burned_calories": 640},
                    "heart_rate_data": {"summary": {"avg_hr_bpm": 152, "max_hr_bpm": 181}}
                },
                {"metadata": {"name": "No id"}}
            ]
        }));

        let workouts = service().build_workouts(&env, "u-1", now());
        assert_eq!(workouts.len(), 1);

        let run = &workouts[0];
        assert_eq!(run.external_id, "run-77");
        assert_eq!(run.provider, "GARMIN");
        assert_eq!(run.name.as_deref(), Some("Morning Run"));
        assert_eq!(run.activity_type, Some(8));
        assert_eq!(run.duration_minutes, Some(45.0));
        assert_eq!(run.distance_km, Some(8.12));
        assert_eq!(run.calories, Some(640.0));
        assert_eq!(run.avg_heart_rate, Some(152.0));
        assert_eq!(run.max_heart_rate, Some(181.0));
        assert_eq!(run.strain, None);
    }

    #[test]
    fn test_whoop_style_workout() {
        let env = envelope(json!({
            "type": "activity",
            "user": {"reference_id": "u-1", "provider": "WHOOP"},
            "data": {
                "id": 1043,
                "sport_id": 1,
                "start": "2026-03-01T17:00:00Z",
                "score": {"strain": 13.4, "kilojoule": 2092.0, "average_heart_rate": 140}
            }
        }));

        let workouts = service().build_workouts(&env, "u-1", now());
        assert_eq!(workouts[0].external_id, "1043");
        assert_eq!(workouts[0].activity_type, Some(1));
        assert_eq!(workouts[0].start_time.as_deref(), Some("2026-03-01T17:00:00Z"));
        assert_eq!(workouts[0].strain, Some(13.4));
        assert_eq!(workouts[0].calories, Some(500.0));
        assert_eq!(workouts[0].avg_heart_rate, Some(140.0));
    }

    #[tokio::test]
    async fn test_repeated_summary_id_collapses_to_last() {
        let service = service();
        let env = envelope(json!({
            "type": "activity",
            "user": {"reference_id": "u-1", "provider": "GARMIN"},
            "data": [
                {"metadata": {"summary_id": "run-1", "name": "first"}},
                {"metadata": {"summary_id": "ride-2", "name": "ride"}},
                {"metadata": {"summary_id": "run-1", "name": "second"}}
            ]
        }));

        let workouts = service.build_workouts(&env, "u-1", now());
        let names: Vec<_> = workouts
            .iter()
            .map(|w| (w.external_id.as_str(), w.name.as_deref()))
            .collect();
        assert_eq!(names, vec![("run-1", Some("second")), ("ride-2", Some("ride"))]);

        assert_eq!(service.ingest(&env).await.unwrap(), IngestOutcome::Stored(2));
        let stored = service.db.get_workout("u-1", "run-1").await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("second"));
    }

    #[test]
    fn test_resolve_user_id_order() {
        let env = envelope(json!({
            "type": "auth",
            "user": {"user_id": "terra-9"},
            "reference_id": "app-9"
        }));
        assert_eq!(resolve_user_id(&env).as_deref(), Some("app-9"));

        let env = envelope(json!({"type": "auth", "user": {"user_id": "terra-9"}}));
        assert_eq!(resolve_user_id(&env).as_deref(), Some("terra-9"));

        let env = envelope(json!({"type": "auth"}));
        assert_eq!(resolve_user_id(&env), None);
    }

    #[tokio::test]
    async fn test_ingest_ignores_healthcheck_and_unknown() {
        let service = service();
        let outcome = service
            .ingest(&envelope(json!({"type": "healthcheck"})))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);

        let outcome = service
            .ingest(&envelope(json!({"type": "menstruation", "user": {"reference_id": "u"}})))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_ingest_without_user_is_ignored() {
        let outcome = service()
            .ingest(&envelope(json!({"type": "sleep", "data": [{"duration_seconds": 100}]})))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_ingest_auth_and_athlete() {
        let service = service();

        let outcome = service
            .ingest(&envelope(json!({
                "type": "auth",
                "status": "success",
                "user": {"user_id": "terra-1", "provider": "WITHINGS", "reference_id": "u-1"}
            })))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Stored(1));

        let connection = service
            .db
            .get_connection("u-1", "WITHINGS")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connection.status, "success");
        assert_eq!(connection.terra_user_id.as_deref(), Some("terra-1"));

        service
            .ingest(&envelope(json!({
                "type": "athlete",
                "user": {"user_id": "terra-1", "provider": "WITHINGS", "reference_id": "u-1"},
                "athlete": {
                    "first_name": "Sam",
                    "gender": "female",
                    "date_of_birth": "1990-05-04T00:00:00+00:00"
                }
            })))
            .await
            .unwrap();

        let athlete = service
            .db
            .get_athlete("u-1", "WITHINGS")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(athlete.first_name.as_deref(), Some("Sam"));
        assert_eq!(athlete.sex.as_deref(), Some("female"));
        assert_eq!(athlete.date_of_birth.as_deref(), Some("1990-05-04"));
    }
}
