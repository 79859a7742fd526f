// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unified metric mapping table.
//!
//! Each canonical metric lists the field paths where providers put it, in
//! priority order. Paths cover Terra's normalized schema, Whoop-style
//! payloads (`score.*`, `*_milli`) and Withings-style measure groups
//! (`measurements[0].*`). The table is built once at startup and shared
//! read-only.

use serde::Serialize;
use std::collections::HashSet;

use crate::models::metric::{MetricCategory, MetricDescriptor};
use crate::services::normalizer::path::{FieldPath, PathError};

/// Unit conversion applied to a raw provider value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Seconds to hours, one decimal
    SecondsToHours,
    /// Seconds to minutes, one decimal
    SecondsToMinutes,
    /// Milliseconds to hours, one decimal
    MillisecondsToHours,
    /// Milliseconds to minutes, one decimal
    MillisecondsToMinutes,
    /// Meters to kilometers, two decimals
    MetersToKilometers,
    /// Kilojoules to whole kilocalories
    KilojoulesToKilocalories,
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::SecondsToHours => round_to(value / 3600.0, 1),
            Transform::SecondsToMinutes => round_to(value / 60.0, 1),
            Transform::MillisecondsToHours => round_to(value / 3_600_000.0, 1),
            Transform::MillisecondsToMinutes => round_to(value / 60_000.0, 1),
            Transform::MetersToKilometers => round_to(value / 1000.0, 2),
            Transform::KilojoulesToKilocalories => round_to(value / 4.184, 0),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mapping from provider field paths to one canonical metric.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedMetricMapping {
    /// Stable identifier, used in storage document IDs
    pub key: &'static str,
    pub canonical_name: &'static str,
    pub unit: &'static str,
    pub category: MetricCategory,
    /// Candidate paths, highest priority first
    pub source_field_paths: Vec<FieldPath>,
    pub transformer: Option<Transform>,
}

impl UnifiedMetricMapping {
    pub fn descriptor(&self) -> MetricDescriptor {
        MetricDescriptor {
            name: self.canonical_name.to_string(),
            unit: self.unit.to_string(),
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("Duplicate mapping key: {0}")]
    DuplicateKey(String),

    #[error("Duplicate canonical metric name: {0}")]
    DuplicateName(String),

    #[error("Mapping {0} has no source field paths")]
    NoPaths(String),

    #[error("Invalid field path in mapping {0}: {1}")]
    Path(String, #[source] PathError),
}

/// Immutable set of mappings; exactly one mapping per canonical name.
#[derive(Debug, Clone)]
pub struct MetricMappingTable {
    mappings: Vec<UnifiedMetricMapping>,
}

impl MetricMappingTable {
    pub fn new(mappings: Vec<UnifiedMetricMapping>) -> Result<Self, MappingError> {
        let mut keys = HashSet::new();
        let mut names = HashSet::new();

        for mapping in &mappings {
            if !keys.insert(mapping.key) {
                return Err(MappingError::DuplicateKey(mapping.key.to_string()));
            }
            if !names.insert(mapping.canonical_name) {
                return Err(MappingError::DuplicateName(
                    mapping.canonical_name.to_string(),
                ));
            }
            if mapping.source_field_paths.is_empty() {
                return Err(MappingError::NoPaths(mapping.key.to_string()));
            }
        }

        Ok(Self { mappings })
    }

    /// The built-in table of all supported metrics.
    pub fn standard() -> Result<Self, MappingError> {
        let mappings = STANDARD_MAPPINGS
            .iter()
            .map(MappingDef::build)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(mappings)
    }

    pub fn get(&self, key: &str) -> Option<&UnifiedMetricMapping> {
        self.mappings.iter().find(|m| m.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnifiedMetricMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Static definition of a mapping, parsed into [`UnifiedMetricMapping`] at startup.
pub struct MappingDef {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub category: MetricCategory,
    pub paths: &'static [&'static str],
    pub transformer: Option<Transform>,
}

impl MappingDef {
    pub fn build(&self) -> Result<UnifiedMetricMapping, MappingError> {
        let source_field_paths = self
            .paths
            .iter()
            .map(|p| FieldPath::parse(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MappingError::Path(self.key.to_string(), e))?;

        Ok(UnifiedMetricMapping {
            key: self.key,
            canonical_name: self.name,
            unit: self.unit,
            category: self.category,
            source_field_paths,
            transformer: self.transformer,
        })
    }
}

use MetricCategory::*;

const STANDARD_MAPPINGS: &[MappingDef] = &[
    // ─── Recovery ────────────────────────────────────────────────
    MappingDef {
        key: "recovery_score",
        name: "Recovery Score",
        unit: "%",
        category: Recovery,
        paths: &[
            "recovery_score",
            "score.recovery_score",
            "readiness_data.recovery_score",
        ],
        transformer: None,
    },
    MappingDef {
        key: "readiness_score",
        name: "Readiness Score",
        unit: "%",
        category: Recovery,
        paths: &["readiness_score", "readiness_data.readiness_score"],
        transformer: None,
    },
    MappingDef {
        key: "hrv",
        name: "Heart Rate Variability",
        unit: "ms",
        category: Recovery,
        paths: &[
            "hrv_rmssd",
            "hrv_rmssd_milli",
            "score.hrv_rmssd_milli",
            "heart_rate_data.summary.avg_hrv_rmssd",
            "heart_rate_data.avg_hrv_rmssd",
        ],
        transformer: None,
    },
    MappingDef {
        key: "skin_temperature",
        name: "Skin Temperature",
        unit: "°C",
        category: Recovery,
        paths: &[
            "skin_temp_celsius",
            "score.skin_temp_celsius",
            "temperature_data.avg_temperature_celsius",
        ],
        transformer: None,
    },
    // ─── Sleep ───────────────────────────────────────────────────
    MappingDef {
        key: "sleep_duration",
        name: "Sleep Duration",
        unit: "hours",
        category: Sleep,
        paths: &[
            "duration_seconds",
            "sleep_durations_data.asleep.duration_asleep_state_seconds",
            "sleep_durations_data.asleep_seconds",
        ],
        transformer: Some(Transform::SecondsToHours),
    },
    MappingDef {
        key: "time_in_bed",
        name: "Time in Bed",
        unit: "hours",
        category: Sleep,
        paths: &[
            "in_bed_seconds",
            "sleep_durations_data.other.duration_in_bed_seconds",
            "sleep_durations_data.in_bed_seconds",
        ],
        transformer: Some(Transform::SecondsToHours),
    },
    MappingDef {
        key: "deep_sleep",
        name: "Deep Sleep",
        unit: "hours",
        category: Sleep,
        paths: &[
            "deep_sleep_seconds",
            "sleep_durations_data.asleep.duration_deep_sleep_state_seconds",
            "sleep_durations_data.deep_sleep_seconds",
        ],
        transformer: Some(Transform::SecondsToHours),
    },
    MappingDef {
        key: "rem_sleep",
        name: "REM Sleep",
        unit: "hours",
        category: Sleep,
        paths: &[
            "rem_sleep_seconds",
            "sleep_durations_data.asleep.duration_REM_sleep_state_seconds",
            "sleep_durations_data.rem_sleep_seconds",
        ],
        transformer: Some(Transform::SecondsToHours),
    },
    MappingDef {
        key: "light_sleep",
        name: "Light Sleep",
        unit: "hours",
        category: Sleep,
        paths: &[
            "light_sleep_seconds",
            "sleep_durations_data.asleep.duration_light_sleep_state_seconds",
            "sleep_durations_data.light_sleep_seconds",
        ],
        transformer: Some(Transform::SecondsToHours),
    },
    MappingDef {
        key: "sleep_latency",
        name: "Sleep Latency",
        unit: "minutes",
        category: Sleep,
        paths: &[
            "sleep_latency_seconds",
            "sleep_durations_data.other.sleep_latency_seconds",
            "sleep_durations_data.sleep_latency_seconds",
        ],
        transformer: Some(Transform::SecondsToMinutes),
    },
    MappingDef {
        key: "sleep_efficiency",
        name: "Sleep Efficiency",
        unit: "%",
        category: Sleep,
        paths: &[
            "sleep_efficiency",
            "score.sleep_efficiency_percentage",
            "sleep_durations_data.sleep_efficiency",
        ],
        transformer: None,
    },
    MappingDef {
        key: "sleep_performance",
        name: "Sleep Performance",
        unit: "%",
        category: Sleep,
        paths: &[
            "sleep_performance_percentage",
            "score.sleep_performance_percentage",
        ],
        transformer: None,
    },
    MappingDef {
        key: "sleep_need",
        name: "Sleep Need",
        unit: "hours",
        category: Sleep,
        paths: &["score.sleep_needed.baseline_milli"],
        transformer: Some(Transform::MillisecondsToHours),
    },
    // ─── Respiratory ─────────────────────────────────────────────
    MappingDef {
        key: "respiratory_rate",
        name: "Respiratory Rate",
        unit: "breaths/min",
        category: Respiratory,
        paths: &[
            "respiratory_rate",
            "score.respiratory_rate",
            "respiration_data.breaths_data.avg_breaths_per_min",
            "respiration_data.avg_breaths_per_minute",
        ],
        transformer: None,
    },
    MappingDef {
        key: "blood_oxygen",
        name: "Blood Oxygen",
        unit: "%",
        category: Respiratory,
        paths: &[
            "spo2_percentage",
            "score.spo2_percentage",
            "oxygen_data.avg_saturation_percentage",
        ],
        transformer: None,
    },
    // ─── Cardiovascular ──────────────────────────────────────────
    MappingDef {
        key: "resting_heart_rate",
        name: "Resting Heart Rate",
        unit: "bpm",
        category: Cardiovascular,
        paths: &[
            "resting_heart_rate",
            "score.resting_heart_rate",
            "heart_rate_data.summary.resting_hr_bpm",
            "heart_rate_data.resting_hr_bpm",
        ],
        transformer: None,
    },
    MappingDef {
        key: "avg_heart_rate",
        name: "Average Heart Rate",
        unit: "bpm",
        category: Cardiovascular,
        paths: &[
            "average_heart_rate",
            "score.average_heart_rate",
            "heart_rate_data.summary.avg_hr_bpm",
            "heart_rate_data.avg_hr_bpm",
        ],
        transformer: None,
    },
    MappingDef {
        key: "max_heart_rate",
        name: "Max Heart Rate",
        unit: "bpm",
        category: Cardiovascular,
        paths: &[
            "max_heart_rate",
            "score.max_heart_rate",
            "heart_rate_data.summary.max_hr_bpm",
            "heart_rate_data.max_hr_bpm",
        ],
        transformer: None,
    },
    MappingDef {
        key: "vo2_max",
        name: "VO2 Max",
        unit: "mL/kg/min",
        category: Cardiovascular,
        paths: &["vo2max", "oxygen_data.vo2max_ml_per_min_per_kg"],
        transformer: None,
    },
    MappingDef {
        key: "blood_pressure_systolic",
        name: "Systolic Blood Pressure",
        unit: "mmHg",
        category: Cardiovascular,
        paths: &[
            "systolic_bp",
            "measurements[0].systolic_bp",
            "blood_pressure_data.blood_pressure_samples[0].systolic_bp",
            "measurements_data.blood_pressure_systolic",
        ],
        transformer: None,
    },
    MappingDef {
        key: "blood_pressure_diastolic",
        name: "Diastolic Blood Pressure",
        unit: "mmHg",
        category: Cardiovascular,
        paths: &[
            "diastolic_bp",
            "measurements[0].diastolic_bp",
            "blood_pressure_data.blood_pressure_samples[0].diastolic_bp",
            "measurements_data.blood_pressure_diastolic",
        ],
        transformer: None,
    },
    // ─── Activity ────────────────────────────────────────────────
    MappingDef {
        key: "steps",
        name: "Steps",
        unit: "steps",
        category: Activity,
        paths: &["steps", "distance_data.steps", "distance_data.summary.steps"],
        transformer: None,
    },
    MappingDef {
        key: "distance",
        name: "Distance",
        unit: "km",
        category: Activity,
        paths: &[
            "distance_meter",
            "score.distance_meter",
            "distance_data.summary.distance_meters",
            "distance_data.distance_meters",
        ],
        transformer: Some(Transform::MetersToKilometers),
    },
    MappingDef {
        key: "floors_climbed",
        name: "Floors Climbed",
        unit: "floors",
        category: Activity,
        paths: &[
            "floors_climbed",
            "distance_data.summary.floors_climbed",
            "distance_data.floors_climbed",
        ],
        transformer: None,
    },
    MappingDef {
        key: "active_duration",
        name: "Active Duration",
        unit: "minutes",
        category: Activity,
        paths: &[
            "active_seconds",
            "active_durations_data.activity_seconds",
        ],
        transformer: Some(Transform::SecondsToMinutes),
    },
    MappingDef {
        key: "total_calories",
        name: "Calories Burned",
        unit: "kcal",
        category: Activity,
        paths: &[
            "total_burned_calories",
            "calories_data.total_burned_calories",
        ],
        transformer: None,
    },
    MappingDef {
        key: "active_calories",
        name: "Active Calories",
        unit: "kcal",
        category: Activity,
        paths: &[
            "active_calories",
            "calories_data.net_activity_calories",
            "calories_data.activity_burned_calories",
        ],
        transformer: None,
    },
    MappingDef {
        key: "energy_expenditure",
        name: "Energy Expenditure",
        unit: "kcal",
        category: Activity,
        paths: &["kilojoule", "score.kilojoule"],
        transformer: Some(Transform::KilojoulesToKilocalories),
    },
    MappingDef {
        key: "strain",
        name: "Strain",
        unit: "score",
        category: Activity,
        paths: &["strain", "score.strain", "strain_data.strain_level"],
        transformer: None,
    },
    // ─── Body ────────────────────────────────────────────────────
    MappingDef {
        key: "weight",
        name: "Weight",
        unit: "kg",
        category: Body,
        paths: &[
            "weight_kg",
            "measurements_data.measurements[0].weight_kg",
            "measurements[0].weight_kg",
            "measurements_data.weight_kg",
        ],
        transformer: None,
    },
    MappingDef {
        key: "body_fat",
        name: "Body Fat",
        unit: "%",
        category: Body,
        paths: &[
            "body_fat_percentage",
            "fat_ratio",
            "measurements_data.measurements[0].bodyfat_percentage",
            "measurements[0].fat_ratio",
            "measurements_data.body_fat_percentage",
        ],
        transformer: None,
    },
    MappingDef {
        key: "bmi",
        name: "BMI",
        unit: "kg/m²",
        category: Body,
        paths: &[
            "bmi",
            "measurements_data.measurements[0].BMI",
            "measurements_data.bmi",
        ],
        transformer: None,
    },
    MappingDef {
        key: "muscle_mass",
        name: "Muscle Mass",
        unit: "kg",
        category: Body,
        paths: &[
            "muscle_mass_kg",
            "measurements[0].muscle_mass_kg",
            "measurements_data.muscle_mass_kg",
        ],
        transformer: None,
    },
    MappingDef {
        key: "body_water",
        name: "Body Water",
        unit: "%",
        category: Body,
        paths: &[
            "body_water_percentage",
            "measurements_data.measurements[0].water_percentage",
            "measurements_data.body_water_percentage",
        ],
        transformer: None,
    },
    // ─── Metabolic ───────────────────────────────────────────────
    MappingDef {
        key: "blood_glucose",
        name: "Blood Glucose",
        unit: "mg/dL",
        category: Metabolic,
        paths: &[
            "blood_glucose_mg_per_dl",
            "glucose_data.day_avg_blood_glucose_mg_per_dL",
            "measurements_data.blood_glucose_mg_per_dl",
        ],
        transformer: None,
    },
    MappingDef {
        key: "basal_metabolic_rate",
        name: "Basal Metabolic Rate",
        unit: "kcal",
        category: Metabolic,
        paths: &["bmr", "calories_data.BMR_calories", "measurements_data.bmr"],
        transformer: None,
    },
    // ─── Wellness ────────────────────────────────────────────────
    MappingDef {
        key: "stress_level",
        name: "Stress Level",
        unit: "score",
        category: Wellness,
        paths: &["avg_stress_level", "stress_data.avg_stress_level"],
        transformer: None,
    },
    // ─── Nutrition ───────────────────────────────────────────────
    MappingDef {
        key: "calories_consumed",
        name: "Calories Consumed",
        unit: "kcal",
        category: Nutrition,
        paths: &["calories", "summary.macros.calories"],
        transformer: None,
    },
    MappingDef {
        key: "protein",
        name: "Protein",
        unit: "g",
        category: Nutrition,
        paths: &["protein_g", "summary.macros.protein_g"],
        transformer: None,
    },
    MappingDef {
        key: "carbohydrates",
        name: "Carbohydrates",
        unit: "g",
        category: Nutrition,
        paths: &["carbohydrates_g", "summary.macros.carbohydrates_g"],
        transformer: None,
    },
    MappingDef {
        key: "fat",
        name: "Fat",
        unit: "g",
        category: Nutrition,
        paths: &["fat_g", "summary.macros.fat_g"],
        transformer: None,
    },
    MappingDef {
        key: "fiber",
        name: "Fiber",
        unit: "g",
        category: Nutrition,
        paths: &["fiber_g", "summary.macros.fiber_g"],
        transformer: None,
    },
    MappingDef {
        key: "water_intake",
        name: "Water Intake",
        unit: "mL",
        category: Nutrition,
        paths: &["water_ml", "summary.water_ml"],
        transformer: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn def(key: &'static str, name: &'static str, paths: &'static [&'static str]) -> MappingDef {
        MappingDef {
            key,
            name,
            unit: "%",
            category: Recovery,
            paths,
            transformer: None,
        }
    }

    #[test]
    fn test_standard_table_builds() {
        let table = MetricMappingTable::standard().unwrap();
        assert_eq!(table.len(), STANDARD_MAPPINGS.len());
        assert!(!table.is_empty());

        let recovery = table.get("recovery_score").unwrap();
        assert_eq!(recovery.canonical_name, "Recovery Score");
        assert_eq!(recovery.unit, "%");
        assert_eq!(recovery.category, Recovery);
        assert!(table.get("no_such_metric").is_none());
    }

    #[test]
    fn test_seconds_to_hours() {
        assert_eq!(Transform::SecondsToHours.apply(5400.0), 1.5);
        assert_eq!(Transform::SecondsToHours.apply(27000.0), 7.5);
        // 26_000s = 7.222..h
        assert_eq!(Transform::SecondsToHours.apply(26000.0), 7.2);
    }

    #[test]
    fn test_other_transforms() {
        assert_eq!(Transform::SecondsToMinutes.apply(90.0), 1.5);
        assert_eq!(Transform::MillisecondsToHours.apply(27_000_000.0), 7.5);
        assert_eq!(Transform::MillisecondsToMinutes.apply(150_000.0), 2.5);
        assert_eq!(Transform::MetersToKilometers.apply(10_234.0), 10.23);
        assert_eq!(Transform::KilojoulesToKilocalories.apply(4184.0), 1000.0);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mappings = vec![
            def("a", "Recovery Score", &["a"]).build().unwrap(),
            def("b", "Recovery Score", &["b"]).build().unwrap(),
        ];
        assert_eq!(
            MetricMappingTable::new(mappings).unwrap_err(),
            MappingError::DuplicateName("Recovery Score".to_string())
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mappings = vec![
            def("a", "One", &["a"]).build().unwrap(),
            def("a", "Two", &["b"]).build().unwrap(),
        ];
        assert_eq!(
            MetricMappingTable::new(mappings).unwrap_err(),
            MappingError::DuplicateKey("a".to_string())
        );
    }

    #[test]
    fn test_invalid_path_rejected() {
        let err = def("a", "One", &["a[x]"]).build().unwrap_err();
        assert!(matches!(err, MappingError::Path(key, PathError::InvalidIndex(_)) if key == "a"));
    }

    #[test]
    fn test_empty_paths_rejected() {
        let mappings = vec![def("a", "One", &[]).build().unwrap()];
        assert_eq!(
            MetricMappingTable::new(mappings).unwrap_err(),
            MappingError::NoPaths("a".to_string())
        );
    }
}
