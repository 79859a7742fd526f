// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dotted field paths with optional array indexes.
//!
//! `measurements_data.measurements[0].weight_kg` parses into three steps:
//! `measurements_data`, `measurements` at index 0, and `weight_kg`.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a field path: an object key, optionally followed by an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub index: Option<usize>,
}

/// A parsed field path, kept alongside its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Field path is empty")]
    Empty,

    #[error("Empty segment in field path {0:?}")]
    EmptySegment(String),

    #[error("Invalid array index in field path {0:?}")]
    InvalidIndex(String),

    #[error("Unexpected character {1:?} in field path {0:?}")]
    UnexpectedCharacter(String, char),
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = raw
            .split('.')
            .map(|segment| parse_segment(raw, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk `root` along this path.
    ///
    /// A missing key, a non-object/non-array container or an out-of-range
    /// index all resolve to `None`.
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments.iter().try_fold(root, |current, segment| {
            let child = current.get(segment.key.as_str())?;
            match segment.index {
                Some(i) => child.get(i),
                None => Some(child),
            }
        })
    }

    /// Whether this path names `field`: either exactly, or as its last dotted part.
    pub fn names_field(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        self.raw == field
            || self
                .raw
                .strip_suffix(field)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Parse `raw` and walk `root` along it.
///
/// A malformed path resolves to `None`, the same as a missing field.
pub fn lookup<'v>(root: &'v Value, raw: &str) -> Option<&'v Value> {
    FieldPath::parse(raw).ok()?.resolve(root)
}

fn parse_segment(raw: &str, segment: &str) -> Result<PathSegment, PathError> {
    let (key, index) = match segment.split_once('[') {
        Some((key, rest)) => {
            let digits = rest
                .strip_suffix(']')
                .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
                .ok_or_else(|| PathError::InvalidIndex(raw.to_string()))?;
            let index = digits
                .parse::<usize>()
                .map_err(|_| PathError::InvalidIndex(raw.to_string()))?;
            (key, Some(index))
        }
        None => (segment, None),
    };

    if key.is_empty() {
        return Err(PathError::EmptySegment(raw.to_string()));
    }
    if let Some(c) = key.chars().find(|c| matches!(c, '[' | ']')) {
        return Err(PathError::UnexpectedCharacter(raw.to_string(), c));
    }

    Ok(PathSegment {
        key: key.to_string(),
        index,
    })
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_and_indexed() {
        let path = FieldPath::parse("measurements_data.measurements[0].weight_kg").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment {
                    key: "measurements_data".to_string(),
                    index: None
                },
                PathSegment {
                    key: "measurements".to_string(),
                    index: Some(0)
                },
                PathSegment {
                    key: "weight_kg".to_string(),
                    index: None
                },
            ]
        );
        assert_eq!(path.to_string(), "measurements_data.measurements[0].weight_kg");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            FieldPath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPath::parse("a.[0]"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPath::parse("a[x]"),
            Err(PathError::InvalidIndex(_))
        ));
        assert!(matches!(
            FieldPath::parse("a[0][1]"),
            Err(PathError::InvalidIndex(_))
        ));
        assert!(matches!(
            FieldPath::parse("a[]"),
            Err(PathError::InvalidIndex(_))
        ));
        assert!(matches!(
            FieldPath::parse("a]b"),
            Err(PathError::UnexpectedCharacter(_, ']'))
        ));
    }

    #[test]
    fn test_resolve() {
        let payload = json!({
            "measurements": [{"weight_kg": 81.2}, {"weight_kg": 80.9}],
            "score": {"recovery_score": 64}
        });

        let weight: FieldPath = "measurements[1].weight_kg".parse().unwrap();
        assert_eq!(weight.resolve(&payload), Some(&json!(80.9)));

        let recovery: FieldPath = "score.recovery_score".parse().unwrap();
        assert_eq!(recovery.resolve(&payload), Some(&json!(64)));
    }

    #[test]
    fn test_resolve_missing() {
        let payload = json!({"measurements": [{"weight_kg": 81.2}], "score": 12});

        for raw in [
            "measurements[3].weight_kg",
            "score.recovery_score",
            "measurements.weight_kg",
            "score[0]",
            "nothing",
        ] {
            let path = FieldPath::parse(raw).unwrap();
            assert_eq!(path.resolve(&payload), None, "{}", raw);
        }
    }

    #[test]
    fn test_lookup() {
        let item = json!({"metadata": {"type": 1, "name": "Run"}, "laps": [{"km": 1.0}]});

        assert_eq!(lookup(&item, "metadata.name"), Some(&json!("Run")));
        assert_eq!(lookup(&item, "laps[0].km"), Some(&json!(1.0)));
        assert_eq!(lookup(&item, "metadata.missing"), None);
        assert_eq!(lookup(&item, "metadata..name"), None);
        assert_eq!(lookup(&item, ""), None);
    }

    #[test]
    fn test_names_field() {
        let path = FieldPath::parse("heart_rate_data.summary.resting_hr_bpm").unwrap();
        assert!(path.names_field("resting_hr_bpm"));
        assert!(path.names_field("heart_rate_data.summary.resting_hr_bpm"));
        assert!(!path.names_field("hr_bpm"));
        assert!(!path.names_field(""));

        let bare = FieldPath::parse("strain").unwrap();
        assert!(bare.names_field("strain"));
        assert!(!bare.names_field("train"));
    }
}
