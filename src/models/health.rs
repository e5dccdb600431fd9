// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health metrics snapshot sent by the mobile client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AppError;

/// Metrics a summary request must carry.
pub const REQUIRED_METRICS: [&str; 4] = ["steps", "calories", "sleep_hours", "heart_rate"];

/// One day of health data. Ephemeral; only persisted inside an analysis record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthMetrics {
    #[serde(default)]
    pub steps: f64,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub sleep_hours: f64,
    /// Average heart rate (bpm)
    #[serde(default)]
    pub heart_rate: f64,
    #[serde(default)]
    pub exercise_minutes: f64,
}

impl HealthMetrics {
    /// Validate and extract metrics from a raw request body.
    ///
    /// Unknown keys are ignored. `null` counts as absent.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let obj = match body {
            Value::Object(obj) if !obj.is_empty() => obj,
            _ => return Err(AppError::BadRequest("No health data received".to_string())),
        };

        let number = |key: &str| -> Result<Option<f64>, AppError> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v.as_f64().map(Some).ok_or_else(|| {
                    AppError::BadRequest(format!("Field '{}' must be a number", key))
                }),
            }
        };

        let required = |key: &str| -> Result<f64, AppError> {
            number(key)?
                .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {}", key)))
        };

        Ok(Self {
            steps: required("steps")?,
            calories: required("calories")?,
            sleep_hours: required("sleep_hours")?,
            heart_rate: required("heart_rate")?,
            distance_km: number("distance_km")?.unwrap_or_default(),
            exercise_minutes: number("exercise_minutes")?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_metrics_default_to_zero() {
        let metrics = HealthMetrics::from_json(&json!({
            "steps": 8000,
            "calories": 2100.5,
            "sleep_hours": 7.5,
            "heart_rate": 64,
            "device": "watch"
        }))
        .unwrap();

        assert_eq!(metrics.steps, 8000.0);
        assert_eq!(metrics.distance_km, 0.0);
        assert_eq!(metrics.exercise_minutes, 0.0);
    }

    #[test]
    fn test_each_required_metric_is_enforced() {
        let full = json!({
            "steps": 1, "calories": 1, "sleep_hours": 1, "heart_rate": 1
        });

        for key in REQUIRED_METRICS {
            let mut body = full.clone();
            body.as_object_mut().unwrap().remove(key);

            match HealthMetrics::from_json(&body) {
                Err(AppError::BadRequest(msg)) => assert!(msg.contains(key), "{msg}"),
                other => panic!("expected BadRequest for missing {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_null_is_missing() {
        let err = HealthMetrics::from_json(&json!({
            "steps": null, "calories": 1, "sleep_hours": 1, "heart_rate": 1
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("steps")));
    }

    #[test]
    fn test_rejects_empty_and_non_numeric() {
        assert!(HealthMetrics::from_json(&json!({})).is_err());
        assert!(HealthMetrics::from_json(&json!([1, 2])).is_err());
        assert!(HealthMetrics::from_json(&json!({
            "steps": "many", "calories": 1, "sleep_hours": 1, "heart_rate": 1
        }))
        .is_err());
    }
}
