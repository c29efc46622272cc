//! Aggregated activity data from an external health source.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diary::DayBounds;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HealthSummary {
    pub steps: i64,
    pub distance_m: f64,
    pub calories_burned: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health data is not available: {0}")]
    Unavailable(String),
    #[error("Access to health data was declined")]
    PermissionDenied,
    #[error("Could not read health data: {0}")]
    Read(String),
}

/// Source of step, distance and energy samples.
pub trait HealthDataProvider: Send + Sync {
    /// Totals over samples whose timestamp falls inside `range`.
    fn summary(&self, range: DayBounds) -> Result<HealthSummary, HealthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Steps,
    DistanceM,
    CaloriesBurned,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthSample {
    pub kind: SampleKind,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
struct HealthExport {
    samples: Vec<HealthSample>,
}

#[must_use]
pub fn aggregate(samples: &[HealthSample], range: DayBounds) -> HealthSummary {
    let mut summary = HealthSummary::default();
    let mut steps = 0.0;
    for sample in samples.iter().filter(|s| range.contains(s.timestamp)) {
        match sample.kind {
            SampleKind::Steps => steps += sample.value,
            SampleKind::DistanceM => summary.distance_m += sample.value,
            SampleKind::CaloriesBurned => summary.calories_burned += sample.value,
        }
    }
    summary.steps = steps.round() as i64;
    summary
}

/// Reads an exported `{"samples": [...]}` JSON file on every query.
pub struct JsonFileHealthProvider {
    path: PathBuf,
}

impl JsonFileHealthProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_samples(&self) -> Result<Vec<HealthSample>, HealthError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                HealthError::Unavailable(format!("{} does not exist", self.path.display()))
            }
            std::io::ErrorKind::PermissionDenied => HealthError::PermissionDenied,
            _ => HealthError::Read(e.to_string()),
        })?;
        let export: HealthExport =
            serde_json::from_str(&raw).map_err(|e| HealthError::Read(e.to_string()))?;
        Ok(export.samples)
    }
}

impl HealthDataProvider for JsonFileHealthProvider {
    fn summary(&self, range: DayBounds) -> Result<HealthSummary, HealthError> {
        let samples = self.read_samples()?;
        Ok(aggregate(&samples, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: DayBounds = DayBounds {
        start_millis: 1_000,
        end_millis: 2_000,
    };

    fn sample(kind: SampleKind, timestamp: i64, value: f64) -> HealthSample {
        HealthSample {
            kind,
            timestamp,
            value,
        }
    }

    #[test]
    fn test_aggregate_filters_by_range() {
        let samples = vec![
            sample(SampleKind::Steps, 1_000, 4_000.0),
            sample(SampleKind::Steps, 1_500, 2_500.4),
            sample(SampleKind::Steps, 2_000, 9_999.0),
            sample(SampleKind::DistanceM, 1_200, 3_100.0),
            sample(SampleKind::CaloriesBurned, 1_300, 250.5),
            sample(SampleKind::CaloriesBurned, 500, 100.0),
        ];
        let summary = aggregate(&samples, RANGE);
        assert_eq!(summary.steps, 6_500);
        assert!((summary.distance_m - 3_100.0).abs() < f64::EPSILON);
        assert!((summary.calories_burned - 250.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        std::fs::write(
            &path,
            r#"{"samples":[
                {"kind":"steps","timestamp":1100,"value":1200},
                {"kind":"distance_m","timestamp":1200,"value":900.5}
            ]}"#,
        )
        .unwrap();
        let provider = JsonFileHealthProvider::new(&path);
        let summary = provider.summary(RANGE).unwrap();
        assert_eq!(summary.steps, 1_200);
        assert!((summary.distance_m - 900.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = JsonFileHealthProvider::new(dir.path().join("absent.json"));
        assert!(matches!(
            provider.summary(RANGE),
            Err(HealthError::Unavailable(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        std::fs::write(&path, "{not json").unwrap();
        let provider = JsonFileHealthProvider::new(path);
        assert!(matches!(provider.summary(RANGE), Err(HealthError::Read(_))));
    }
}
