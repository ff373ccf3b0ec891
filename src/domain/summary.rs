// Aggregate figures shown when no single reading is focused
use super::reading::Reading;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct AreaSummary {
    pub total: usize,
    pub user_submissions: usize,
    pub average_stress: i64,
    pub most_recent: Option<DateTime<Utc>>,
}

impl AreaSummary {
    /// Returns `None` for an empty list. Missing stress scores count as zero and
    /// the average is clamped to the 0-100 scale.
    pub fn from_readings(readings: &[Reading]) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }

        let total = readings.len();
        let user_submissions = readings.iter().filter(|r| r.is_user_submitted()).count();
        // Scores are unbounded on ingest
        let stress_sum: i128 = readings.iter().map(|r| i128::from(r.stress_or_zero())).sum();
        let average_stress = (stress_sum as f64 / total as f64).round().clamp(0.0, 100.0) as i64;
        let most_recent = readings.iter().filter_map(Reading::parsed_timestamp).max();

        Some(Self {
            total,
            user_submissions,
            average_stress,
            most_recent,
        })
    }
}

/// Service-wide statistics reported by the `/stats` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStats {
    #[serde(default)]
    pub total_locations: u64,
    #[serde(default)]
    pub seed_locations: u64,
    #[serde(default)]
    pub user_submissions: u64,
    #[serde(default)]
    pub average_stress: f64,
    #[serde(default)]
    pub last_update: Option<String>,
}
