// Reading domain model
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Two readings closer than this (in degrees, per axis) are treated as the same place
/// when no shared id is available.
pub const COORDINATE_EPSILON: f64 = 0.00001;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingId {
    Number(i64),
    Text(String),
}

impl ReadingId {
    /// Numeric when the raw value parses as an integer, text otherwise.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => ReadingId::Number(n),
            Err(_) => ReadingId::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingId::Number(n) => write!(f, "{}", n),
            ReadingId::Text(s) => f.write_str(s),
        }
    }
}

/// Where a reading came from. Client-side only, never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Origin {
    #[default]
    Original,
    Interpolated { parent_id: Option<ReadingId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    User,
    Seed,
    Interpolated,
    #[serde(other)]
    Monitored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_near(&self, other: &Position) -> bool {
        (self.lat - other.lat).abs() < COORDINATE_EPSILON
            && (self.lng - other.lng).abs() < COORDINATE_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ReadingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_float", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_float", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub crowd_density: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub noise_level: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub stress_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Reading {
    /// Plottable position, if both coordinates are present and finite.
    pub fn position(&self) -> Option<Position> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Position::new(lat, lng))
            }
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Location")
    }

    pub fn is_user_submitted(&self) -> bool {
        self.source == Some(Source::User)
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self.origin, Origin::Interpolated { .. })
    }

    pub fn stress_or_zero(&self) -> i64 {
        self.stress_score.unwrap_or(0)
    }

    /// Heat intensity in [0, 1]; a missing score counts as zero.
    pub fn heat_intensity(&self) -> f64 {
        (self.stress_or_zero() as f64 / 100.0).clamp(0.0, 1.0)
    }

    /// True when `other` shares this reading's id, or, if this reading has no id,
    /// sits at the same coordinates.
    pub fn same_identity(&self, other: &Reading) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.position(), other.position()) {
                (Some(a), Some(b)) => a.is_near(&b),
                _ => false,
            },
        }
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS` form emitted by SQLite (UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|f| f.is_finite()))
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_api_reading() {
        let json = r#"{
            "id": 7, "name": "Central Station", "lat": -27.4654, "lng": 153.0268,
            "crowdDensity": 92, "noiseLevel": 88, "stressScore": 90,
            "timestamp": "2025-10-18 09:30:00", "source": "seed"
        }"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.id, Some(ReadingId::Number(7)));
        assert_eq!(reading.source, Some(Source::Seed));
        assert_eq!(reading.stress_score, Some(90));
        assert_eq!(reading.origin, Origin::Original);
        assert!(reading.position().is_some());
        assert!(reading.parsed_timestamp().is_some());
    }

    #[test]
    fn test_non_numeric_coordinates_have_no_position() {
        let json = r#"{"id": "a", "lat": "north", "lng": 153.0, "source": "sensor-array"}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.lat, None);
        assert_eq!(reading.position(), None);
        assert_eq!(reading.source, Some(Source::Monitored));
        assert_eq!(reading.display_name(), "Location");
    }

    #[test]
    fn test_same_identity_prefers_id_then_coordinates() {
        let a = Reading {
            id: Some(ReadingId::Number(1)),
            lat: Some(-27.47),
            lng: Some(153.02),
            ..Default::default()
        };
        let moved = Reading {
            lat: Some(-27.0),
            ..a.clone()
        };
        assert!(a.same_identity(&moved));

        let anonymous = Reading {
            id: None,
            ..a.clone()
        };
        let nearby = Reading {
            id: Some(ReadingId::Number(99)),
            lat: Some(-27.470_001),
            ..a.clone()
        };
        assert!(anonymous.same_identity(&nearby));

        let other = Reading {
            id: Some(ReadingId::Number(2)),
            ..a.clone()
        };
        assert!(!a.same_identity(&other));
    }

    #[test]
    fn test_reading_id_parse() {
        assert_eq!(ReadingId::parse(" 12 "), ReadingId::Number(12));
        assert_eq!(ReadingId::parse("3-1"), ReadingId::Text("3-1".to_string()));
        assert_eq!(ReadingId::parse("3-1").to_string(), "3-1");
    }
}
