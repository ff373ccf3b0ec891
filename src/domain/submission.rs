// User submission payload and the server's acknowledgement
use super::reading::{Position, Reading};
use serde::Serialize;

/// Body of `POST /submit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub crowd_density: u8,
    pub noise_level: u8,
    pub stress_score: u8,
}

impl SubmissionPayload {
    pub fn new(name: String, position: Position, crowd: Score, noise: Score, stress: Score) -> Self {
        Self {
            name,
            lat: position.lat,
            lng: position.lng,
            crowd_density: crowd.value(),
            noise_level: noise.value(),
            stress_score: stress.value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub message: String,
    pub location: Option<Reading>,
}

/// Slider value, always within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    pub fn clamped(value: i64) -> Self {
        Score(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Score(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_clamps() {
        assert_eq!(Score::clamped(-4).value(), 0);
        assert_eq!(Score::clamped(140).value(), 100);
        assert_eq!(Score::default().value(), 50);
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = SubmissionPayload::new(
            "Cafe".to_string(),
            Position::new(-27.5, 153.0),
            Score::clamped(10),
            Score::clamped(20),
            Score::clamped(30),
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["crowdDensity"], 10);
        assert_eq!(json["noiseLevel"], 20);
        assert_eq!(json["stressScore"], 30);
        assert_eq!(json["lat"], -27.5);
    }
}
