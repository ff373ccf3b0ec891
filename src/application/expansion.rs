// Synthetic expansion - jittered siblings around each reading for a denser heatmap
use crate::application::stress_api::{LoadError, ReadingSource};
use crate::domain::reading::{Origin, Reading, ReadingId, Source};
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::config::ExpansionSettings;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};

/// Each original followed by its interpolated siblings. Originals without
/// coordinates are kept but get no siblings.
pub fn expand_readings<R: Rng>(
    base: &[Reading],
    settings: &ExpansionSettings,
    rng: &mut R,
) -> Vec<Reading> {
    let mut expanded = Vec::with_capacity(base.len() * (1 + settings.points_per_location));

    for parent in base {
        expanded.push(parent.clone());
        if parent.position().is_none() {
            continue;
        }
        for index in 0..settings.points_per_location {
            expanded.push(interpolate(parent, index, settings.spread_radius, rng));
        }
    }

    expanded
}

fn interpolate<R: Rng>(parent: &Reading, index: usize, radius: f64, rng: &mut R) -> Reading {
    let angle = rng.gen_range(0.0..TAU);
    let distance = if radius > 0.0 { rng.gen_range(0.0..radius) } else { 0.0 };

    // ±10% multiplicative for stress, ±10 absolute for crowd and noise
    let stress = parent.stress_or_zero() as f64 * rng.gen_range(0.9..=1.1);
    let crowd = parent.crowd_density.unwrap_or(0) as f64 + rng.gen_range(-10.0..=10.0);
    let noise = parent.noise_level.unwrap_or(0) as f64 + rng.gen_range(-10.0..=10.0);

    Reading {
        id: parent
            .id
            .as_ref()
            .map(|id| ReadingId::Text(format!("{}-{}", id, index))),
        name: parent.name.clone(),
        lat: parent.lat.map(|lat| lat + angle.cos() * distance),
        lng: parent.lng.map(|lng| lng + angle.sin() * distance),
        crowd_density: Some(clamp_score(crowd)),
        noise_level: Some(clamp_score(noise)),
        stress_score: Some(clamp_score(stress)),
        source: Some(Source::Interpolated),
        timestamp: parent.timestamp.clone(),
        origin: Origin::Interpolated {
            parent_id: parent.id.clone(),
        },
    }
}

fn clamp_score(value: f64) -> i64 {
    value.clamp(0.0, 100.0).round() as i64
}

/// Wraps another source and expands every snapshot it produces.
pub struct ExpandingSource {
    inner: Arc<dyn ReadingSource>,
    settings: ExpansionSettings,
    rng: Mutex<StdRng>,
}

impl ExpandingSource {
    pub fn new(inner: Arc<dyn ReadingSource>, settings: ExpansionSettings, rng: StdRng) -> Self {
        Self {
            inner,
            settings,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl ReadingSource for ExpandingSource {
    async fn load(&self) -> Result<Snapshot, LoadError> {
        let snapshot = self.inner.load().await?;
        let base_count = snapshot.readings.len();

        let expanded = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            expand_readings(&snapshot.readings, &self.settings, &mut *rng)
        };

        tracing::info!(
            base = base_count,
            expanded = expanded.len(),
            "Expanded readings with interpolated points"
        );
        Ok(Snapshot::new(expanded).with_version(snapshot.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn parent(id: i64, crowd: i64, noise: i64, stress: i64) -> Reading {
        Reading {
            id: Some(ReadingId::Number(id)),
            name: Some("Parent".to_string()),
            lat: Some(-27.47),
            lng: Some(153.02),
            crowd_density: Some(crowd),
            noise_level: Some(noise),
            stress_score: Some(stress),
            ..Default::default()
        }
    }

    #[test]
    fn test_scores_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let settings = ExpansionSettings {
            points_per_location: 50,
            spread_radius: 0.0035,
        };
        let base = vec![parent(1, 100, 100, 100), parent(2, 0, 0, 0), parent(3, 97, 3, 250)];

        let expanded = expand_readings(&base, &settings, &mut rng);

        assert_eq!(expanded.len(), 3 * 51);
        for reading in expanded.iter().filter(|r| r.is_interpolated()) {
            for score in [reading.crowd_density, reading.noise_level, reading.stress_score] {
                let score = score.unwrap();
                assert!((0..=100).contains(&score), "score {} out of range", score);
            }
        }
    }

    #[test]
    fn test_siblings_stay_within_radius() {
        let mut rng = StdRng::seed_from_u64(11);
        let settings = ExpansionSettings::default();
        let base = vec![parent(4, 50, 50, 50)];

        let expanded = expand_readings(&base, &settings, &mut rng);

        assert_eq!(expanded[0], base[0]);
        for (i, sibling) in expanded[1..].iter().enumerate() {
            let dlat = sibling.lat.unwrap() - -27.47;
            let dlng = sibling.lng.unwrap() - 153.02;
            assert!((dlat * dlat + dlng * dlng).sqrt() <= settings.spread_radius + 1e-12);
            assert_eq!(sibling.id, Some(ReadingId::Text(format!("4-{}", i))));
            assert_eq!(
                sibling.origin,
                Origin::Interpolated {
                    parent_id: Some(ReadingId::Number(4))
                }
            );
        }
    }

    #[test]
    fn test_parent_without_coordinates_gets_no_siblings() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = vec![Reading {
            lng: None,
            ..parent(5, 10, 10, 10)
        }];

        let expanded = expand_readings(&base, &ExpansionSettings::default(), &mut rng);
        assert_eq!(expanded.len(), 1);
    }

    struct FixedSource(Vec<Reading>);

    #[async_trait]
    impl ReadingSource for FixedSource {
        async fn load(&self) -> Result<Snapshot, LoadError> {
            Ok(Snapshot::new(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_expanding_source_wraps_inner() {
        let inner = Arc::new(FixedSource(vec![parent(1, 40, 40, 40), parent(2, 60, 60, 60)]));
        let source = ExpandingSource::new(inner, ExpansionSettings::default(), StdRng::seed_from_u64(3));

        let snapshot = source.load().await.unwrap();
        assert_eq!(snapshot.readings.len(), 12);
        assert_eq!(snapshot.readings.iter().filter(|r| !r.is_interpolated()).count(), 2);
    }
}
