// Snapshot of readings delivered by a data source, plus change detection
use super::reading::{Origin, Reading, ReadingId, Source};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub readings: Vec<Reading>,
    /// Version tag supplied by the server (e.g. an ETag), when it has one.
    pub version: Option<String>,
}

impl Snapshot {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            readings,
            version: None,
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }
}

/// Opaque value used to tell whether a snapshot differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(snapshot: &Snapshot) -> Self {
        let mut hasher = DefaultHasher::new();
        match &snapshot.version {
            Some(version) => {
                0u8.hash(&mut hasher);
                version.hash(&mut hasher);
            }
            None => {
                1u8.hash(&mut hasher);
                snapshot.readings.len().hash(&mut hasher);
                for reading in &snapshot.readings {
                    hash_reading(reading, &mut hasher);
                }
            }
        }
        Fingerprint(hasher.finish())
    }
}

fn hash_reading<H: Hasher>(reading: &Reading, state: &mut H) {
    reading.id.hash(state);
    reading.name.hash(state);
    reading.lat.map(f64::to_bits).hash(state);
    reading.lng.map(f64::to_bits).hash(state);
    reading.crowd_density.hash(state);
    reading.noise_level.hash(state);
    reading.stress_score.hash(state);
    reading.source.map(source_tag).hash(state);
    reading.timestamp.hash(state);
    match &reading.origin {
        Origin::Original => 0u8.hash(state),
        Origin::Interpolated { parent_id } => {
            1u8.hash(state);
            parent_id.as_ref().map(ReadingId::to_string).hash(state);
        }
    }
}

fn source_tag(source: Source) -> u8 {
    match source {
        Source::User => 0,
        Source::Seed => 1,
        Source::Interpolated => 2,
        Source::Monitored => 3,
    }
}
