// Comma-delimited reading files (static demo data)
use crate::application::stress_api::{LoadError, ReadingSource};
use crate::domain::reading::{Origin, Reading, ReadingId};
use crate::domain::snapshot::Snapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// A numeric cell that could not be read. The field is left empty on the reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub line: usize,
    pub field: &'static str,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelimitedLoad {
    pub readings: Vec<Reading>,
    pub issues: Vec<FieldIssue>,
}

/// Parse `id,name,lat,lng,crowdDensity,noiseLevel,stressScore` rows. Columns are
/// matched by the header, so their order does not matter.
pub fn parse_delimited(text: &str) -> DelimitedLoad {
    // (line number, content), blank lines dropped
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let Some((_, header)) = lines.next() else {
        return DelimitedLoad::default();
    };
    let columns: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    let mut load = DelimitedLoad::default();
    for (line_no, line) in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let cell = |name: &str| columns.get(name).and_then(|&i| cells.get(i)).copied();
        let mut row = RowParser {
            line: line_no,
            issues: &mut load.issues,
        };

        let id = cell("id").filter(|s| !s.is_empty()).map(ReadingId::parse);
        let origin = legacy_origin(id.as_ref());

        let reading = Reading {
            name: cell("name").map(str::to_string),
            lat: row.float("lat", cell("lat")),
            lng: row.float("lng", cell("lng")),
            crowd_density: row.int("crowdDensity", cell("crowdDensity")),
            noise_level: row.int("noiseLevel", cell("noiseLevel")),
            stress_score: row.int("stressScore", cell("stressScore")),
            id,
            origin,
            ..Default::default()
        };
        load.readings.push(reading);
    }

    load
}

// Files written by older exports mark interpolated rows only by an id of the form
// `<parent>-<index>`.
fn legacy_origin(id: Option<&ReadingId>) -> Origin {
    match id {
        Some(ReadingId::Text(text)) => match text.rsplit_once('-') {
            Some((parent, index))
                if !parent.is_empty() && index.chars().all(|c| c.is_ascii_digit()) && !index.is_empty() =>
            {
                Origin::Interpolated {
                    parent_id: Some(ReadingId::parse(parent)),
                }
            }
            _ => Origin::Original,
        },
        _ => Origin::Original,
    }
}

struct RowParser<'a> {
    line: usize,
    issues: &'a mut Vec<FieldIssue>,
}

impl RowParser<'_> {
    fn float(&mut self, field: &'static str, raw: Option<&str>) -> Option<f64> {
        let parsed = raw.and_then(|s| s.parse::<f64>().ok()).filter(|f| f.is_finite());
        if parsed.is_none() {
            self.record(field, raw);
        }
        parsed
    }

    fn int(&mut self, field: &'static str, raw: Option<&str>) -> Option<i64> {
        // Decimal cells are truncated toward zero
        let parsed = raw.and_then(|s| {
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        });
        if parsed.is_none() {
            self.record(field, raw);
        }
        parsed
    }

    fn record(&mut self, field: &'static str, raw: Option<&str>) {
        self.issues.push(FieldIssue {
            line: self.line,
            field,
            raw: raw.unwrap_or_default().to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelimitedLocation {
    Path(PathBuf),
    Url(String),
}

impl DelimitedLocation {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DelimitedLocation::Url(raw.to_string())
        } else {
            DelimitedLocation::Path(PathBuf::from(raw))
        }
    }
}

pub struct DelimitedSource {
    location: DelimitedLocation,
    client: reqwest::Client,
}

impl DelimitedSource {
    pub fn new(location: DelimitedLocation) -> Self {
        Self {
            location,
            client: reqwest::Client::new(),
        }
    }

    async fn read_text(&self) -> Result<String, LoadError> {
        match &self.location {
            DelimitedLocation::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.display().to_string(),
                        source,
                    })
            }
            DelimitedLocation::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| LoadError::Fetch(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(LoadError::Status(response.status().as_u16()));
                }
                response
                    .text()
                    .await
                    .map_err(|e| LoadError::Fetch(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl ReadingSource for DelimitedSource {
    async fn load(&self) -> Result<Snapshot, LoadError> {
        let text = self.read_text().await?;
        let load = parse_delimited(&text);

        for issue in &load.issues {
            tracing::warn!(
                line = issue.line,
                field = issue.field,
                raw = %issue.raw,
                "Non-numeric value in reading file"
            );
        }
        tracing::info!(
            readings = load.readings.len(),
            issues = load.issues.len(),
            "Loaded reading file"
        );

        Ok(Snapshot::new(load.readings))
    }
}
