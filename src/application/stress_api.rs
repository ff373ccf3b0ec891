// Ports to the outside world: reading sources, the submission endpoint and device location
use crate::domain::reading::Position;
use crate::domain::snapshot::Snapshot;
use crate::domain::submission::{SubmissionPayload, SubmissionReceipt};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Fetch(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    Malformed(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("request failed: {0}")]
    Fetch(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied. Please enable location access.")]
    PermissionDenied,

    #[error("Geolocation is not supported on this device")]
    Unsupported,

    #[error("Unable to retrieve your location: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Load the full current set of readings.
    async fn load(&self) -> Result<Snapshot, LoadError>;
}

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmitError>;
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    /// One-shot position lookup; callers do not retry.
    async fn current_position(&self) -> Result<Position, GeolocationError>;
}
