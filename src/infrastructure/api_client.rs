// HTTP client for the readings API (listing, recent, stats, submit)
use crate::application::stress_api::{
    LoadError, ReadingSource, SubmissionGateway, SubmitError,
};
use crate::domain::reading::Reading;
use crate::domain::snapshot::Snapshot;
use crate::domain::submission::{SubmissionPayload, SubmissionReceipt};
use crate::domain::summary::ServiceStats;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ETAG;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StressApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    success: bool,
    #[serde(default)]
    locations: Option<Vec<Reading>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    success: bool,
    #[serde(default)]
    stats: Option<ServiceStats>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    location: Option<Reading>,
}

impl StressApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Readings from the last hour.
    pub async fn recent(&self) -> Result<Snapshot, LoadError> {
        self.fetch_listing("recent").await
    }

    pub async fn stats(&self) -> Result<ServiceStats, LoadError> {
        let response = self
            .client
            .get(self.url("stats"))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoadError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<StatsResponse>()
            .await
            .map_err(|e| LoadError::Malformed(e.to_string()))?;

        match body {
            StatsResponse {
                success: true,
                stats: Some(stats),
                ..
            } => Ok(stats),
            StatsResponse { error, .. } => Err(LoadError::Rejected(
                error.unwrap_or_else(|| "Invalid API response".to_string()),
            )),
        }
    }

    async fn fetch_listing(&self, path: &str) -> Result<Snapshot, LoadError> {
        let url = self.url(path);
        tracing::debug!("Fetching readings from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoadError::Status(response.status().as_u16()));
        }

        let version = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .json::<ListingResponse>()
            .await
            .map_err(|e| LoadError::Malformed(e.to_string()))?;

        match body {
            ListingResponse {
                success: true,
                locations: Some(locations),
                ..
            } => Ok(Snapshot::new(locations).with_version(version)),
            ListingResponse { error, .. } => Err(LoadError::Rejected(
                error.unwrap_or_else(|| "Invalid API response".to_string()),
            )),
        }
    }
}

#[async_trait]
impl ReadingSource for StressApiClient {
    async fn load(&self) -> Result<Snapshot, LoadError> {
        self.fetch_listing("locations").await
    }
}

#[async_trait]
impl SubmissionGateway for StressApiClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmitError> {
        let response = self
            .client
            .post(self.url("submit"))
            .json(payload)
            .send()
            .await
            .map_err(|e| SubmitError::Fetch(e.to_string()))?;

        // 4xx replies still carry a JSON `error` worth showing.
        let status = response.status();
        let body = match response.json::<SubmitResponse>().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(SubmitError::Status(status.as_u16())),
            Err(e) => return Err(SubmitError::Malformed(e.to_string())),
        };

        if body.success {
            Ok(SubmissionReceipt {
                message: body.message.unwrap_or_default(),
                location: body.location,
            })
        } else {
            Err(SubmitError::Rejected(
                body.error.unwrap_or_else(|| "Submission failed".to_string()),
            ))
        }
    }
}
