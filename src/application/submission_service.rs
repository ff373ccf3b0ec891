// Submission form controller - one location fix, three sliders, one POST
use crate::application::refresh_service::RefreshHandle;
use crate::application::stress_api::{GeolocationError, Geolocator, SubmissionGateway, SubmitError};
use crate::domain::reading::Position;
use crate::domain::submission::{Score, SubmissionPayload, SubmissionReceipt};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum FormStatus {
    Closed,
    RequestingLocation,
    LocationFailed(String),
    Ready,
    Submitting,
    Submitted { message: String },
    Failed { error: String },
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Location not available. Please try again.")]
    LocationUnavailable,

    #[error(transparent)]
    Gateway(#[from] SubmitError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    name: String,
    crowd: Score,
    noise: Score,
    stress: Score,
}

impl SubmissionForm {
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_crowd(&mut self, value: i64) {
        self.crowd = Score::clamped(value);
    }

    pub fn set_noise(&mut self, value: i64) {
        self.noise = Score::clamped(value);
    }

    pub fn set_stress(&mut self, value: i64) {
        self.stress = Score::clamped(value);
    }

    pub fn crowd(&self) -> u8 {
        self.crowd.value()
    }

    pub fn noise(&self) -> u8 {
        self.noise.value()
    }

    pub fn stress(&self) -> u8 {
        self.stress.value()
    }

    /// The typed name, or a `Location HH:MM:SS` placeholder when blank.
    fn resolved_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            format!("Location {}", chrono::Local::now().format("%H:%M:%S"))
        } else {
            trimmed.to_string()
        }
    }
}

pub struct SubmissionController {
    gateway: Arc<dyn SubmissionGateway>,
    geolocator: Arc<dyn Geolocator>,
    position: Option<Position>,
    form: SubmissionForm,
    status: watch::Sender<FormStatus>,
}

impl SubmissionController {
    pub fn new(gateway: Arc<dyn SubmissionGateway>, geolocator: Arc<dyn Geolocator>) -> Self {
        let (status, _) = watch::channel(FormStatus::Closed);
        Self {
            gateway,
            geolocator,
            position: None,
            form: SubmissionForm::default(),
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FormStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> FormStatus {
        self.status.borrow().clone()
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn form(&self) -> &SubmissionForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SubmissionForm {
        &mut self.form
    }

    /// Open the form and ask for the device location once.
    pub async fn open(&mut self) -> Result<Position, GeolocationError> {
        self.set_status(FormStatus::RequestingLocation);
        match self.geolocator.current_position().await {
            Ok(position) => {
                tracing::debug!(lat = position.lat, lng = position.lng, "Device location acquired");
                self.position = Some(position);
                self.set_status(FormStatus::Ready);
                Ok(position)
            }
            Err(e) => {
                tracing::warn!("Geolocation failed: {}", e);
                self.position = None;
                self.set_status(FormStatus::LocationFailed(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        self.position.is_some()
            && matches!(self.status(), FormStatus::Ready | FormStatus::Failed { .. })
    }

    /// POST the current form. Submission stays disabled while the request runs
    /// and is re-enabled on failure or if the request is abandoned.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, SubmissionError> {
        let Some(position) = self.position else {
            return Err(SubmissionError::LocationUnavailable);
        };

        let payload = SubmissionPayload::new(
            self.form.resolved_name(),
            position,
            self.form.crowd,
            self.form.noise,
            self.form.stress,
        );

        self.set_status(FormStatus::Submitting);
        let mut pending = PendingSubmission {
            status: &self.status,
            settled: false,
        };
        let result = self.gateway.submit(&payload).await;
        pending.settled = true;

        match result {
            Ok(receipt) => {
                tracing::info!(name = %payload.name, "Submission accepted: {}", receipt.message);
                self.set_status(FormStatus::Submitted {
                    message: receipt.message.clone(),
                });
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!("Submission failed: {}", e);
                self.set_status(FormStatus::Failed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Reset the form and forget the position.
    pub fn close(&mut self) {
        self.form = SubmissionForm::default();
        self.position = None;
        self.set_status(FormStatus::Closed);
    }

    /// "View on map": close, then ask the renderer to reload so the new reading shows up.
    pub fn close_and_refresh(&mut self, refresh: &RefreshHandle) -> bool {
        self.close();
        refresh.request()
    }

    fn set_status(&self, status: FormStatus) {
        self.status.send_replace(status);
    }
}

// Puts the form back to `Ready` when a submit future is dropped mid-request.
struct PendingSubmission<'a> {
    status: &'a watch::Sender<FormStatus>,
    settled: bool,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Submission abandoned before the server replied");
            self.status.send_replace(FormStatus::Ready);
        }
    }
}
