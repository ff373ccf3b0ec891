// Device location for the command line: a position fixed by flags or configuration
use crate::application::stress_api::{GeolocationError, Geolocator};
use crate::domain::reading::Position;
use crate::infrastructure::config::GeolocationSettings;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    position: Option<(f64, f64)>,
}

impl FixedGeolocator {
    pub fn new(lat: Option<f64>, lng: Option<f64>) -> Self {
        let position = match (lat, lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        };
        Self { position }
    }

    /// Flags take precedence over the configured position.
    pub fn from_sources(lat: Option<f64>, lng: Option<f64>, settings: &GeolocationSettings) -> Self {
        match (lat, lng) {
            (Some(_), Some(_)) => Self::new(lat, lng),
            _ => Self::new(settings.lat, settings.lng),
        }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        let Some((lat, lng)) = self.position else {
            return Err(GeolocationError::Unsupported);
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(GeolocationError::Unavailable(format!(
                "coordinates out of range: {}, {}",
                lat, lng
            )));
        }
        Ok(Position::new(lat, lng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flags_override_config() {
        let settings = GeolocationSettings {
            lat: Some(-27.0),
            lng: Some(153.0),
        };
        let locator = FixedGeolocator::from_sources(Some(-27.5), Some(152.9), &settings);
        assert_eq!(locator.current_position().await, Ok(Position::new(-27.5, 152.9)));

        let locator = FixedGeolocator::from_sources(Some(-27.5), None, &settings);
        assert_eq!(locator.current_position().await, Ok(Position::new(-27.0, 153.0)));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_position() {
        let locator = FixedGeolocator::new(None, None);
        assert_eq!(locator.current_position().await, Err(GeolocationError::Unsupported));

        let locator = FixedGeolocator::new(Some(120.0), Some(0.0));
        assert!(matches!(
            locator.current_position().await,
            Err(GeolocationError::Unavailable(_))
        ));
    }
}
