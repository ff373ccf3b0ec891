use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/stress_map.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub map: MapSettings,
    pub expansion: ExpansionSettings,
    pub demo: DemoSettings,
    #[serde(default)]
    pub geolocation: GeolocationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub fit_padding: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ExpansionSettings {
    /// Interpolated siblings generated per real reading.
    pub points_per_location: usize,
    /// Maximum offset from the parent, in degrees.
    pub spread_radius: f64,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            points_per_location: 5,
            spread_radius: 0.0035,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoSettings {
    pub csv_path: String,
}

/// Fixed device position used by the command-line geolocator.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeolocationSettings {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Defaults, then the optional TOML file, then `STRESS_MAP__SECTION__KEY` variables.
pub fn load_app_config_from(path: &Path) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("api.base_url", "http://localhost:5001/api")?
        .set_default("api.timeout_secs", 10_i64)?
        .set_default("map.center_lat", -27.46860)?
        .set_default("map.center_lng", 153.02230)?
        .set_default("map.zoom", 13_i64)?
        .set_default("map.min_zoom", 12_i64)?
        .set_default("map.max_zoom", 18_i64)?
        .set_default("map.fit_padding", 40_i64)?
        .set_default("expansion.points_per_location", 5_i64)?
        .set_default("expansion.spread_radius", 0.0035)?
        .set_default("demo.csv_path", "data.csv")?
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("STRESS_MAP").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
