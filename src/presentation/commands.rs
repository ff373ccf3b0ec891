// Command-line front-end: live map, static demo, submission and API queries
use crate::application::expansion::ExpandingSource;
use crate::application::map_renderer::{MapRenderer, RendererSettings};
use crate::application::refresh_service::{
    MapRefreshService, POLL_INTERVAL, RefreshHandle, SharedRenderer,
};
use crate::application::stress_api::ReadingSource;
use crate::application::submission_service::SubmissionController;
use crate::domain::reading::Position;
use crate::domain::snapshot::Snapshot;
use crate::domain::submission::SubmissionReceipt;
use crate::infrastructure::api_client::StressApiClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::delimited_source::{DelimitedLocation, DelimitedSource};
use crate::infrastructure::geolocation::FixedGeolocator;
use crate::presentation::console_surface::{ConsoleSurface, Viewport};
use crate::presentation::html_export::render_page;
use crate::presentation::mapping::score_text;
use anyhow::Context;
use chrono::Utc;
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, watch};

const WATCH_HELP: &str = "commands: r = refresh, <n> = open marker n, c = close popup, \
m = click map, p <crowd> <noise> <stress> [name] = submit reading, l = redraw, q = quit";

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Reading file path or http(s) URL (defaults to `demo.csv_path`).
    #[arg(long = "csv", value_name = "PATH_OR_URL")]
    pub csv: Option<String>,
    /// Interpolated points generated around each reading.
    #[arg(long = "points", value_name = "N")]
    pub points: Option<usize>,
    /// Seed for reproducible interpolation.
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,
    /// Also write the rendered map as a standalone HTML page.
    #[arg(long = "html", value_name = "PATH")]
    pub html: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Location name; a timestamped placeholder is used when omitted.
    #[arg(long = "name")]
    pub name: Option<String>,
    /// Crowd density, 0-100.
    #[arg(long = "crowd", default_value_t = 50)]
    pub crowd: i64,
    /// Noise level, 0-100.
    #[arg(long = "noise", default_value_t = 50)]
    pub noise: i64,
    /// Overall stress score, 0-100.
    #[arg(long = "stress", default_value_t = 50)]
    pub stress: i64,
    /// Latitude of this device (overrides `geolocation.lat`).
    #[arg(long = "lat", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Longitude of this device (overrides `geolocation.lng`).
    #[arg(long = "lng", allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

fn api_client(config: &AppConfig) -> anyhow::Result<Arc<StressApiClient>> {
    let client = StressApiClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    Ok(Arc::new(client))
}

fn viewport(config: &AppConfig) -> Viewport {
    Viewport {
        center: Position::new(config.map.center_lat, config.map.center_lng),
        zoom: config.map.zoom,
        min_zoom: config.map.min_zoom,
        max_zoom: config.map.max_zoom,
    }
}

fn renderer_settings(config: &AppConfig) -> RendererSettings {
    RendererSettings {
        fit_padding: config.map.fit_padding,
        ..Default::default()
    }
}

/// Live map against the API, refreshed every 30 seconds and on demand.
pub async fn watch(config: &AppConfig) -> anyhow::Result<()> {
    let api = api_client(config)?;
    let renderer: SharedRenderer<ConsoleSurface> = Arc::new(Mutex::new(MapRenderer::new(
        ConsoleSurface::stdout(viewport(config)),
        renderer_settings(config),
    )));
    let service = Arc::new(MapRefreshService::new(api.clone(), renderer.clone()));
    let (refresh, triggers) = RefreshHandle::channel();
    let (stop, shutdown) = watch::channel(false);

    tracing::info!(
        "Watching {} (every {}s)",
        config.api.base_url,
        POLL_INTERVAL.as_secs()
    );
    let poller = tokio::spawn(service.run(triggers, shutdown));

    let geolocator = Arc::new(FixedGeolocator::from_sources(None, None, &config.geolocation));
    let mut submissions = SubmissionController::new(api, geolocator);

    println!("{}", WATCH_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_watch_command(line.trim(), &renderer, &refresh, &mut submissions).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("Stopped reading commands: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    stop.send_replace(true);
    poller.await.context("Refresh loop panicked")?;
    Ok(())
}

async fn handle_watch_command(
    line: &str,
    renderer: &SharedRenderer<ConsoleSurface>,
    refresh: &RefreshHandle,
    submissions: &mut SubmissionController,
) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("q") => return false,
        Some("r") => {
            if !refresh.request() {
                println!("A refresh is already queued");
            }
        }
        Some("c") => {
            renderer.lock().await.dismiss_popup();
        }
        Some("m") => renderer.lock().await.background_clicked(),
        Some("l") => {
            let renderer = renderer.lock().await;
            print!("{}", renderer.surface().render_frame());
        }
        Some("p") => {
            let scores: Vec<i64> = parts.by_ref().take(3).filter_map(|p| p.parse().ok()).collect();
            let [crowd, noise, stress] = scores[..] else {
                println!("usage: p <crowd> <noise> <stress> [name]");
                return true;
            };
            let name = parts.collect::<Vec<_>>().join(" ");
            match submit_reading(submissions, &name, crowd, noise, stress).await {
                Ok(_) => {
                    submissions.close_and_refresh(refresh);
                }
                Err(e) => println!("❌ Submission Failed: {}", e),
            }
        }
        Some(other) => match other.parse::<usize>() {
            Ok(index) => {
                let mut renderer = renderer.lock().await;
                match renderer.marker_key(index) {
                    Some(key) => {
                        renderer.select(key);
                    }
                    None => println!("No marker #{}", index),
                }
            }
            Err(_) => println!("{}", WATCH_HELP),
        },
    }
    true
}

/// Acquire a location, fill in the form and submit it.
async fn submit_reading(
    controller: &mut SubmissionController,
    name: &str,
    crowd: i64,
    noise: i64,
    stress: i64,
) -> anyhow::Result<SubmissionReceipt> {
    let position = controller.open().await?;
    println!("Your location: Lat {:.6}, Lng {:.6}", position.lat, position.lng);

    let form = controller.form_mut();
    form.set_name(name);
    form.set_crowd(crowd);
    form.set_noise(noise);
    form.set_stress(stress);

    let receipt = controller.submit().await?;
    println!("✅ Submission Successful! {}", receipt.message);
    Ok(receipt)
}

/// One-shot submission from the command line.
pub async fn submit(config: &AppConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let api = api_client(config)?;
    let geolocator = Arc::new(FixedGeolocator::from_sources(
        args.lat,
        args.lng,
        &config.geolocation,
    ));
    let mut controller = SubmissionController::new(api, geolocator);

    let name = args.name.unwrap_or_default();
    submit_reading(&mut controller, &name, args.crowd, args.noise, args.stress)
        .await
        .context("Submission failed")?;
    println!("Thank you for contributing to the community data.");
    Ok(())
}

/// Static map from a reading file, padded with interpolated points.
pub async fn demo(config: &AppConfig, args: DemoArgs) -> anyhow::Result<()> {
    let raw_location = args.csv.unwrap_or_else(|| config.demo.csv_path.clone());
    let inner: Arc<dyn ReadingSource> =
        Arc::new(DelimitedSource::new(DelimitedLocation::parse(&raw_location)));

    let mut settings = config.expansion;
    if let Some(points) = args.points {
        settings.points_per_location = points;
    }
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let source = ExpandingSource::new(inner, settings, rng);

    let snapshot = match source.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Error loading stress data: {}", e);
            Snapshot::default()
        }
    };

    let mut renderer = MapRenderer::new(
        ConsoleSurface::stdout(viewport(config)),
        renderer_settings(config),
    );
    let report = renderer.refresh(snapshot);
    tracing::info!(
        markers = report.markers,
        skipped = report.skipped,
        "Rendered static map"
    );

    if let Some(path) = args.html {
        tokio::fs::write(&path, render_page(renderer.surface()))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote HTML map to {}", path.display());
    }
    Ok(())
}

/// Readings reported in the last hour.
pub async fn recent(config: &AppConfig) -> anyhow::Result<()> {
    let snapshot = api_client(config)?
        .recent()
        .await
        .context("Failed to load recent readings")?;

    println!("{} readings in the last hour", snapshot.readings.len());
    for reading in &snapshot.readings {
        println!(
            "  {:<30} stress {:>3}/100  crowd {:>3}%  noise {:>3} dB  {}",
            reading.display_name(),
            score_text(reading.stress_score),
            score_text(reading.crowd_density),
            score_text(reading.noise_level),
            reading.timestamp.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn stats(config: &AppConfig) -> anyhow::Result<()> {
    let stats = api_client(config)?
        .stats()
        .await
        .context("Failed to load statistics")?;

    let last_update = stats
        .last_update
        .as_deref()
        .and_then(crate::domain::reading::parse_timestamp)
        .map(|ts| crate::presentation::mapping::format_time_ago(ts, Utc::now()))
        .unwrap_or_else(|| "Unknown".to_string());

    println!("Total locations:  {}", stats.total_locations);
    println!("Seed locations:   {}", stats.seed_locations);
    println!("User submissions: {}", stats.user_submissions);
    println!("Average stress:   {:.1}", stats.average_stress);
    println!("Last update:      {}", last_update);
    Ok(())
}
