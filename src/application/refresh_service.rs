// Refresh service - periodic and manual reloads applied to the shared renderer
use crate::application::map_renderer::{MapRenderer, RenderReport};
use crate::application::map_surface::MapSurface;
use crate::application::stress_api::{LoadError, ReadingSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Poll cadence of the live map. Fixed, not a runtime setting.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Shows the loading state first (initial load, manual refresh).
    Visible,
    /// Poll ticks: the panel is left alone until data arrives.
    Silent,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Applied(RenderReport),
    /// A newer refresh was applied while this one was in flight.
    Superseded,
    Failed(LoadError),
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshRequest;

/// Cloneable handle used to ask the running service for a manual refresh.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<RefreshRequest>,
}

impl RefreshHandle {
    pub fn channel() -> (Self, mpsc::Receiver<RefreshRequest>) {
        let (tx, rx) = mpsc::channel(8);
        (Self { tx }, rx)
    }

    /// Returns false if the service is gone or already has requests queued.
    pub fn request(&self) -> bool {
        self.tx.try_send(RefreshRequest).is_ok()
    }
}

pub type SharedRenderer<S> = Arc<Mutex<MapRenderer<S>>>;

pub struct MapRefreshService<S: MapSurface> {
    source: Arc<dyn ReadingSource>,
    renderer: SharedRenderer<S>,
    issued: AtomicU64,
    applied: AtomicU64,
}

impl<S: MapSurface + 'static> MapRefreshService<S> {
    pub fn new(source: Arc<dyn ReadingSource>, renderer: SharedRenderer<S>) -> Self {
        Self {
            source,
            renderer,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    pub fn renderer(&self) -> SharedRenderer<S> {
        self.renderer.clone()
    }

    /// Load and apply one snapshot. Results are applied in issue order: a refresh
    /// that finishes after a newer one has been applied is dropped.
    pub async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        if mode == RefreshMode::Visible {
            self.renderer.lock().await.show_loading();
        }

        let result = self.source.load().await;

        let mut renderer = self.renderer.lock().await;
        if self.applied.load(Ordering::SeqCst) > seq {
            tracing::debug!(seq, "Dropping superseded refresh result");
            return RefreshOutcome::Superseded;
        }
        self.applied.store(seq, Ordering::SeqCst);

        match result {
            Ok(snapshot) => {
                tracing::info!("Loaded {} locations", snapshot.readings.len());
                let report = renderer.refresh(snapshot);
                tracing::debug!(
                    markers = report.markers,
                    skipped = report.skipped,
                    changed = report.data_changed,
                    focus = ?report.focus,
                    "Map refreshed"
                );
                RefreshOutcome::Applied(report)
            }
            Err(e) => {
                tracing::error!("Error loading locations: {}", e);
                renderer.show_error(&e.to_string());
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Initial load, then a silent refresh every `POLL_INTERVAL` plus a visible one
    /// per manual request, until `shutdown` flips or its sender is dropped.
    pub async fn run(
        self: Arc<Self>,
        triggers: mpsc::Receiver<RefreshRequest>,
        shutdown: watch::Receiver<bool>,
    ) {
        self.run_every(POLL_INTERVAL, triggers, shutdown).await
    }

    pub(crate) async fn run_every(
        self: Arc<Self>,
        period: Duration,
        mut triggers: mpsc::Receiver<RefreshRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        self.spawn_refresh(RefreshMode::Visible);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.spawn_refresh(RefreshMode::Silent),
                Some(_) = triggers.recv() => self.spawn_refresh(RefreshMode::Visible),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Stopping map refresh loop");
                        break;
                    }
                }
            }
        }
    }

    // Refreshes run as their own tasks so the tick cadence does not depend on
    // how long a load takes.
    fn spawn_refresh(self: &Arc<Self>, mode: RefreshMode) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.refresh(mode).await;
        });
    }
}
