// Map renderer - reconciles each snapshot against the previous render
use crate::application::map_surface::{
    Bounds, HeatLayer, HeatLayerOptions, HeatPoint, MapSurface, Marker, MarkerKey, MarkerStyle,
    PanelCard, PanelSlot,
};
use crate::domain::reading::Reading;
use crate::domain::snapshot::{Fingerprint, Snapshot};
use crate::presentation::info_cards::{
    detail_cards, error_card, loading_card, popup_for, summary_cards,
};
use crate::presentation::mapping::stress_color;
use chrono::Utc;

#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Padding in pixels used for the one-time fit to the data.
    pub fit_padding: u32,
    pub heat: HeatLayerOptions,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            fit_padding: 40,
            heat: HeatLayerOptions::default(),
        }
    }
}

/// What happened to the focused reading during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Unfocused,
    Restored,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub markers: usize,
    pub skipped: usize,
    pub data_changed: bool,
    pub focus: FocusOutcome,
    pub fitted: bool,
}

pub struct MapRenderer<S: MapSurface> {
    surface: S,
    settings: RendererSettings,
    generation: u64,
    markers: Vec<Reading>,
    heat_layer_present: bool,
    current_open: Option<Reading>,
    open_popup: Option<MarkerKey>,
    last_fingerprint: Option<Fingerprint>,
    is_initial_load: bool,
    last_snapshot: Vec<Reading>,
}

impl<S: MapSurface> MapRenderer<S> {
    pub fn new(surface: S, settings: RendererSettings) -> Self {
        Self {
            surface,
            settings,
            generation: 0,
            markers: Vec::new(),
            heat_layer_present: false,
            current_open: None,
            open_popup: None,
            last_fingerprint: None,
            is_initial_load: true,
            last_snapshot: Vec::new(),
        }
    }

    /// Replace everything on the surface with `snapshot`, keeping the user's
    /// focus when the focused reading is unchanged.
    pub fn refresh(&mut self, snapshot: Snapshot) -> RenderReport {
        let fingerprint = Fingerprint::of(&snapshot);
        let data_changed = self.last_fingerprint != Some(fingerprint);
        self.last_fingerprint = Some(fingerprint);

        let readings = snapshot.readings;
        let had_focus = self.current_open.is_some();
        let restore_index = self.reconcile_focus(&readings, data_changed);

        self.surface.clear_markers();
        if self.heat_layer_present {
            self.surface.remove_heat_layer();
            self.heat_layer_present = false;
        }
        self.generation += 1;
        self.markers.clear();
        self.open_popup = None;

        let heat_points: Vec<HeatPoint> = readings
            .iter()
            .filter_map(|r| {
                r.position().map(|p| HeatPoint {
                    lat: p.lat,
                    lng: p.lng,
                    intensity: r.heat_intensity(),
                })
            })
            .collect();
        self.surface.add_heat_layer(HeatLayer {
            points: heat_points,
            options: self.settings.heat.clone(),
        });
        self.heat_layer_present = true;

        let now = Utc::now();
        let mut skipped = 0;
        let mut restore_key = None;
        for (idx, reading) in readings.iter().enumerate() {
            let Some(position) = reading.position() else {
                skipped += 1;
                continue;
            };

            let key = MarkerKey {
                generation: self.generation,
                index: self.markers.len(),
            };
            self.surface.add_marker(Marker {
                key,
                position,
                style: marker_style(reading),
                popup: popup_for(reading, now),
            });
            self.markers.push(reading.clone());

            if restore_index == Some(idx) {
                restore_key = Some(key);
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "Readings without coordinates were not plotted");
        }

        let focus = match (restore_key, restore_index) {
            (Some(key), Some(idx)) => {
                self.current_open = Some(readings[idx].clone());
                self.surface.open_popup(key);
                self.open_popup = Some(key);
                self.show_cards(detail_cards(&readings[idx], now));
                FocusOutcome::Restored
            }
            _ if had_focus => {
                self.current_open = None;
                FocusOutcome::Cleared
            }
            _ => FocusOutcome::Unfocused,
        };

        let mut fitted = false;
        if self.is_initial_load {
            if let Some(bounds) = Bounds::enclosing(readings.iter().filter_map(Reading::position)) {
                self.surface.fit_bounds(bounds, self.settings.fit_padding);
                fitted = true;
            }
            self.is_initial_load = false;
        }

        self.last_snapshot = readings;
        if self.current_open.is_none() {
            self.show_summary();
        }
        self.surface.present();

        RenderReport {
            markers: self.markers.len(),
            skipped,
            data_changed,
            focus,
            fitted,
        }
    }

    /// Index of the reading whose popup should be reopened, if any. Clears the
    /// focus when its reading vanished or its values changed.
    fn reconcile_focus(&mut self, readings: &[Reading], data_changed: bool) -> Option<usize> {
        let focus = self.current_open.as_ref()?;

        let matched = readings
            .iter()
            .position(|r| focus.id.is_some() && r.id == focus.id)
            .or_else(|| readings.iter().position(|r| focus.same_identity(r)));

        match matched {
            Some(idx) if !data_changed || readings[idx] == *focus => Some(idx),
            Some(_) => {
                tracing::debug!("Focused reading changed, closing its detail view");
                self.current_open = None;
                None
            }
            None => {
                tracing::debug!("Focused reading no longer listed");
                self.current_open = None;
                None
            }
        }
    }

    /// A marker was clicked. Keys from an older render are ignored.
    pub fn select(&mut self, key: MarkerKey) -> bool {
        let Some(reading) = self.marker_reading(key).cloned() else {
            return false;
        };
        self.show_cards(detail_cards(&reading, Utc::now()));
        self.current_open = Some(reading);
        self.surface.open_popup(key);
        self.open_popup = Some(key);
        self.surface.present();
        true
    }

    /// A marker's popup closed. Only clears the focus if that marker still holds it.
    pub fn popup_closed(&mut self, key: MarkerKey) -> bool {
        if self.open_popup == Some(key) {
            self.open_popup = None;
        }
        let Some(reading) = self.marker_reading(key) else {
            return false;
        };
        let still_focused = self
            .current_open
            .as_ref()
            .is_some_and(|open| open.same_identity(reading));
        if !still_focused {
            return false;
        }

        self.current_open = None;
        self.show_summary();
        self.surface.present();
        true
    }

    /// The user dismissed whichever popup is open.
    pub fn dismiss_popup(&mut self) -> bool {
        let Some(key) = self.open_popup else {
            return false;
        };
        self.surface.close_popup(key);
        self.popup_closed(key)
    }

    /// A click on the map away from any marker.
    pub fn background_clicked(&mut self) {
        if let Some(key) = self.open_popup.take() {
            self.surface.close_popup(key);
        }
        self.current_open = None;
        self.show_summary();
        self.surface.present();
    }

    pub fn show_loading(&mut self) {
        self.surface.set_panel_card(PanelSlot::One, loading_card());
        self.surface.present();
    }

    /// Reports a failed load. Markers and layers stay as they were.
    pub fn show_error(&mut self, message: &str) {
        self.surface.set_panel_card(PanelSlot::One, error_card(message));
        self.surface.present();
    }

    pub fn current_open(&self) -> Option<&Reading> {
        self.current_open.as_ref()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_key(&self, index: usize) -> Option<MarkerKey> {
        (index < self.markers.len()).then_some(MarkerKey {
            generation: self.generation,
            index,
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    fn marker_reading(&self, key: MarkerKey) -> Option<&Reading> {
        if key.generation != self.generation {
            return None;
        }
        self.markers.get(key.index)
    }

    fn show_summary(&mut self) {
        let cards = summary_cards(&self.last_snapshot, Utc::now());
        self.show_cards(cards);
    }

    fn show_cards(&mut self, cards: Vec<(PanelSlot, PanelCard)>) {
        for (slot, card) in cards {
            self.surface.set_panel_card(slot, card);
        }
    }
}

fn marker_style(reading: &Reading) -> MarkerStyle {
    let fill = stress_color(reading.stress_or_zero());
    if reading.is_user_submitted() {
        MarkerStyle::user_submitted(fill)
    } else if reading.is_interpolated() {
        MarkerStyle::interpolated(fill)
    } else {
        MarkerStyle::monitored(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::{Origin, Position, ReadingId, Source};
    use crate::presentation::console_surface::{ConsoleSurface, Viewport};

    fn renderer() -> MapRenderer<ConsoleSurface> {
        MapRenderer::new(ConsoleSurface::quiet(Viewport::default()), RendererSettings::default())
    }

    fn reading(id: i64, lat: f64, lng: f64, stress: i64) -> Reading {
        Reading {
            id: Some(ReadingId::Number(id)),
            name: Some(format!("Site {}", id)),
            lat: Some(lat),
            lng: Some(lng),
            crowd_density: Some(50),
            noise_level: Some(50),
            stress_score: Some(stress),
            ..Default::default()
        }
    }

    fn base() -> Vec<Reading> {
        vec![
            reading(1, -27.47, 153.02, 85),
            reading(2, -27.46, 153.03, 30),
        ]
    }

    #[test]
    fn test_end_to_end_single_reading() {
        let mut renderer = renderer();
        let input = vec![Reading {
            crowd_density: Some(90),
            noise_level: Some(80),
            ..reading(1, -27.47, 153.02, 85)
        }];

        let report = renderer.refresh(Snapshot::new(input));

        assert_eq!(report.markers, 1);
        let surface = renderer.surface();
        assert_eq!(surface.markers()[0].style.fill_color, "#d32f2f");
        let average = surface.panel_card(PanelSlot::Three);
        assert_eq!(average.title, "Average Stress");
        assert_eq!(average.headline.as_deref(), Some("85/100"));
    }

    #[test]
    fn test_identical_refresh_keeps_focus() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        let key = renderer.marker_key(0).unwrap();
        assert!(renderer.select(key));

        let report = renderer.refresh(Snapshot::new(base()));

        assert!(!report.data_changed);
        assert_eq!(report.focus, FocusOutcome::Restored);
        assert_eq!(renderer.current_open().and_then(|r| r.id.clone()), Some(ReadingId::Number(1)));
        let reopened = renderer.surface().open_popup_key().unwrap();
        assert_eq!(reopened.index, 0);
        assert_eq!(renderer.surface().panel_card(PanelSlot::One).title, "Site 1");
    }

    #[test]
    fn test_changed_stress_clears_focus() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        renderer.select(renderer.marker_key(0).unwrap());

        let mut changed = base();
        changed[0].stress_score = Some(40);
        let report = renderer.refresh(Snapshot::new(changed));

        assert!(report.data_changed);
        assert_eq!(report.focus, FocusOutcome::Cleared);
        assert!(renderer.current_open().is_none());
        assert_eq!(renderer.surface().panel_card(PanelSlot::One).title, "Live Map Overview");
        assert_eq!(renderer.surface().open_popup_key(), None);
    }

    #[test]
    fn test_focus_survives_unrelated_change() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        renderer.select(renderer.marker_key(0).unwrap());

        let mut changed = base();
        changed[1].stress_score = Some(99);
        let report = renderer.refresh(Snapshot::new(changed));

        assert!(report.data_changed);
        assert_eq!(report.focus, FocusOutcome::Restored);
    }

    #[test]
    fn test_focus_cleared_when_reading_disappears() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        renderer.select(renderer.marker_key(0).unwrap());

        let report = renderer.refresh(Snapshot::new(vec![base()[1].clone()]));
        assert_eq!(report.focus, FocusOutcome::Cleared);
    }

    #[test]
    fn test_missing_coordinates_are_skipped() {
        let mut renderer = renderer();
        let mut input = base();
        input.push(Reading {
            lat: None,
            ..reading(3, 0.0, 153.0, 70)
        });

        let report = renderer.refresh(Snapshot::new(input));

        assert_eq!(report.markers, 2);
        assert_eq!(report.skipped, 1);
        let heat = renderer.surface().heat_layer().unwrap();
        assert_eq!(heat.points.len(), 2);
        assert!((heat.points[0].intensity - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_happens_once() {
        let mut renderer = renderer();
        let first = renderer.refresh(Snapshot::new(base()));
        assert!(first.fitted);
        let bounds = renderer.surface().fitted_bounds();

        let shifted = vec![reading(1, -26.0, 152.0, 10), reading(9, -28.0, 154.0, 10)];
        let second = renderer.refresh(Snapshot::new(shifted));

        assert!(!second.fitted);
        assert_eq!(renderer.surface().fit_count(), 1);
        assert_eq!(renderer.surface().fitted_bounds(), bounds);
        assert_eq!(
            bounds,
            Some(Bounds {
                south_west: Position::new(-27.47, 153.02),
                north_east: Position::new(-27.46, 153.03),
            })
        );
    }

    #[test]
    fn test_error_keeps_markers() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));

        renderer.show_error("connection refused");

        assert_eq!(renderer.marker_count(), 2);
        assert_eq!(renderer.surface().markers().len(), 2);
        assert_eq!(renderer.surface().panel_card(PanelSlot::One).title, "Connection Error");
    }

    #[test]
    fn test_stale_popup_close_is_ignored() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        let first = renderer.marker_key(0).unwrap();
        let second = renderer.marker_key(1).unwrap();
        renderer.select(first);
        renderer.select(second);

        assert!(!renderer.popup_closed(first));
        assert_eq!(renderer.current_open().and_then(|r| r.id.clone()), Some(ReadingId::Number(2)));

        assert!(renderer.popup_closed(second));
        assert!(renderer.current_open().is_none());
        assert_eq!(renderer.surface().panel_card(PanelSlot::One).title, "Live Map Overview");
    }

    #[test]
    fn test_keys_from_previous_render_are_ignored() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        let old = renderer.marker_key(0).unwrap();
        renderer.refresh(Snapshot::new(base()));

        assert!(!renderer.select(old));
        assert!(renderer.current_open().is_none());
    }

    #[test]
    fn test_marker_styles() {
        let mut renderer = renderer();
        let user = Reading {
            source: Some(Source::User),
            ..reading(1, -27.47, 153.02, 10)
        };
        let interpolated = Reading {
            id: Some(ReadingId::Text("2-0".to_string())),
            origin: Origin::Interpolated {
                parent_id: Some(ReadingId::Number(2)),
            },
            ..reading(2, -27.46, 153.03, 50)
        };
        renderer.refresh(Snapshot::new(vec![user, interpolated, reading(3, -27.45, 153.04, 65)]));

        let markers = renderer.surface().markers();
        assert_eq!((markers[0].style.radius, markers[0].style.weight), (6, 2));
        assert_eq!(markers[1].style.radius, 3);
        assert_eq!(markers[2].style.radius, 5);
        assert_eq!(markers[2].style.fill_color, "#f57c00");
    }

    #[test]
    fn test_dismiss_popup_clears_focus() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        renderer.select(renderer.marker_key(1).unwrap());
        assert!(renderer.surface().open_popup_key().is_some());

        assert!(renderer.dismiss_popup());

        assert!(renderer.current_open().is_none());
        assert_eq!(renderer.surface().open_popup_key(), None);
        assert!(!renderer.dismiss_popup());
    }

    #[test]
    fn test_out_of_range_scores_render() {
        let mut renderer = renderer();
        let input: Vec<Reading> = serde_json::from_str(
            r#"[
                {"id": 1, "lat": -27.47, "lng": 153.02, "stressScore": 9e18},
                {"id": 2, "lat": -27.46, "lng": 153.03, "stressScore": 9e18},
                {"id": 3, "lat": -27.45, "lng": 153.04, "stressScore": -9e18}
            ]"#,
        )
        .unwrap();

        let report = renderer.refresh(Snapshot::new(input));

        assert_eq!(report.markers, 3);
        let surface = renderer.surface();
        let average = surface.panel_card(PanelSlot::Three);
        assert_eq!(average.headline.as_deref(), Some("100/100"));
        let heat = surface.heat_layer().unwrap();
        assert!(heat.points.iter().all(|p| (0.0..=1.0).contains(&p.intensity)));
    }

    #[test]
    fn test_focus_without_id_follows_coordinates() {
        let unnamed = |stress| Reading {
            id: None,
            ..reading(0, -27.47, 153.02, stress)
        };
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(vec![unnamed(60), reading(2, -27.46, 153.03, 30)]));
        assert!(renderer.select(renderer.marker_key(0).unwrap()));

        let report = renderer.refresh(Snapshot::new(vec![unnamed(60), reading(2, -27.46, 153.03, 30)]));
        assert_eq!(report.focus, FocusOutcome::Restored);
        assert_eq!(renderer.current_open().and_then(|r| r.stress_score), Some(60));
        assert_eq!(renderer.surface().open_popup_key(), renderer.marker_key(0));

        let report = renderer.refresh(Snapshot::new(vec![unnamed(75), reading(2, -27.46, 153.03, 30)]));
        assert!(report.data_changed);
        assert_eq!(report.focus, FocusOutcome::Cleared);
        assert!(renderer.current_open().is_none());
        assert_eq!(renderer.surface().panel_card(PanelSlot::Four).title, "Community Data");
    }

    #[test]
    fn test_background_click_reverts_to_summary() {
        let mut renderer = renderer();
        renderer.refresh(Snapshot::new(base()));
        renderer.select(renderer.marker_key(1).unwrap());
        assert_eq!(renderer.surface().panel_card(PanelSlot::Four).title, "Recommendation");

        renderer.background_clicked();

        assert!(renderer.current_open().is_none());
        assert_eq!(renderer.surface().panel_card(PanelSlot::Four).title, "Community Data");
    }
}
