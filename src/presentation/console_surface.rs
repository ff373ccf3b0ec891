// Terminal map surface - keeps the rendered state and prints it as text frames
use crate::application::map_surface::{
    Bounds, HeatLayer, MapSurface, Marker, MarkerKey, PanelCard, PanelSlot,
};
use crate::domain::reading::Position;
use std::fmt::Write as _;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Position,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Position::new(-27.46860, 153.02230),
            zoom: 13,
            min_zoom: 12,
            max_zoom: 18,
        }
    }
}

pub struct ConsoleSurface {
    viewport: Viewport,
    markers: Vec<Marker>,
    heat_layer: Option<HeatLayer>,
    open_popup: Option<MarkerKey>,
    fitted: Option<Bounds>,
    fit_count: usize,
    panel: [PanelCard; 4],
    out: Option<Box<dyn Write + Send>>,
}

impl ConsoleSurface {
    /// Surface that prints a frame to stdout after every batch of changes.
    pub fn stdout(viewport: Viewport) -> Self {
        Self::with_output(viewport, Some(Box::new(std::io::stdout())))
    }

    /// Surface that only records state.
    pub fn quiet(viewport: Viewport) -> Self {
        Self::with_output(viewport, None)
    }

    fn with_output(mut viewport: Viewport, out: Option<Box<dyn Write + Send>>) -> Self {
        // Not `clamp`: inverted limits must not panic
        viewport.zoom = viewport.zoom.max(viewport.min_zoom).min(viewport.max_zoom);
        Self {
            viewport,
            markers: Vec::new(),
            heat_layer: None,
            open_popup: None,
            fitted: None,
            fit_count: 0,
            panel: Default::default(),
            out,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn heat_layer(&self) -> Option<&HeatLayer> {
        self.heat_layer.as_ref()
    }

    pub fn panel_card(&self, slot: PanelSlot) -> &PanelCard {
        &self.panel[slot.index()]
    }

    pub fn open_popup_key(&self) -> Option<MarkerKey> {
        self.open_popup
    }

    pub fn fitted_bounds(&self) -> Option<Bounds> {
        self.fitted
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    pub fn render_frame(&self) -> String {
        let mut frame = String::new();
        let heat_points = self.heat_layer.as_ref().map_or(0, |h| h.points.len());
        let _ = writeln!(
            frame,
            "=== stress map: {} markers, {} heat points, {} ===",
            self.markers.len(),
            heat_points,
            self.describe_view()
        );

        for (slot, card) in PanelSlot::ALL.iter().zip(self.panel.iter()) {
            if card.title.is_empty() {
                continue;
            }
            let mut line = format!("[{}] {}", slot.index() + 1, card.title);
            if let Some(headline) = &card.headline {
                let _ = write!(line, " | {}", headline);
            }
            for note in &card.notes {
                let _ = write!(line, " | {}", note);
            }
            let _ = writeln!(frame, "{}", line);
        }

        for marker in &self.markers {
            let _ = writeln!(
                frame,
                "  #{:<3} {} r{} ({:.5}, {:.5}) {}",
                marker.key.index,
                marker.style.fill_color,
                marker.style.radius,
                marker.position.lat,
                marker.position.lng,
                marker.popup.title
            );
        }

        if let Some(marker) = self.open_popup.and_then(|key| self.marker(key)) {
            let _ = writeln!(frame, "--- {} ---", marker.popup.title);
            for line in &marker.popup.lines {
                let _ = writeln!(frame, "    {}", line);
            }
        }

        frame
    }

    fn describe_view(&self) -> String {
        match self.fitted {
            Some(b) => format!(
                "view ({:.4}, {:.4})..({:.4}, {:.4})",
                b.south_west.lat, b.south_west.lng, b.north_east.lat, b.north_east.lng
            ),
            None => format!(
                "view centre ({:.4}, {:.4}) zoom {} ({}-{})",
                self.viewport.center.lat,
                self.viewport.center.lng,
                self.viewport.zoom,
                self.viewport.min_zoom,
                self.viewport.max_zoom
            ),
        }
    }

    fn marker(&self, key: MarkerKey) -> Option<&Marker> {
        self.markers.iter().find(|m| m.key == key)
    }
}

impl MapSurface for ConsoleSurface {
    fn clear_markers(&mut self) {
        self.markers.clear();
        self.open_popup = None;
    }

    fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    fn remove_heat_layer(&mut self) {
        self.heat_layer = None;
    }

    fn add_heat_layer(&mut self, layer: HeatLayer) {
        self.heat_layer = Some(layer);
    }

    fn open_popup(&mut self, key: MarkerKey) {
        if self.marker(key).is_some() {
            self.open_popup = Some(key);
        }
    }

    fn close_popup(&mut self, key: MarkerKey) {
        if self.open_popup == Some(key) {
            self.open_popup = None;
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32) {
        tracing::debug!(padding, "Fitting viewport to data bounds");
        self.fitted = Some(bounds);
        self.fit_count += 1;
    }

    fn set_panel_card(&mut self, slot: PanelSlot, card: PanelCard) {
        self.panel[slot.index()] = card;
    }

    fn present(&mut self) {
        let frame = self.render_frame();
        if let Some(out) = self.out.as_mut() {
            if let Err(e) = out.write_all(frame.as_bytes()).and_then(|_| out.flush()) {
                tracing::warn!("Failed to write map frame: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::map_surface::{MarkerStyle, Popup};

    #[test]
    fn test_frame_lists_markers_and_open_popup() {
        let mut surface = ConsoleSurface::quiet(Viewport::default());
        let key = MarkerKey {
            generation: 1,
            index: 0,
        };
        surface.add_marker(Marker {
            key,
            position: Position::new(-27.47, 153.02),
            style: MarkerStyle::monitored("#d32f2f"),
            popup: Popup {
                title: "Central Station".to_string(),
                lines: vec!["Stress Score: 90/100".to_string()],
            },
        });
        surface.set_panel_card(PanelSlot::Three, PanelCard::new("Average Stress").headline("90/100"));
        surface.open_popup(key);

        let frame = surface.render_frame();
        assert!(frame.contains("1 markers"));
        assert!(frame.contains("[3] Average Stress | 90/100"));
        assert!(frame.contains("--- Central Station ---"));
        assert!(frame.contains("Stress Score: 90/100"));
    }

    #[test]
    fn test_popup_for_unknown_marker_is_ignored() {
        let mut surface = ConsoleSurface::quiet(Viewport::default());
        surface.open_popup(MarkerKey {
            generation: 3,
            index: 9,
        });
        assert_eq!(surface.open_popup_key(), None);
    }

    #[test]
    fn test_initial_zoom_is_held_within_limits() {
        let surface = ConsoleSurface::quiet(Viewport::default());
        assert!(surface.render_frame().contains("zoom 13 (12-18)"));

        let surface = ConsoleSurface::quiet(Viewport {
            zoom: 3,
            ..Viewport::default()
        });
        assert!(surface.render_frame().contains("zoom 12 (12-18)"));

        let surface = ConsoleSurface::quiet(Viewport {
            zoom: 21,
            ..Viewport::default()
        });
        assert!(surface.render_frame().contains("zoom 18 (12-18)"));
    }
}
