// Rendering surface abstraction - the map widget the renderer drives
use crate::domain::reading::Position;

/// Identifies a marker within one render generation. Keys from an older
/// generation no longer refer to anything on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    pub generation: u64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub radius: u32,
    pub fill_color: &'static str,
    pub border_color: &'static str,
    pub weight: u32,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl MarkerStyle {
    pub fn user_submitted(fill_color: &'static str) -> Self {
        Self {
            radius: 6,
            fill_color,
            border_color: "#fff",
            weight: 2,
            opacity: 1.0,
            fill_opacity: 0.9,
        }
    }

    pub fn monitored(fill_color: &'static str) -> Self {
        Self {
            radius: 5,
            fill_color,
            border_color: "#fff",
            weight: 1,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }

    pub fn interpolated(fill_color: &'static str) -> Self {
        Self {
            radius: 3,
            fill_color,
            border_color: "#fff",
            weight: 1,
            opacity: 1.0,
            fill_opacity: 1.0,
        }
    }
}

/// Structured popup body; surfaces decide how to lay it out.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub key: MarkerKey,
    pub position: Position,
    pub style: MarkerStyle,
    pub popup: Popup,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatLayerOptions {
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u8,
    pub max: f64,
    pub min_opacity: f64,
    pub gradient: Vec<(f64, &'static str)>,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        Self {
            radius: 35,
            blur: 25,
            max_zoom: 16,
            max: 1.0,
            min_opacity: 0.4,
            gradient: vec![
                (0.4, "blue"),
                (0.6, "cyan"),
                (0.7, "lime"),
                (0.8, "yellow"),
                (1.0, "red"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatLayer {
    pub points: Vec<HeatPoint>,
    pub options: HeatLayerOptions,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: Position,
    pub north_east: Position,
}

impl Bounds {
    /// Smallest box containing every position, or `None` when there are none.
    pub fn enclosing<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Bounds {
                    south_west: p,
                    north_east: p,
                },
                Some(b) => Bounds {
                    south_west: Position::new(b.south_west.lat.min(p.lat), b.south_west.lng.min(p.lng)),
                    north_east: Position::new(b.north_east.lat.max(p.lat), b.north_east.lng.max(p.lng)),
                },
            })
        })
    }
}

/// The four summary-panel slots next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelSlot {
    One,
    Two,
    Three,
    Four,
}

impl PanelSlot {
    pub const ALL: [PanelSlot; 4] = [PanelSlot::One, PanelSlot::Two, PanelSlot::Three, PanelSlot::Four];

    pub fn index(self) -> usize {
        match self {
            PanelSlot::One => 0,
            PanelSlot::Two => 1,
            PanelSlot::Three => 2,
            PanelSlot::Four => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelCard {
    pub title: String,
    pub headline: Option<String>,
    pub accent: Option<&'static str>,
    pub notes: Vec<String>,
}

impl PanelCard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }

    pub fn accent(mut self, color: &'static str) -> Self {
        self.accent = Some(color);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Operations the renderer needs from a map widget.
pub trait MapSurface: Send {
    fn clear_markers(&mut self);

    fn add_marker(&mut self, marker: Marker);

    fn remove_heat_layer(&mut self);

    fn add_heat_layer(&mut self, layer: HeatLayer);

    fn open_popup(&mut self, key: MarkerKey);

    fn close_popup(&mut self, key: MarkerKey);

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32);

    fn set_panel_card(&mut self, slot: PanelSlot, card: PanelCard);

    /// Called once the renderer has finished a batch of changes.
    fn present(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_enclosing() {
        let bounds = Bounds::enclosing(vec![
            Position::new(-27.47, 153.02),
            Position::new(-27.38, 153.11),
            Position::new(-27.50, 152.97),
        ])
        .unwrap();

        assert_eq!(bounds.south_west, Position::new(-27.50, 152.97));
        assert_eq!(bounds.north_east, Position::new(-27.38, 153.11));
        assert_eq!(Bounds::enclosing(Vec::new()), None);
    }
}
