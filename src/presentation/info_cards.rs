// Info-panel and popup content for the map
use crate::application::map_surface::{PanelCard, PanelSlot, Popup};
use crate::domain::reading::Reading;
use crate::domain::summary::AreaSummary;
use crate::presentation::mapping::{
    crowd_label, format_time_ago, noise_label, recommendation, score_text, stress_color,
    stress_label,
};
use chrono::{DateTime, Utc};

/// Overview shown when nothing is focused. An empty list only rewrites slot one.
pub fn summary_cards(readings: &[Reading], now: DateTime<Utc>) -> Vec<(PanelSlot, PanelCard)> {
    let Some(summary) = AreaSummary::from_readings(readings) else {
        return vec![(
            PanelSlot::One,
            PanelCard::new("No Data").note("No locations available"),
        )];
    };

    let last_update = summary
        .most_recent
        .map(|ts| format_time_ago(ts, now))
        .unwrap_or_else(|| "Unknown".to_string());
    let submissions = summary.user_submissions;

    vec![
        (
            PanelSlot::One,
            PanelCard::new("Live Map Overview")
                .note("Click any marker for details")
                .note(format!("Last update: {}", last_update)),
        ),
        (
            PanelSlot::Two,
            PanelCard::new("Total Locations")
                .headline(summary.total.to_string())
                .note(format!(
                    "{} user submission{}",
                    submissions,
                    if submissions == 1 { "" } else { "s" }
                )),
        ),
        (
            PanelSlot::Three,
            PanelCard::new("Average Stress")
                .headline(format!("{}/100", summary.average_stress))
                .accent(stress_color(summary.average_stress))
                .note(stress_label(summary.average_stress)),
        ),
        (
            PanelSlot::Four,
            PanelCard::new("Community Data")
                .note("Help others by submitting your location's current conditions"),
        ),
    ]
}

pub fn detail_cards(reading: &Reading, now: DateTime<Utc>) -> Vec<(PanelSlot, PanelCard)> {
    let stress = reading.stress_or_zero();
    let crowd = reading.crowd_density.unwrap_or(0);
    let noise = reading.noise_level.unwrap_or(0);

    let mut heading = PanelCard::new(reading.display_name());
    if reading.is_user_submitted() {
        heading = heading.note("👤 User Submitted");
    }
    heading = heading
        .headline(format!("{}/100", score_text(reading.stress_score)))
        .accent(stress_color(stress));
    if let Some(ago) = updated_ago(reading, now) {
        heading = heading.note(format!("Updated {}", ago));
    }

    vec![
        (PanelSlot::One, heading),
        (
            PanelSlot::Two,
            PanelCard::new("Crowd Density")
                .headline(format!("{}%", score_text(reading.crowd_density)))
                .note(crowd_label(crowd)),
        ),
        (
            PanelSlot::Three,
            PanelCard::new("Noise Level")
                .headline(format!("{} dB", score_text(reading.noise_level)))
                .note(noise_label(noise)),
        ),
        (
            PanelSlot::Four,
            PanelCard::new("Recommendation").headline(recommendation(stress)),
        ),
    ]
}

pub fn loading_card() -> PanelCard {
    PanelCard::new("Loading...").note("Fetching latest data")
}

pub fn error_card(message: &str) -> PanelCard {
    PanelCard::new("Connection Error")
        .note("Unable to load data from server")
        .note(message)
}

pub fn popup_for(reading: &Reading, now: DateTime<Utc>) -> Popup {
    let mut lines = Vec::new();
    lines.push(
        if reading.is_user_submitted() {
            "👤 User Submitted"
        } else if reading.is_interpolated() {
            "Interpolated point"
        } else {
            "📍 Monitored Location"
        }
        .to_string(),
    );
    if let Some(ago) = updated_ago(reading, now) {
        lines.push(format!("Updated {}", ago));
    }
    lines.push(format!("Stress Score: {}/100", score_text(reading.stress_score)));
    lines.push(format!("Crowd: {}%", score_text(reading.crowd_density)));
    lines.push(format!("Noise: {} dB", score_text(reading.noise_level)));

    Popup {
        title: reading.display_name().to_string(),
        lines,
    }
}

fn updated_ago(reading: &Reading, now: DateTime<Utc>) -> Option<String> {
    reading.parsed_timestamp().map(|ts| format_time_ago(ts, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::Source;

    fn sample() -> Reading {
        Reading {
            name: Some("Queen Street Mall".to_string()),
            lat: Some(-27.4698),
            lng: Some(153.0251),
            crowd_density: Some(85),
            noise_level: Some(78),
            stress_score: Some(82),
            source: Some(Source::User),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_summary_only_touches_first_slot() {
        let cards = summary_cards(&[], Utc::now());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].0, PanelSlot::One);
        assert_eq!(cards[0].1.title, "No Data");
    }

    #[test]
    fn test_summary_cards_report_average() {
        let cards = summary_cards(&[sample()], Utc::now());
        let (_, average) = &cards[2];
        assert_eq!(average.headline.as_deref(), Some("82/100"));
        assert_eq!(average.accent, Some("#d32f2f"));
        assert_eq!(cards[1].1.notes, vec!["1 user submission".to_string()]);
        assert!(cards[0].1.notes.contains(&"Last update: Unknown".to_string()));
    }

    #[test]
    fn test_detail_cards_handle_missing_scores() {
        let reading = Reading {
            crowd_density: None,
            ..sample()
        };
        let cards = detail_cards(&reading, Utc::now());
        assert_eq!(cards[0].1.title, "Queen Street Mall");
        assert_eq!(cards[1].1.headline.as_deref(), Some("N/A%"));
        assert_eq!(cards[2].1.notes, vec!["Very loud".to_string()]);
        assert_eq!(cards[3].1.headline.as_deref(), Some("❌ Avoid - High stress area"));
    }

    #[test]
    fn test_popup_lines() {
        let popup = popup_for(&sample(), Utc::now());
        assert_eq!(popup.title, "Queen Street Mall");
        assert_eq!(popup.lines[0], "👤 User Submitted");
        assert!(popup.lines.contains(&"Noise: 78 dB".to_string()));
    }
}
