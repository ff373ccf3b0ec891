// Score-to-visual lookups shared by markers, popups and the info panel
use chrono::{DateTime, Utc};

pub const VERY_HIGH_STRESS_COLOR: &str = "#d32f2f";
pub const HIGH_STRESS_COLOR: &str = "#f57c00";
pub const MODERATE_STRESS_COLOR: &str = "#fbc02d";
pub const LOW_STRESS_COLOR: &str = "#7cb342";
pub const VERY_LOW_STRESS_COLOR: &str = "#388e3c";

pub fn stress_color(score: i64) -> &'static str {
    match score {
        s if s >= 80 => VERY_HIGH_STRESS_COLOR,
        s if s >= 60 => HIGH_STRESS_COLOR,
        s if s >= 40 => MODERATE_STRESS_COLOR,
        s if s >= 20 => LOW_STRESS_COLOR,
        _ => VERY_LOW_STRESS_COLOR,
    }
}

pub fn stress_label(score: i64) -> &'static str {
    match score {
        s if s >= 80 => "Very High Stress",
        s if s >= 60 => "High Stress",
        s if s >= 40 => "Moderate Stress",
        s if s >= 20 => "Low Stress",
        _ => "Very Low Stress",
    }
}

pub fn recommendation(score: i64) -> &'static str {
    match score {
        s if s >= 80 => "❌ Avoid - High stress area",
        s if s >= 60 => "⚠️ Caution - Moderate stress",
        s if s >= 40 => "🟡 Fair - Some activity",
        s if s >= 20 => "✅ Good - Low stress",
        _ => "🌳 Excellent - Very peaceful",
    }
}

// Crowd and noise buckets are exclusive at the boundary, unlike stress.
pub fn crowd_label(crowd: i64) -> &'static str {
    match crowd {
        c if c > 80 => "Extremely busy",
        c if c > 60 => "Very busy",
        c if c > 40 => "Moderately busy",
        c if c > 20 => "Some people",
        _ => "Very quiet",
    }
}

pub fn noise_label(noise: i64) -> &'static str {
    match noise {
        n if n > 80 => "Extremely loud",
        n if n > 60 => "Very loud",
        n if n > 40 => "Moderate noise",
        n if n > 20 => "Quiet",
        _ => "Very quiet",
    }
}

/// Formats an optional score the way every panel shows it: the number, or `N/A`.
pub fn score_text(score: Option<i64>) -> String {
    score.map_or_else(|| "N/A".to_string(), |s| s.to_string())
}

/// "just now", "5 min ago", "2 hours ago", "3 days ago".
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hour{} ago", hours, plural(hours));
    }

    let days = hours / 24;
    format!("{} day{} ago", days, plural(days))
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}

/// Escape text for interpolation into HTML element content or quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
