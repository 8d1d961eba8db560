//! Chart styling hints.
//!
//! Colours follow the event family so the same event looks the same on every
//! chart; the female group is drawn dashed.

use crate::models::{Gender, SeriesStyle};

const NEUTRAL: &str = "rgba(99, 110, 114, 1)";

const FALLBACK_PALETTE: [&str; 3] = [
    "rgba(54, 162, 235, 1)",
    "rgba(255, 99, 132, 1)",
    "rgba(75, 192, 192, 1)",
];

const FEMALE_DASH: [u32; 2] = [5, 5];

/// Colour for an event family, if it has one.
pub fn event_color(event_name: &str) -> Option<&'static str> {
    // "AP60" contains "P60", so it is checked first
    if event_name.contains("AR60") {
        Some("rgba(218, 165, 32, 1)")
    } else if event_name.contains("SB3x20") {
        Some("rgba(0, 100, 0, 1)")
    } else if event_name.contains("AP60") {
        Some("rgba(13, 0, 255, 1)")
    } else if event_name.contains("P60") {
        Some("rgba(184, 0, 163, 1)")
    } else if event_name.contains("BP") {
        Some("rgba(108, 92, 231, 1)")
    } else {
        None
    }
}

/// Translucent variant of an `rgba(..., 1)` colour for fills.
pub fn translucent(color: &str) -> String {
    match color.strip_suffix("1)") {
        Some(prefix) => format!("{}0.1)", prefix),
        None => color.to_string(),
    }
}

/// Style for an event line; events without a family colour rotate through
/// the fallback palette by `index`.
pub fn event_style(event_name: &str, index: usize) -> SeriesStyle {
    let color = event_color(event_name)
        .unwrap_or(FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()]);
    SeriesStyle {
        border_color: color.to_string(),
        background_color: translucent(color),
        border_dash: Vec::new(),
        span_gaps: true,
    }
}

/// Style for a team series keyed by event and optionally by gender.
pub fn team_style(event_name: &str, gender: Option<Gender>) -> SeriesStyle {
    let color = event_color(event_name).unwrap_or(NEUTRAL);
    let border_dash = match gender {
        Some(Gender::Female) => FEMALE_DASH.to_vec(),
        _ => Vec::new(),
    };
    SeriesStyle {
        border_color: color.to_string(),
        background_color: color.to_string(),
        border_dash,
        span_gaps: true,
    }
}

/// Style for a per-gender series on an event chart.
pub fn gender_style(event_name: &str, gender: Gender) -> SeriesStyle {
    let mut style = team_style(event_name, Some(gender));
    style.background_color = translucent(&style.border_color);
    style
}
