//! Formatting helpers for showing a [`crate::weather::WeatherData`] to people.

use chrono::{DateTime, FixedOffset};

const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Round half toward positive infinity, so -2.5 becomes -2
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Nearest of the eight compass points
pub fn wind_direction(degrees: u32) -> &'static str {
    let index = (round_half_up(f64::from(degrees) / 45.0) as u64 % 8) as usize;
    COMPASS_POINTS[index]
}

/// "W (292°)"
pub fn wind_label(degrees: u32) -> String {
    format!("{} ({}°)", wind_direction(degrees), degrees)
}

/// Whole degrees, e.g. 23.52 becomes "24°"
pub fn temperature_label(value: f64) -> String {
    let rounded = round_half_up(value) as i64;
    format!("{rounded}°")
}

/// Wall-clock time at the location, e.g. "06:12 AM"
pub fn format_local_time(timestamp: i64, utc_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(utc_offset_secs)?;
    let local = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&offset);
    Some(local.format("%I:%M %p").to_string())
}

/// Large condition icon for an icon token such as "04n"
pub fn icon_url(icon: &str) -> String {
    format!("{ICON_BASE_URL}/{icon}@4x.png")
}
