use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Shown wherever a date is missing or could not be parsed.
pub const DATE_PLACEHOLDER: &str = "—";

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Win fraction with ties counted as half a win. Zero games yields 0.0.
pub fn win_fraction(wins: u32, ties: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    ((wins as f64 + 0.5 * ties as f64) / games as f64).clamp(0.0, 1.0)
}

/// Format a percentage value (0-100) as e.g. "75.0%"
pub fn format_percent(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// Parse a stored game date. Accepts `YYYY-MM-DD`, naive timestamps and RFC 3339.
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

pub fn format_date_or_placeholder(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| DATE_PLACEHOLDER.to_string())
}

/// Display name for a fan; blank or missing names get a generated label.
pub fn fan_display_name(fan_id: i64, stored: Option<&str>) -> String {
    match stored.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Fan {}", fan_id),
    }
}
