//! Display-formatting helpers shared by report rendering.

use url::Url;

/// Format large counters with K/M suffixes: `950`, `1.5K`, `2.0M`.
pub fn format_number(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Shorten a URL for display: host plus a truncated path when it parses,
/// plain prefix truncation otherwise.
pub fn truncate_url(url: &str, max_length: usize) -> String {
    if url.is_empty() {
        return String::new();
    }
    if url.chars().count() <= max_length {
        return url.to_string();
    }

    match Url::parse(url).ok().and_then(|parsed| {
        parsed.host_str().map(|host| {
            let path = match parsed.query() {
                Some(query) => format!("{}?{}", parsed.path(), query),
                None => parsed.path().to_string(),
            };
            let truncated_path = if path.chars().count() > 30 {
                let prefix: String = path.chars().take(30).collect();
                format!("{prefix}...")
            } else {
                path
            };
            format!("{host}{truncated_path}")
        })
    }) {
        Some(short) => short,
        None => {
            let prefix: String = url.chars().take(max_length).collect();
            format!("{prefix}...")
        }
    }
}

/// Short weekday name by index, 0 = Sunday. Out-of-range indices yield "".
pub fn day_name(index: usize) -> &'static str {
    const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    DAYS.get(index).copied().unwrap_or("")
}

/// 12-hour clock label for an hour-of-day index: `12am`, `9am`, `12pm`, `3pm`.
pub fn hour_label(hour: usize) -> String {
    match hour {
        0 => "12am".to_string(),
        12 => "12pm".to_string(),
        h if h < 12 => format!("{h}am"),
        h => format!("{}pm", h - 12),
    }
}

/// Percentage string with one decimal; `0%` when the total is zero.
pub fn percentage(value: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", (value as f64 / total as f64) * 100.0)
}
