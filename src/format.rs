//! Human-readable formatting for CLI output.

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// `MM:SS`; missing, zero or non-finite durations render as `00:00`.
pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => return "00:00".to_string(),
    };
    let whole = seconds.floor() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Binary-prefixed size rounded to two decimals, trailing zeros dropped:
/// `1536` → `1.5 KB`. Sizes past GB stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, SIZE_UNITS[unit])
}
