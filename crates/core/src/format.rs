//! Display formatting for durations and file sizes.

/// Format a duration in minutes: `45M`, `2H`, `1H30M`, `1D2H`.
///
/// ```
/// use tagsel_core::format::format_minutes;
///
/// assert_eq!(format_minutes(90), "1H30M");
/// assert_eq!(format_minutes(24 * 60 + 5), "1D5M");
/// ```
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;

    let mut out = String::new();
    if hours >= 24 {
        out.push_str(&format!("{}D", hours / 24));
        if hours % 24 > 0 {
            out.push_str(&format!("{}H", hours % 24));
        }
        if mins > 0 {
            out.push_str(&format!("{mins}M"));
        }
        return out;
    }

    if hours > 0 {
        out.push_str(&format!("{hours}H"));
        if mins > 0 {
            out.push_str(&format!("{mins}M"));
        }
        return out;
    }
    format!("{mins}M")
}

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable byte count with one decimal, capped at GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_under_an_hour() {
        assert_eq!(format_minutes(0), "0M");
        assert_eq!(format_minutes(45), "45M");
    }

    #[test]
    fn whole_and_partial_hours() {
        assert_eq!(format_minutes(120), "2H");
        assert_eq!(format_minutes(90), "1H30M");
    }

    #[test]
    fn days() {
        assert_eq!(format_minutes(24 * 60), "1D");
        assert_eq!(format_minutes(26 * 60), "1D2H");
        assert_eq!(format_minutes(48 * 60 + 5), "2D5M");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
    }
}
