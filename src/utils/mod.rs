//! Utility functions and helpers.

/// Format a byte count for humans.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Format a second count as a compact duration, e.g. `1d2h3m4s`.
pub fn readable_duration(total_secs: u64) -> String {
    const PERIODS: &[(&str, u64)] = &[("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

    let mut remaining = total_secs;
    let mut out = String::new();
    for (name, secs) in PERIODS {
        if remaining >= *secs {
            out.push_str(&format!("{}{name}", remaining / secs));
            remaining %= secs;
        }
    }

    if out.is_empty() { "0s".to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(500 * 1024 * 1024), "500.00 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_readable_duration() {
        assert_eq!(readable_duration(0), "0s");
        assert_eq!(readable_duration(59), "59s");
        assert_eq!(readable_duration(61), "1m1s");
        assert_eq!(readable_duration(90_061), "1d1h1m1s");
    }
}
