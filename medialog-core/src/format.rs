//! Formatting helpers shared across consumers.

use chrono::TimeDelta;

fn unit(value: i64, name: &str) -> String {
    if value == 1 {
        format!("1 {}", name)
    } else {
        format!("{} {}s", value, name)
    }
}

/// Render a duration as a human-readable string (e.g., "1 day, 2 hours and 5 minutes").
///
/// Zero and sub-minute durations render as "0 minutes". Components decompose
/// with truncating division; seconds are never shown.
pub fn format_duration(duration: TimeDelta) -> String {
    format_duration_secs(duration.num_seconds())
}

/// Same as [`format_duration`], taking raw seconds.
pub fn format_duration_secs(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "0 minutes".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(unit(days, "day"));
    }
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minute"));
    }

    match parts.len() {
        0 => "0 minutes".to_string(),
        1 => parts.remove(0),
        2 => format!("{} and {}", parts[0], parts[1]),
        _ => format!("{}, {} and {}", parts[0], parts[1], parts[2]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_minutes() {
        assert_eq!(format_duration_secs(0), "0 minutes");
        assert_eq!(format_duration_secs(-30), "0 minutes");
        // Sub-minute durations truncate to zero components
        assert_eq!(format_duration_secs(59), "0 minutes");
    }

    #[test]
    fn test_single_component() {
        assert_eq!(format_duration_secs(60), "1 minute");
        assert_eq!(format_duration_secs(2 * 3600), "2 hours");
        assert_eq!(format_duration_secs(3 * 86_400), "3 days");
    }

    #[test]
    fn test_two_components() {
        assert_eq!(format_duration_secs(90 * 60), "1 hour and 30 minutes");
        assert_eq!(format_duration_secs(25 * 3600), "1 day and 1 hour");
    }

    #[test]
    fn test_three_components() {
        assert_eq!(
            format_duration_secs(86_400 + 2 * 3600 + 5 * 60),
            "1 day, 2 hours and 5 minutes"
        );
    }

    #[test]
    fn test_seconds_truncate() {
        // 1 hour, 30 minutes, 59 seconds: seconds are dropped, not rounded
        assert_eq!(format_duration_secs(90 * 60 + 59), "1 hour and 30 minutes");
    }
}
