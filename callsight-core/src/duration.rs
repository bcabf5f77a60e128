//! Duration strings as they appear in the `AvgTalkDuration` column.
//!
//! Accepted forms: `HH:MM:SS`, `HH:MM:SS.fff`, `MM:SS`, and an optional
//! leading day count (`1 days 02:00:00`, `1 day 02:00:00`).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<days>\d+)\s+days?\s+)?(?:(?P<hours>\d+):)?(?P<minutes>\d{1,2}):(?P<seconds>\d{1,2}(?:\.\d+)?)$",
    )
    .expect("duration regex is valid")
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DurationError {
    #[error("unparseable duration '{0}'")]
    Unparseable(String),

    #[error("duration '{0}' has minutes or seconds out of range")]
    OutOfRange(String),
}

/// Parse a duration string into total seconds.
pub fn parse_duration(input: &str) -> Result<f64, DurationError> {
    let trimmed = input.trim();
    let caps = DURATION_RE
        .captures(trimmed)
        .ok_or_else(|| DurationError::Unparseable(input.to_string()))?;

    let int = |name: &str| -> f64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0) as f64
    };

    let days = int("days");
    let hours = int("hours");
    let minutes = int("minutes");
    let seconds: f64 = caps["seconds"]
        .parse()
        .map_err(|_| DurationError::Unparseable(input.to_string()))?;

    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(DurationError::OutOfRange(input.to_string()));
    }

    Ok(days * 86_400.0 + hours * 3_600.0 + minutes * 60.0 + seconds)
}

/// Format total seconds as `HH:MM:SS`, with a fractional part
/// (microsecond precision, trailing zeros trimmed) when the value is not a
/// whole number of seconds. Hours are not wrapped at 24.
pub fn format_duration(seconds: f64) -> String {
    let micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
    let total = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let hms = format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60);
    if frac == 0 {
        hms
    } else {
        let digits = format!("{frac:06}");
        format!("{hms}.{}", digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_minutes() {
        assert_eq!(parse_duration("00:03:00").unwrap(), 180.0);
    }

    #[test]
    fn test_hours_and_fraction() {
        assert_eq!(parse_duration("01:02:03.5").unwrap(), 3723.5);
    }

    #[test]
    fn test_minutes_only() {
        assert_eq!(parse_duration("4:05").unwrap(), 245.0);
    }

    #[test]
    fn test_day_prefix() {
        assert_eq!(parse_duration("1 days 00:00:10").unwrap(), 86_410.0);
        assert_eq!(parse_duration("2 day 00:01:00").unwrap(), 172_860.0);
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(parse_duration("  00:00:42 ").unwrap(), 42.0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(
            parse_duration("three minutes"),
            Err(DurationError::Unparseable("three minutes".to_string()))
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-00:01:00").is_err());
    }

    #[test]
    fn test_out_of_range_component() {
        assert!(matches!(
            parse_duration("00:75:00"),
            Err(DurationError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(180.0), "00:03:00");
        assert_eq!(format_duration(90_000.0), "25:00:00");
    }

    #[test]
    fn test_format_duration_keeps_fraction() {
        assert_eq!(format_duration(3723.4), "01:02:03.4");
        assert_eq!(format_duration(95.5), "00:01:35.5");
        assert_eq!(format_duration(0.000_001), "00:00:00.000001");
    }

    #[test]
    fn test_fractional_duration_survives_format_and_parse() {
        for text in ["00:02:00.4", "00:01:35.5", "01:02:03.25"] {
            let seconds = parse_duration(text).unwrap();
            assert_eq!(format_duration(seconds), text);
            assert_eq!(parse_duration(&format_duration(seconds)).unwrap(), seconds);
        }
    }
}
