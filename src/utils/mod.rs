use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Tolerance under which a predicted value counts as an exact hit.
pub const EXACT_TOLERANCE: f64 = 1e-6;

/// Render a timestamp for storage. Fixed nanosecond width keeps lexical
/// order identical to chronological order.
pub fn timestamp_to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_game_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

/// Trim free text; blank strings are treated as absent.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Percentage of `correct` over `total`, 0 when nothing was counted.
pub fn accuracy_percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// Format a probability in [0, 1] as a percentage string
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

pub fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Whether an actual stat value satisfies an over/under pick against a line.
/// Returns `None` when the pick names neither direction.
pub fn over_under_hit(pick: &str, line: f64, actual: f64) -> Option<bool> {
    let direction = pick.trim().to_lowercase();
    if direction.contains("over") {
        Some(actual > line)
    } else if direction.contains("under") {
        Some(actual < line)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_keeps_nanos() {
        let ts = Utc.timestamp_opt(1_704_880_000, 123_456_789).unwrap();
        let raw = timestamp_to_db(ts);
        assert_eq!(raw, "2024-01-10T09:46:40.123456789Z");
        assert_eq!(parse_timestamp(&raw).unwrap(), ts);
    }

    #[test]
    fn test_timestamp_lexical_order_matches_time() {
        let earlier = Utc.timestamp_opt(1_704_880_000, 900_000_000).unwrap();
        let later = Utc.timestamp_opt(1_704_880_001, 0).unwrap();
        assert!(timestamp_to_db(earlier) < timestamp_to_db(later));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  LAL ".to_string())), Some("LAL".to_string()));
        assert_eq!(normalize_text(Some("   ".to_string())), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_accuracy_percentage() {
        assert_eq!(accuracy_percentage(3, 4), 75.0);
        assert_eq!(accuracy_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_over_under_hit() {
        assert_eq!(over_under_hit("Over", 24.5, 27.0), Some(true));
        assert_eq!(over_under_hit("under", 24.5, 27.0), Some(false));
        assert_eq!(over_under_hit("push", 24.5, 27.0), None);
    }

    #[test]
    fn test_parse_game_date() {
        assert_eq!(
            parse_game_date("2024-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert!(parse_game_date("01/10/2024").is_err());
    }
}
