use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Last month (inclusive) that still belongs to the previous season.
const SEASON_CUTOFF_MONTH: u32 = 7;

/// Season label of a date: August of year Y through July of Y+1 is season Y.
pub fn season_of(date: NaiveDate) -> i32 {
    if date.month() > SEASON_CUTOFF_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Parses the date/time formats seen across fixture, valuation and odds feeds.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    // Two-digit years first: `%Y` would happily read "23" as year 23.
    for fmt in ["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // RFC3339-ish with offset or fractional seconds: keep the wall-clock part.
    if trimmed.len() >= 19 && trimmed.is_char_boundary(19) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&trimmed[..19], "%Y-%m-%dT%H:%M:%S") {
            return Some(dt);
        }
    }
    None
}

/// Parses a date and drops the kickoff time (normalizes to midnight).
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Fixture keys are prefixed by their ISO date, e.g. `2023-08-20 Inter-Monza`.
pub fn day_from_fixture_key(game: &str) -> Option<NaiveDate> {
    let prefix = game.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn season_cutoff_is_end_of_july() {
        assert_eq!(season_of(day(2023, 8, 1)), 2023);
        assert_eq!(season_of(day(2023, 12, 31)), 2023);
        assert_eq!(season_of(day(2024, 1, 1)), 2023);
        assert_eq!(season_of(day(2024, 7, 31)), 2023);
        assert_eq!(season_of(day(2024, 8, 1)), 2024);
    }

    #[test]
    fn kickoff_time_is_dropped() {
        assert_eq!(parse_day("2023-08-19 20:45"), Some(day(2023, 8, 19)));
        assert_eq!(parse_day("2023-08-19T18:30:00"), Some(day(2023, 8, 19)));
        assert_eq!(parse_day("19/08/2023"), Some(day(2023, 8, 19)));
        assert_eq!(parse_day("19/08/23"), Some(day(2023, 8, 19)));
        assert_eq!(parse_day("2023-08-19T18:30:00+02:00"), Some(day(2023, 8, 19)));
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("not a date"), None);
    }

    #[test]
    fn fixture_key_prefix() {
        assert_eq!(
            day_from_fixture_key("2023-08-20 Inter-Monza"),
            Some(day(2023, 8, 20))
        );
        assert_eq!(day_from_fixture_key("Inter-Monza"), None);
        assert_eq!(day_from_fixture_key("2023"), None);
    }
}
