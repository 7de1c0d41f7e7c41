use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::TypeError;

/// Timestamp for a new history entry, strictly after `previous`.
///
/// Uses the wall clock unless it has not advanced past `previous`, in which
/// case the previous timestamp is bumped by one millisecond.
pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

/// Parse a calendar date (`YYYY-MM-DD`, midnight UTC) or an RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TypeError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TypeError::InvalidTimestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_timestamp_is_strictly_after_previous() {
        let future = Utc::now() + Duration::seconds(60);
        let next = next_timestamp(Some(future));
        assert_eq!(next, future + Duration::milliseconds(1));
    }

    #[test]
    fn next_timestamp_uses_clock_when_ahead() {
        let past = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let next = next_timestamp(Some(past));
        assert!(next > past + Duration::days(365));
    }

    #[test]
    fn parses_dates_and_rfc3339() {
        let date = parse_timestamp("2009-01-01").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2009, 1, 1, 0, 0, 0).unwrap());

        let ts = parse_timestamp("2020-06-01T12:30:00+01:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2020, 6, 1, 11, 30, 0).unwrap());

        assert!(parse_timestamp("yesterday").is_err());
    }
}
