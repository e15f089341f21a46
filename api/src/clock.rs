use chrono::{DateTime, Utc};

/// Source of "now" for callers of the calculator.
///
/// The calculator itself never reads a clock. Callers sample one of these once
/// and thread the instant through every evaluation that should agree on it.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse an RFC 3339 timestamp (e.g. `2025-12-12T00:00:00Z`) into a UTC instant.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s.trim()).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_instant_normalizes_offset() {
        let t = parse_instant("2025-12-12T02:00:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 12, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_instant_accepts_store_format() {
        let t = parse_instant(" 2025-12-01T10:00:00.000Z ").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(parse_instant("yesterday").is_err());
        assert!(parse_instant("").is_err());
    }

    #[test]
    fn test_fixed_clock() {
        let t = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), clock.now());
    }
}
