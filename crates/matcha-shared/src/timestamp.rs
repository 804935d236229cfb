//! Lenient timestamp parsing.
//!
//! The backend serializes database timestamps with Python's `isoformat()`,
//! which omits the offset for naive columns. Those are interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one assumed to be UTC.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `#[serde(with = "timestamp::option")]` for `Option<DateTime<Utc>>`.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse("2026-02-14T19:00:00+01:00").unwrap();
        assert_eq!(dt.hour(), 18);
    }

    #[test]
    fn test_parse_naive_isoformat() {
        let dt = parse("2026-02-14T19:00:00.123456").unwrap();
        assert_eq!(dt.day(), 14);
        assert_eq!(dt.hour(), 19);
        assert!(parse("2026-02-14 19:00:00").is_some());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse("yesterday").is_none());
    }
}
