//! Business calendar dates
//!
//! Project creation dates and stage start/completion dates are calendar
//! dates, not instants. They are parsed from and rendered to `YYYY-MM-DD`
//! with no timezone component anywhere in the pipeline, so a date submitted
//! as "2024-03-15" reads back as "2024-03-15" regardless of server or
//! client offset. Stored in BSON as the string form.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::types::TrackError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A timezone-free calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusinessDate(NaiveDate);

impl BusinessDate {
    pub fn new(date: NaiveDate) -> Self {
        BusinessDate(date)
    }

    /// Parse a `YYYY-MM-DD` string.
    ///
    /// chrono's `%Y-%m-%d` tolerates unpadded fields ("2024-3-15"), which
    /// would round-trip to a different string. Require the exact
    /// ten-character form before handing off.
    pub fn parse(s: &str) -> Result<Self, TrackError> {
        let shape_ok = s.len() == 10
            && s.bytes().enumerate().all(|(i, b)| match i {
                4 | 7 => b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(TrackError::Validation(format!(
                "invalid date '{s}', expected YYYY-MM-DD"
            )));
        }

        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(BusinessDate)
            .map_err(|_| {
                TrackError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD"))
            })
    }

    /// Today according to the server's local calendar
    pub fn today() -> Self {
        BusinessDate(chrono::Local::now().date_naive())
    }

    pub fn inner(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for BusinessDate {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BusinessDate::parse(s)
    }
}

impl Serialize for BusinessDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BusinessDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BusinessDate::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let date = BusinessDate::parse("2024-03-15").unwrap();
        assert_eq!(date.to_string(), "2024-03-15");
    }

    #[test]
    fn test_serde_round_trip() {
        let date = BusinessDate::parse("2024-01-01").unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-01-01\"");

        let back: BusinessDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(BusinessDate::parse("15/03/2024").is_err());
        assert!(BusinessDate::parse("2024-13-01").is_err());
        assert!(BusinessDate::parse("").is_err());
    }

    #[test]
    fn test_rejects_unpadded_fields() {
        // Accepting these would re-render as a different string
        assert!(BusinessDate::parse("2024-3-15").is_err());
        assert!(BusinessDate::parse("2024-03-5").is_err());
        assert!(BusinessDate::parse("24-03-15").is_err());
    }

    #[test]
    fn test_no_timestamp_leaks_into_rendering() {
        // Datetime strings must not be accepted; the type carries no
        // time-of-day that could shift the rendered day.
        assert!(BusinessDate::parse("2024-03-15T00:00:00Z").is_err());
    }

    #[test]
    fn test_ordering() {
        let a = BusinessDate::parse("2024-01-01").unwrap();
        let b = BusinessDate::parse("2024-01-10").unwrap();
        assert!(a < b);
    }
}
