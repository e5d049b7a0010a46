//! `HH:MM` time-of-day strings and `HH:MM-HH:MM` ranges.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const HHMM: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("invalid time range '{0}' (expected HH:MM-HH:MM)")]
    InvalidRange(String),
    #[error("time range {start}-{end} must end after it starts")]
    EmptyRange { start: String, end: String },
}

pub fn parse_hhmm(input: &str) -> Result<NaiveTime, ClockError> {
    NaiveTime::parse_from_str(input.trim(), HHMM)
        .map_err(|_| ClockError::InvalidTime(input.trim().to_string()))
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format(HHMM).to_string()
}

/// A time-of-day range such as a meal window, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ClockError> {
        if end <= start {
            return Err(ClockError::EmptyRange {
                start: format_hhmm(start),
                end: format_hhmm(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// The range anchored on `date`.
    pub fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.start), date.and_time(self.end))
    }
}

impl FromStr for TimeRange {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ClockError::InvalidRange(s.trim().to_string()))?;
        let start = parse_hhmm(start).map_err(|_| ClockError::InvalidRange(s.trim().to_string()))?;
        let end = parse_hhmm(end).map_err(|_| ClockError::InvalidRange(s.trim().to_string()))?;
        TimeRange::new(start, end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_hhmm(self.start), format_hhmm(self.end))
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `NaiveTime` fields stored as `HH:MM`.
pub mod hhmm {
    use super::{format_hhmm, parse_hhmm};
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_ranges() {
        let range: TimeRange = "12:00-13:40".parse().unwrap();
        assert_eq!(range.start(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(range.to_string(), "12:00-13:40");
    }

    #[test]
    fn rejects_inverted_and_malformed_ranges() {
        assert!(matches!(
            "13:00-12:00".parse::<TimeRange>(),
            Err(ClockError::EmptyRange { .. })
        ));
        assert!(matches!(
            "noon".parse::<TimeRange>(),
            Err(ClockError::InvalidRange(_))
        ));
        assert!(parse_hhmm("25:00").is_err());
    }
}
