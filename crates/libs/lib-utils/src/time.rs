//! # Time Utilities
//!
//! Lenient timestamp parsing for request payloads and query strings.
//!
//! Clients send either full RFC 3339 timestamps or a bare local time
//! (`2024-01-31T08:30:00`). Bare times are read in the service's home
//! offset, UTC+08:00.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Offset applied to timestamps that carry no zone information.
const HOME_OFFSET_SECS: i32 = 8 * 3600;

/// Layout of zone-less timestamps; `%.f` accepts an optional fraction.
const NAIVE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an RFC 3339 timestamp, or a zone-less one in the home offset.
///
/// Surrounding double quotes are ignored.
pub fn parse_flexible(moment: &str) -> Result<DateTime<FixedOffset>, Error> {
    let moment = moment.trim_matches('"');

    if let Ok(dt) = DateTime::parse_from_rfc3339(moment) {
        return Ok(dt);
    }

    let fail = || Error::FailToDateParse(moment.to_string());
    let naive = NaiveDateTime::parse_from_str(moment, NAIVE_LAYOUT).map_err(|_| fail())?;
    FixedOffset::east_opt(HOME_OFFSET_SECS)
        .and_then(|offset| offset.from_local_datetime(&naive).single())
        .ok_or_else(fail)
}

/// A timestamp that accepts both RFC 3339 and zone-less input.
///
/// Always serializes back as RFC 3339. Use `Option<FlexibleTime>` for
/// nullable fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlexibleTime(pub DateTime<FixedOffset>);

impl FlexibleTime {
    pub fn into_inner(self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl FromStr for FlexibleTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_flexible(s).map(FlexibleTime)
    }
}

impl fmt::Display for FlexibleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339())
    }
}

impl Serialize for FlexibleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for FlexibleTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// region:    --- Error
#[derive(Debug)]
pub enum Error {
    FailToDateParse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
// endregion: --- Error

// endregion: --- Tests
