//! Daml values as the JSON Ledger API renders them.
//!
//! `Int64` travels as a decimal string, `Timestamp` as an RFC 3339 string in
//! UTC, and `RelTime` as a record holding a microsecond count.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use mcms_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A Daml `Int64`. Serializes as a string, accepts a string or a number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int64(pub i64);

impl fmt::Display for Int64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Int64 {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<u32> for Int64 {
    fn from(value: u32) -> Self {
        Self(i64::from(value))
    }
}

impl From<u8> for Int64 {
    fn from(value: u8) -> Self {
        Self(i64::from(value))
    }
}

impl Serialize for Int64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Int64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map(Self).map_err(serde::de::Error::custom),
        }
    }
}

impl Int64 {
    /// The value as a non-negative count, failing on negative ledger state.
    pub fn to_u64(self, what: &'static str) -> Result<u64> {
        u64::try_from(self.0).map_err(|_| Error::decode(what, format!("negative value {}", self.0)))
    }
}

/// A Daml `RelTime`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelTime {
    pub microseconds: Int64,
}

impl RelTime {
    pub const fn from_secs(secs: i64) -> Self {
        Self { microseconds: Int64(secs.saturating_mul(MICROS_PER_SECOND)) }
    }

    /// Whole seconds, truncated.
    pub const fn as_secs(self) -> i64 {
        self.microseconds.0 / MICROS_PER_SECOND
    }
}

/// Renders unix seconds as a Daml `Timestamp`.
pub fn timestamp(unix_secs: u32) -> Result<String> {
    DateTime::<Utc>::from_timestamp(i64::from(unix_secs), 0)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .ok_or_else(|| Error::InvalidProposal(format!("timestamp {unix_secs} is out of range")))
}

/// Parses a Daml `Timestamp` into unix seconds.
pub fn parse_timestamp(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.timestamp())
        .map_err(|err| Error::decode("timestamp", format!("`{value}`: {err}")))
}
