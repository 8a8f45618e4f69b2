//! The expense record and its JSON wire format.
//!
//! An [`Expense`] serializes as a flat JSON object:
//!
//! ```json
//! {
//!   "id": 1,
//!   "title": "Coffee",
//!   "amount": 3.5,
//!   "category": "Food",
//!   "date": "2023-05-01T10:00:00Z"
//! }
//! ```
//!
//! The `date` field is RFC 3339 in UTC with seconds precision on
//! output. On input two shapes are accepted: RFC 3339 with an offset
//! (normalized to UTC), and a naive date-time without an offset, which
//! is interpreted as UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single financial record within one token's collection.
///
/// `id` uniqueness is caller-assigned; the store never enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Caller-assigned identifier.
    pub id: i64,
    /// Free-form title.
    pub title: String,
    /// Signed amount.
    pub amount: f64,
    /// Free-form category.
    pub category: String,
    /// When the expense occurred.
    #[serde(with = "date_format")]
    pub date: DateTime<Utc>,
}

impl Expense {
    /// Creates a new expense record.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            amount,
            category: category.into(),
            date,
        }
    }
}

/// Serde codec for the `date` field.
///
/// Output is always `2023-05-01T10:00:00Z` style; sub-second precision
/// is dropped. Input without an offset (`2023-05-01T10:00:00.123`) is
/// taken as UTC.
mod date_format {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Accepted shape when the RFC 3339 parse fails: no offset,
    /// optional fractional seconds.
    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(date) => Ok(date.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|naive| naive.and_utc()),
        }
    }
}
