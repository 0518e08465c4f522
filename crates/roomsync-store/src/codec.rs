//! Column encoding shared by the CRUD modules.
//!
//! Timestamps are written as fixed-width RFC-3339 with microseconds and a
//! `Z` suffix, so lexical order in SQLite equals chronological order.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;

/// Digits of sub-second precision kept in stored timestamps.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// Current time at the precision timestamps are stored with, so a value
/// handed back to the caller compares equal to the one read later.
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

pub(crate) fn truncate(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(STORED_SUBSEC_DIGITS)
}

pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(idx, &s)).transpose()
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
