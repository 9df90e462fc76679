use chrono::{DateTime, NaiveDateTime};

use crate::CodecError;

const ISO_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn from_epoch_millis(ms: i64) -> Result<NaiveDateTime, CodecError> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or(CodecError::InvalidEpoch(ms))
}

pub fn from_epoch_seconds(secs: i64) -> Result<NaiveDateTime, CodecError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(CodecError::InvalidEpoch(secs))
}

/// Parses a GMT wall-clock string; a trailing `Z` or offset is ignored.
pub fn parse_gmt(value: &str) -> Result<NaiveDateTime, CodecError> {
    let trimmed = value.trim().trim_end_matches('Z');
    if let Ok(dt) = DateTime::parse_from_rfc3339(value.trim()) {
        return Ok(dt.naive_utc());
    }

    ISO_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| CodecError::InvalidTimestamp(value.to_string()))
}
