//! Time utilities: epoch-millisecond timestamps, local day windows, parsing
//! and formatting for the CLI.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn local_midnight(date: NaiveDate) -> AppResult<i64> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| AppError::InvalidInput(format!("No local midnight on {}", date)))
}

/// `[start, end)` of the local calendar day containing `at_ms`.
/// The end is the next local midnight, so DST days are 23h or 25h long.
pub fn local_day_bounds(at_ms: i64) -> AppResult<(i64, i64)> {
    let at = Local
        .timestamp_millis_opt(at_ms)
        .single()
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid timestamp: {}", at_ms)))?;

    let day = at.date_naive();
    let next = day
        .succ_opt()
        .ok_or_else(|| AppError::InvalidInput(format!("Date out of range: {}", day)))?;

    Ok((local_midnight(day)?, local_midnight(next)?))
}

pub fn same_local_day(a_ms: i64, b_ms: i64) -> AppResult<bool> {
    let (start, end) = local_day_bounds(a_ms)?;
    Ok(b_ms >= start && b_ms < end)
}

pub fn to_utc(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

pub fn format_millis(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// Accepts RFC 3339, local `YYYY-MM-DD HH:MM[:SS]`, or local `HH:MM` (today).
pub fn parse_at(input: &str) -> AppResult<i64> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .ok()
                .map(|t| Local::now().date_naive().and_time(t))
        })
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid time: {}", input)))?;

    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| AppError::InvalidInput(format!("Nonexistent local time: {}", input)))
}

pub fn parse_optional_at(input: Option<&String>) -> AppResult<Option<i64>> {
    input.map(|s| parse_at(s)).transpose()
}
