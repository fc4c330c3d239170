//! Firebird DATE, TIME and TIMESTAMP encoding.
//!
//! - DATE: signed 32-bit count of days since 1858-11-17 (the Modified
//!   Julian Day epoch)
//! - TIME: unsigned 32-bit count of 1/10000 seconds since midnight
//! - TIMESTAMP: DATE followed by TIME
//!
//! All values travel big-endian in row data.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

/// Fractions of a second per second in Firebird time values.
pub const TIME_UNITS_PER_SECOND: u32 = 10_000;

const NANOS_PER_UNIT: u32 = 1_000_000_000 / TIME_UNITS_PER_SECOND;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1858, 11, 17).unwrap_or(NaiveDate::MIN)
}

fn exact<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
    data.try_into().map_err(|_| {
        Error::protocol(format!(
            "{} value must be exactly {} bytes, got {}",
            what,
            N,
            data.len()
        ))
    })
}

/// Decode a 4-byte DATE.
pub fn decode_date(data: &[u8]) -> Result<NaiveDate> {
    let days = i32::from_be_bytes(exact::<4>(data, "DATE")?);
    epoch()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| Error::protocol(format!("DATE out of range: {} days", days)))
}

/// Encode a DATE.
pub fn encode_date(date: NaiveDate) -> [u8; 4] {
    let days = date.signed_duration_since(epoch()).num_days() as i32;
    days.to_be_bytes()
}

/// Decode a 4-byte TIME.
pub fn decode_time(data: &[u8]) -> Result<NaiveTime> {
    let units = u32::from_be_bytes(exact::<4>(data, "TIME")?);
    let secs = units / TIME_UNITS_PER_SECOND;
    let nanos = (units % TIME_UNITS_PER_SECOND) * NANOS_PER_UNIT;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| Error::protocol(format!("Invalid TIME: {} units", units)))
}

/// Encode a TIME, truncating to 1/10000 second.
pub fn encode_time(time: NaiveTime) -> [u8; 4] {
    let units = time.num_seconds_from_midnight() * TIME_UNITS_PER_SECOND
        + (time.nanosecond() % 1_000_000_000) / NANOS_PER_UNIT;
    units.to_be_bytes()
}

/// Decode an 8-byte TIMESTAMP.
pub fn decode_timestamp(data: &[u8]) -> Result<NaiveDateTime> {
    let bytes = exact::<8>(data, "TIMESTAMP")?;
    let date = decode_date(&bytes[..4])?;
    let time = decode_time(&bytes[4..])?;
    Ok(NaiveDateTime::new(date, time))
}

/// Encode a TIMESTAMP.
pub fn encode_timestamp(value: NaiveDateTime) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&encode_date(value.date()));
    out[4..].copy_from_slice(&encode_time(value.time()));
    out
}
