//! Date string and mission-seconds conversion
//!
//! Dates are UTC strings `YYYY:DOY:HH:MM:SS.sss`, which sort lexicographically
//! in time order. Seconds count elapsed TT seconds since 1998-01-01T00:00:00 TT,
//! so a conversion has to know about leap seconds; `hifitime` supplies them.

use crate::errors::{Result, StatesError};
use chrono::{Datelike, NaiveDate};
use hifitime::{Duration, Epoch, TimeScale};

/// `datestop` of the final state in every sequence
pub const DATESTOP_SENTINEL: &str = "2099:001:00:00:00.000";

fn mission_epoch() -> Epoch {
    Epoch::from_gregorian(1998, 1, 1, 0, 0, 0, 0, TimeScale::TT)
}

fn invalid(date: &str, reason: impl Into<String>) -> StatesError {
    StatesError::InvalidDate {
        date: date.to_string(),
        reason: reason.into(),
    }
}

fn parse_field<T: std::str::FromStr>(date: &str, field: Option<&str>, name: &str) -> Result<T> {
    match field {
        None => Err(invalid(date, format!("missing {}", name))),
        Some(text) => text
            .parse::<T>()
            .map_err(|_| invalid(date, format!("bad {} '{}'", name, text))),
    }
}

/// Convert a `YYYY:DOY[:HH:MM[:SS.sss]]` date to mission seconds.
///
/// Omitted trailing fields are taken as zero.
pub fn date_to_secs(date: &str) -> Result<f64> {
    let mut parts = date.trim().split(':');
    let year: i32 = parse_field(date, parts.next(), "year")?;
    let doy: u32 = parse_field(date, parts.next(), "day of year")?;
    let hour: u8 = parse_field(date, parts.next().or(Some("0")), "hour")?;
    let minute: u8 = parse_field(date, parts.next().or(Some("0")), "minute")?;
    let seconds: f64 = parse_field(date, parts.next().or(Some("0")), "seconds")?;
    if parts.next().is_some() {
        return Err(invalid(date, "too many fields"));
    }
    if hour > 23 || minute > 59 || !(0.0..60.0).contains(&seconds) {
        return Err(invalid(date, "time of day out of range"));
    }

    let day = NaiveDate::from_yo_opt(year, doy)
        .ok_or_else(|| invalid(date, format!("no day {} in year {}", doy, year)))?;
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;

    let epoch = Epoch::from_gregorian_utc(
        year,
        day.month() as u8,
        day.day() as u8,
        hour,
        minute,
        whole as u8,
        0,
    ) + Duration::from_seconds(f64::from(nanos) * 1e-9);

    // Both sides on the TAI scale, which counts every leap second; the
    // constant TT-TAI offset cancels.
    Ok((epoch.to_tai_duration() - mission_epoch().to_tai_duration()).to_seconds())
}

/// Convert mission seconds to a `YYYY:DOY:HH:MM:SS.sss` date, rounded to the
/// nearest millisecond.
pub fn secs_to_date(secs: f64) -> Result<String> {
    if !secs.is_finite() {
        return Err(invalid(&secs.to_string(), "seconds must be finite"));
    }
    let epoch = Epoch::from_tai_duration(
        mission_epoch().to_tai_duration() + Duration::from_seconds(secs),
    )
    .round(Duration::from_milliseconds(1.0));
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    let doy = NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
        .ok_or_else(|| invalid(&secs.to_string(), "calendar conversion failed"))?
        .ordinal();

    Ok(format!(
        "{:04}:{:03}:{:02}:{:02}:{:02}.{:03}",
        year,
        doy,
        hour,
        minute,
        second,
        nanos / 1_000_000
    ))
}

/// Canonical full-precision form of a possibly partial date
pub fn normalize_date(date: &str) -> Result<String> {
    secs_to_date(date_to_secs(date)?)
}

/// Current wall-clock time in mission seconds
pub fn now_secs() -> Result<f64> {
    let now = chrono::Utc::now().format("%Y:%j:%H:%M:%S%.3f").to_string();
    date_to_secs(&now)
}
