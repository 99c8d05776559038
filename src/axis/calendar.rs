//! CF time decoding.
//!
//! Converts numeric offsets such as `days since 2001-01-01` into calendar
//! dates for the supported CF calendars. Decoded values are truncated to
//! whole seconds.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{GridclipError, Result};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Julian day number of 0001-01-01 (proleptic Gregorian) minus one
const JDN_CE_OFFSET: i64 = 1_721_425;
/// First Julian day number of the Gregorian calendar (1582-10-15)
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

const NOLEAP_MONTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const LEAP_MONTHS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A date-time in an arbitrary CF calendar, at whole-second precision.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CfDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CfDateTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Convert to a chrono value; fails for dates that only exist in
    /// model calendars (e.g. 30 February).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, self.second)?;
        Some(NaiveDateTime::new(date, time))
    }
}

impl fmt::Display for CfDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Supported CF calendars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Calendar {
    /// Mixed Julian/Gregorian with the 1582-10-15 reform
    Standard,
    ProlepticGregorian,
    Julian,
    /// Every year has 365 days
    NoLeap,
    /// Every year has 366 days
    AllLeap,
    /// Twelve 30-day months
    Day360,
}

impl FromStr for Calendar {
    type Err = GridclipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            _ => Err(GridclipError::UnsupportedCalendar {
                calendar: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        };
        f.write_str(name)
    }
}

impl Calendar {
    fn month_lengths(self, year: i32) -> [u32; 12] {
        let leap = match self {
            Calendar::NoLeap => false,
            Calendar::AllLeap => true,
            Calendar::Day360 => return [30; 12],
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::ProlepticGregorian | Calendar::Standard => {
                (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
            }
        };
        if leap {
            LEAP_MONTHS
        } else {
            NOLEAP_MONTHS
        }
    }

    fn validate(self, year: i32, month: u32, day: u32) -> Option<()> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let lengths = match self {
            // Julian leap rule applies before the reform
            Calendar::Standard if (year, month, day) < (1582, 10, 15) => {
                Calendar::Julian.month_lengths(year)
            }
            _ => self.month_lengths(year),
        };
        if day == 0 || day > lengths[(month - 1) as usize] {
            return None;
        }
        if self == Calendar::Standard && (year, month) == (1582, 10) && (5..15).contains(&day) {
            return None;
        }
        Some(())
    }

    /// Count days from the calendar's epoch
    fn days_from_date(self, year: i32, month: u32, day: u32) -> Option<i64> {
        self.validate(year, month, day)?;
        match self {
            Calendar::ProlepticGregorian => {
                NaiveDate::from_ymd_opt(year, month, day).map(|d| d.num_days_from_ce() as i64)
            }
            Calendar::Julian => Some(julian_jdn(year, month, day)),
            Calendar::Standard => {
                if (year, month, day) >= (1582, 10, 15) {
                    NaiveDate::from_ymd_opt(year, month, day)
                        .map(|d| d.num_days_from_ce() as i64 + JDN_CE_OFFSET)
                } else {
                    Some(julian_jdn(year, month, day))
                }
            }
            Calendar::NoLeap | Calendar::AllLeap | Calendar::Day360 => {
                let lengths = self.month_lengths(year);
                let year_length: u32 = lengths.iter().sum();
                let before: u32 = lengths[..(month - 1) as usize].iter().sum();
                Some(year as i64 * year_length as i64 + (before + day - 1) as i64)
            }
        }
    }

    /// Inverse of [`Calendar::days_from_date`]
    fn date_from_days(self, days: i64) -> Option<(i32, u32, u32)> {
        match self {
            Calendar::ProlepticGregorian => gregorian_from_ce(days),
            Calendar::Julian => julian_from_jdn(days),
            Calendar::Standard => {
                if days >= GREGORIAN_REFORM_JDN {
                    gregorian_from_ce(days - JDN_CE_OFFSET)
                } else {
                    julian_from_jdn(days)
                }
            }
            Calendar::NoLeap | Calendar::AllLeap | Calendar::Day360 => {
                let lengths = self.month_lengths(0);
                let year_length: i64 = lengths.iter().map(|&l| l as i64).sum();
                let year = i32::try_from(days.div_euclid(year_length)).ok()?;
                let mut remaining = days.rem_euclid(year_length) as u32;
                for (idx, &length) in lengths.iter().enumerate() {
                    if remaining < length {
                        return Some((year, idx as u32 + 1, remaining + 1));
                    }
                    remaining -= length;
                }
                None
            }
        }
    }
}

fn gregorian_from_ce(days: i64) -> Option<(i32, u32, u32)> {
    let days = i32::try_from(days).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days).map(|d| (d.year(), d.month(), d.day()))
}

fn julian_jdn(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - month as i64) / 12;
    let y = year as i64 + 4800 - a;
    let m = month as i64 + 12 * a - 3;
    day as i64 + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

fn julian_from_jdn(jdn: i64) -> Option<(i32, u32, u32)> {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    Some((i32::try_from(year).ok()?, month as u32, day as u32))
}

/// Unit of a CF time offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    fn micros(self) -> i64 {
        match self {
            TimeUnit::Days => MICROS_PER_DAY,
            TimeUnit::Hours => 3_600 * MICROS_PER_SECOND,
            TimeUnit::Minutes => 60 * MICROS_PER_SECOND,
            TimeUnit::Seconds => MICROS_PER_SECOND,
            TimeUnit::Milliseconds => 1_000,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Some(TimeUnit::Days),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(TimeUnit::Hours),
            "minutes" | "minute" | "mins" | "min" => Some(TimeUnit::Minutes),
            "seconds" | "second" | "secs" | "sec" | "s" => Some(TimeUnit::Seconds),
            "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => {
                Some(TimeUnit::Milliseconds)
            }
            _ => None,
        }
    }
}

/// A parsed `<unit> since <reference>` string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    /// Reference date, whole-second part
    pub reference: CfDateTime,
    /// Sub-second part of the reference time
    pub reference_micros: i64,
}

impl TimeUnits {
    /// Parse a CF units string such as `hours since 1900-01-01 00:00:0.0`
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = |message: &str| GridclipError::InvalidTimeUnits {
            units: units.to_string(),
            message: message.to_string(),
        };

        let mut tokens = units.split_whitespace();
        let unit = tokens
            .next()
            .and_then(TimeUnit::parse)
            .ok_or_else(|| invalid("unknown time unit"))?;
        if !tokens
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case("since"))
        {
            return Err(invalid("expected '<unit> since <date>'"));
        }

        let date_token = tokens.next().ok_or_else(|| invalid("missing reference date"))?;
        let (date_part, inline_time) = match date_token.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (date_token, None),
        };
        let time_part = match inline_time {
            Some(time) => Some(time.trim_end_matches('Z')),
            None => tokens.next(),
        };
        if let Some(zone) = tokens.next() {
            if !matches!(zone, "Z" | "UTC" | "GMT" | "+00:00" | "00:00" | "+0000") {
                return Err(invalid("only UTC reference times are supported"));
            }
        }

        let mut fields = date_part.splitn(3, '-').map(str::trim);
        let (year, month, day) = match (fields.next(), fields.next(), fields.next()) {
            (Some(y), Some(m), Some(d)) => (
                y.parse::<i32>().map_err(|_| invalid("bad year"))?,
                m.parse::<u32>().map_err(|_| invalid("bad month"))?,
                d.parse::<u32>().map_err(|_| invalid("bad day"))?,
            ),
            _ => return Err(invalid("reference date must be YYYY-MM-DD")),
        };

        let (hour, minute, second, reference_micros) = match time_part {
            None => (0, 0, 0, 0),
            Some(time) => parse_time(time).ok_or_else(|| invalid("bad reference time"))?,
        };

        Ok(Self {
            unit,
            reference: CfDateTime::new(year, month, day, hour, minute, second),
            reference_micros,
        })
    }

    /// Decode one numeric offset, dropping any sub-second remainder.
    pub fn decode(&self, value: f64, calendar: Calendar) -> Result<CfDateTime> {
        let out_of_range = || GridclipError::InvalidParameter {
            param: "time".to_string(),
            message: format!("offset {} cannot be represented as a date", value),
        };

        if !value.is_finite() {
            return Err(out_of_range());
        }

        let r = &self.reference;
        let reference_days = calendar.days_from_date(r.year, r.month, r.day).ok_or_else(|| {
            GridclipError::InvalidTimeUnits {
                units: format!("{}", r),
                message: format!("reference date does not exist in the {:?} calendar", calendar),
            }
        })?;

        // Round to microseconds first so that float noise such as
        // 0.99999999999 days does not truncate a whole second away.
        let offset = (value * self.unit.micros() as f64).round();
        if offset.abs() > i64::MAX as f64 / 2.0 {
            return Err(out_of_range());
        }
        let since_midnight = (r.hour as i64 * 3_600 + r.minute as i64 * 60 + r.second as i64)
            * MICROS_PER_SECOND
            + self.reference_micros;
        let total = since_midnight + offset as i64;

        let days = reference_days + total.div_euclid(MICROS_PER_DAY);
        let seconds = total.rem_euclid(MICROS_PER_DAY) / MICROS_PER_SECOND;
        let (year, month, day) = calendar.date_from_days(days).ok_or_else(out_of_range)?;

        Ok(CfDateTime::new(
            year,
            month,
            day,
            (seconds / 3_600) as u32,
            (seconds % 3_600 / 60) as u32,
            (seconds % 60) as u32,
        ))
    }
}

fn parse_time(time: &str) -> Option<(u32, u32, u32, i64)> {
    let mut parts = time.split(':');
    let hour = parts.next()?.parse::<u32>().ok()?;
    let minute = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    let seconds = parts.next().map(str::parse::<f64>).transpose().ok()?.unwrap_or(0.0);
    if parts.next().is_some() || hour > 23 || minute > 59 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let whole = seconds.trunc();
    let micros = ((seconds - whole) * MICROS_PER_SECOND as f64).round() as i64;
    Some((hour, minute, whole as u32, micros))
}
