//! Calendar types for the school ledger
//!
//! This module provides:
//! - `AcademicYear`: the September-to-June school year fees are assigned in
//! - `DateRange`: an inclusive, validated span of calendar dates
//! - `Timezone` and `Clock`: what "today" means for due dates and overdue checks

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// First month of the academic year (September)
const ACADEMIC_YEAR_START_MONTH: u32 = 9;

/// Last month of the academic year (June)
const ACADEMIC_YEAR_END_MONTH: u32 = 6;

/// Errors related to calendar operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid academic year: {0}")]
    InvalidAcademicYear(String),

    #[error("Date out of range")]
    OutOfRange,
}

/// Adds calendar months to a date, clamping to the last day of the month
///
/// `2025-01-31 + 1 month` is `2025-02-28`.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, TemporalError> {
    date.checked_add_months(Months::new(months))
        .ok_or(TemporalError::OutOfRange)
}

/// An academic year running from September to June, labelled `"2025-2026"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcademicYear {
    start_year: i32,
}

impl AcademicYear {
    /// Creates the academic year starting in September of `start_year`
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Returns the academic year that contains `date`
    ///
    /// Dates from September onward belong to the year starting that
    /// September; earlier dates belong to the year that started the previous
    /// September.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= ACADEMIC_YEAR_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    /// Calendar year in which the academic year starts
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Calendar year in which the academic year ends
    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// The teaching period: September 1st to June 30th inclusive
    pub fn date_range(&self) -> Result<DateRange, TemporalError> {
        let start = NaiveDate::from_ymd_opt(self.start_year, ACADEMIC_YEAR_START_MONTH, 1)
            .ok_or(TemporalError::OutOfRange)?;
        let end = NaiveDate::from_ymd_opt(self.end_year(), ACADEMIC_YEAR_END_MONTH, 30)
            .ok_or(TemporalError::OutOfRange)?;
        DateRange::new(start, end)
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year())
    }
}

impl FromStr for AcademicYear {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TemporalError::InvalidAcademicYear(s.to_string());

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;

        if end != start + 1 {
            return Err(invalid());
        }
        Ok(Self::new(start))
    }
}

impl Serialize for AcademicYear {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AcademicYear {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if `date` falls within the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Timezone wrapper for the school's local calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// IANA name, e.g. `Europe/Paris`
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// The local calendar date of a UTC instant
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Source of the current date and time
pub trait Clock: Send + Sync + 'static {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current local calendar date
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the school's timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Timezone,
}

impl SystemClock {
    pub fn new(timezone: Timezone) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.timezone.local_date(Utc::now())
    }
}

/// A clock pinned to a single date, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.today
            .and_hms_opt(12, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now)
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
