//! Billing period resolution: calendar-month values, single-month query
//! ranges, and the trailing-month trend window.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::error::BillingError;

/// Trend window length used when the client does not ask for one.
pub const DEFAULT_TREND_MONTHS: i64 = 6;
/// Bounds applied to a requested trend window length.
pub const MIN_TREND_MONTHS: i64 = 2;
pub const MAX_TREND_MONTHS: i64 = 12;

/// A normalized (year, month) pair. The month is always 1..=12; arithmetic
/// that overflows the month rolls into the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Strict `YYYY-MM` parse: four digits, a dash, two digits, month 01-12.
    pub fn parse(input: &str) -> Result<Self, BillingError> {
        let Some((year, month)) = input.split_once('-') else {
            return Err(BillingError::invalid_month());
        };
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(BillingError::invalid_month());
        }
        let year: i32 = year.parse().map_err(|_| BillingError::invalid_month())?;
        let month: u32 = month.parse().map_err(|_| BillingError::invalid_month())?;
        Self::new(year, month).ok_or_else(BillingError::invalid_month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn next(&self) -> Self {
        self.plus_months(1)
    }

    pub fn plus_months(&self, months: i64) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 + months;
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn minus_months(&self, months: i64) -> Self {
        self.plus_months(-months)
    }

    /// Short human label, e.g. `Jan 2025`.
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for CalendarMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A half-open `[start, end_exclusive)` interval spanning exactly one
/// calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end_exclusive: NaiveDate,
}

impl DateRange {
    pub fn calendar_month(month: CalendarMonth) -> Self {
        Self {
            start: month.first_day(),
            end_exclusive: month.next().first_day(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    /// The month this range covers.
    pub fn month(&self) -> CalendarMonth {
        CalendarMonth::containing(self.start)
    }
}

/// Resolve an optional `YYYY-MM` request into the month range to query.
///
/// Requests for the current month or anything later fold onto the current
/// month: there is no finalized billing data past it.
pub fn resolve_period(
    requested: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange, BillingError> {
    let current = CalendarMonth::containing(today);
    let resolved = match requested {
        None => current,
        Some(raw) => {
            let month = CalendarMonth::parse(raw)?;
            if month.first_day() >= current.first_day() {
                current
            } else {
                month
            }
        }
    };
    Ok(DateRange::calendar_month(resolved))
}

/// Consecutive month ranges ending with the current (in-progress) month,
/// oldest first. `None` falls back to [`DEFAULT_TREND_MONTHS`]; the count is
/// clamped to `MIN_TREND_MONTHS..=MAX_TREND_MONTHS`.
///
/// Unlike [`resolve_period`], the window deliberately includes the current
/// month so the chart shows spend accruing in real time.
pub fn trend_window(requested: Option<i64>, today: NaiveDate) -> Vec<DateRange> {
    let count = requested
        .unwrap_or(DEFAULT_TREND_MONTHS)
        .clamp(MIN_TREND_MONTHS, MAX_TREND_MONTHS);
    let current = CalendarMonth::containing(today);
    (0..count)
        .map(|offset| DateRange::calendar_month(current.minus_months(count - 1 - offset)))
        .collect()
}
