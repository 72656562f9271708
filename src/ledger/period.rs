use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar granularity used to group ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
        }
    }

    pub fn all() -> [Granularity; 3] {
        [Granularity::Day, Granularity::Week, Granularity::Month]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A calendar period: granularity plus its normalized first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub granularity: Granularity,
    pub start: NaiveDate,
}

impl PeriodKey {
    /// The period of `granularity` that contains `date`.
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Self {
        let start = match granularity {
            Granularity::Day => date,
            Granularity::Week => week_start(date),
            Granularity::Month => month_start(date),
        };
        Self { granularity, start }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::containing(Granularity::Day, date)
    }

    pub fn week(date: NaiveDate) -> Self {
        Self::containing(Granularity::Week, date)
    }

    pub fn month(date: NaiveDate) -> Self {
        Self::containing(Granularity::Month, date)
    }

    /// Last calendar day of the period (inclusive).
    pub fn end(&self) -> NaiveDate {
        match self.granularity {
            Granularity::Day => self.start,
            Granularity::Week => self.start + Duration::days(6),
            Granularity::Month => month_end(self.start),
        }
    }

    /// Display label: `2025-08-01` for days, `2025-07-28 - 2025-08-03` for ranges.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.start.format("%Y-%m-%d").to_string(),
            Granularity::Week | Granularity::Month => format!(
                "{} - {}",
                self.start.format("%Y-%m-%d"),
                self.end().format("%Y-%m-%d")
            ),
        }
    }

    /// Short label for narrow table columns.
    pub fn short_label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.start.format("%m-%d %a").to_string(),
            Granularity::Week => format!(
                "{}..{}",
                self.start.format("%m-%d"),
                self.end().format("%m-%d")
            ),
            Granularity::Month => self.start.format("%Y %b").to_string(),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Monday of the week containing `date`.
///
/// Platform day-of-week numbering starts at 0 for Sunday; Sunday is treated
/// as the seventh day, so it belongs to the week that began six days earlier.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let dow = date.weekday().num_days_from_sunday() as i64;
    let back = if dow == 0 { 6 } else { dow - 1 };
    date - Duration::days(back)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

/// Day before the first day of the following month.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(next) => next - Duration::days(1),
        None => first,
    }
}
