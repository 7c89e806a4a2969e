//! Calendar-month arithmetic used by payments and the academic year window.
//!
//! Everything in the dues domain is tracked at month granularity, so the
//! building block here is [`YearMonth`], rendered in the stable `YYYY-MM`
//! key form. [`MonthRange`] is an inclusive span of months (a payment
//! period) and [`AcademicWindow`] is the fixed twelve-month span a school
//! year covers.

use std::fmt;
use std::str::FromStr;

/// Number of months in one academic year
pub const ACADEMIC_YEAR_MONTHS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month '{0}', expected YYYY-MM")]
pub struct MonthParseError(pub String);

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Build a month, returning `None` when `month` is not in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Move forward by `months` months
    pub fn plus_months(self, months: u32) -> Self {
        let zero_based = self.year as i64 * 12 + (self.month as i64 - 1) + months as i64;
        Self {
            year: zero_based.div_euclid(12) as i32,
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    /// English month name followed by the year, e.g. `July 2025`
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || MonthParseError(s.to_string());

        let (year, month) = trimmed.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        YearMonth::new(year, month).ok_or_else(err)
    }
}

/// Get the human-readable name for a month number
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January", 2 => "February", 3 => "March", 4 => "April",
        5 => "May", 6 => "June", 7 => "July", 8 => "August",
        9 => "September", 10 => "October", 11 => "November", 12 => "December",
        _ => "Invalid Month",
    }
}

/// Inclusive range of months, `start..=end`.
///
/// Callers are expected to keep `start <= end`; a reversed range simply
/// yields no months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Self {
        Self { start, end }
    }

    /// Every month in the range in ascending order
    pub fn months(&self) -> impl Iterator<Item = YearMonth> {
        let end = self.end;
        std::iter::successors(Some(self.start), |m| Some(m.succ())).take_while(move |m| *m <= end)
    }

    /// Number of months covered, zero for a reversed range
    pub fn len(&self) -> u32 {
        if self.end < self.start {
            return 0;
        }
        let span = (self.end.year - self.start.year) * 12 + self.end.month as i32 - self.start.month as i32;
        span as u32 + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    /// `YYYY-MM - YYYY-MM`
    pub fn display_period(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }
}

/// The academic year: twelve consecutive months starting at a configured month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicWindow {
    range: MonthRange,
}

impl AcademicWindow {
    /// Window starting at `start` and spanning [`ACADEMIC_YEAR_MONTHS`] months
    pub fn starting_at(start: YearMonth) -> Self {
        Self {
            range: MonthRange::new(start, start.plus_months(ACADEMIC_YEAR_MONTHS - 1)),
        }
    }

    pub fn start(&self) -> YearMonth {
        self.range.start
    }

    pub fn end(&self) -> YearMonth {
        self.range.end
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.range.contains(month)
    }

    /// Whether the whole range lies inside the window
    pub fn covers(&self, range: &MonthRange) -> bool {
        self.contains(range.start) && self.contains(range.end)
    }

    pub fn months(&self) -> impl Iterator<Item = YearMonth> {
        self.range.months()
    }

    pub fn len(&self) -> u32 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}
