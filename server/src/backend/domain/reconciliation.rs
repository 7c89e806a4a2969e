//! Payment-period reconciliation.
//!
//! Turns a student's approved payment periods into the set of calendar
//! months that are paid, and derives the figures the payment card shows
//! from that set. Everything here is a pure function over its input.
//!
//! ## Rules
//!
//! - Each period contributes every month from its start to its end, inclusive
//! - Periods are unioned: a month covered twice counts once
//! - Months come back sorted ascending and render as `YYYY-MM`
//! - Periods are **not** clipped to the academic window here; callers that
//!   need window-bounded figures filter first (see [`restrict_to_window`])
//! - A month is available for a new payment only when it lies inside the
//!   window and is not already paid

use std::collections::BTreeSet;

use super::models::{AcademicWindow, MonthRange, YearMonth};

/// Paid-month figures for one student
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidMonthsSummary {
    pub paid_months: Vec<YearMonth>,
    pub paid_count: u32,
    pub total_months: u32,
    pub progress_percent: u32,
    pub total_paid_amount: i64,
}

/// Union of every month covered by the given periods
pub fn compute_paid_months<'a, I>(periods: I) -> BTreeSet<YearMonth>
where
    I: IntoIterator<Item = &'a MonthRange>,
{
    periods.into_iter().flat_map(|period| period.months()).collect()
}

/// `YYYY-MM` keys of a paid-month set, ascending
pub fn month_keys(paid: &BTreeSet<YearMonth>) -> Vec<String> {
    paid.iter().map(|m| m.to_string()).collect()
}

/// Drop months outside the window
pub fn restrict_to_window(paid: &BTreeSet<YearMonth>, window: &AcademicWindow) -> BTreeSet<YearMonth> {
    paid.iter().copied().filter(|m| window.contains(*m)).collect()
}

/// `round(paid / total * 100)`, halves rounding up. Zero when `total` is zero.
pub fn progress_percent(paid: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let paid = paid as u64;
    let total = total as u64;
    ((paid * 200 + total) / (total * 2)) as u32
}

/// Derive count, progress and amount from a paid-month set
pub fn summarize(paid: &BTreeSet<YearMonth>, total_months: u32, monthly_fee: i64) -> PaidMonthsSummary {
    let paid_count = paid.len() as u32;
    PaidMonthsSummary {
        paid_months: paid.iter().copied().collect(),
        paid_count,
        total_months,
        progress_percent: progress_percent(paid_count, total_months),
        total_paid_amount: paid_count as i64 * monthly_fee,
    }
}

/// Whether `month` can be selected for a new payment
pub fn is_month_available(
    month: YearMonth,
    paid: &BTreeSet<YearMonth>,
    window_start: YearMonth,
    window_end: YearMonth,
) -> bool {
    window_start <= month && month <= window_end && !paid.contains(&month)
}

/// Every month of the window paired with whether it is paid
pub fn month_grid(window: &AcademicWindow, paid: &BTreeSet<YearMonth>) -> Vec<(YearMonth, bool)> {
    window.months().map(|m| (m, paid.contains(&m))).collect()
}

/// First month of `period` that is already in `paid`, if any
pub fn first_paid_month(period: &MonthRange, paid: &BTreeSet<YearMonth>) -> Option<YearMonth> {
    period.months().find(|m| paid.contains(m))
}
