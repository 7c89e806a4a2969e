//! Fee and calendar settings that govern what a payment costs and which
//! months may be paid.

use super::month::{AcademicWindow, MonthRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuesPolicy {
    /// Fee for one month, in whole currency units
    pub monthly_fee: i64,
    pub window: AcademicWindow,
}

impl DuesPolicy {
    pub fn new(monthly_fee: i64, window: AcademicWindow) -> Self {
        Self { monthly_fee, window }
    }

    /// Amount due for a period: months covered times the monthly fee
    pub fn amount_for(&self, period: &MonthRange) -> i64 {
        period.len() as i64 * self.monthly_fee
    }
}
