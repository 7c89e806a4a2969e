//! # Storage Traits
//!
//! Storage abstractions the domain layer depends on. The SQLite repositories
//! in [`super::repositories`] are the only implementations today.

use anyhow::Result;
use async_trait::async_trait;
use shared::{PaymentStatus, StudentClass};

use crate::backend::domain::models::{MonthRange, Payment, PaymentWithStudent, Student};

/// Filters accepted when listing payments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFilter {
    pub student_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub class: Option<StudentClass>,
    /// Case-insensitive substring of the student's name
    pub search: Option<String>,
}

/// Counts and sums over all payments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentTotals {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total_amount: i64,
}

/// Result of a write that may collide with the one-live-payment-per-period rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Another non-rejected payment already holds the same student and period
    PeriodConflict,
    NotFound,
}

#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Insert a student, or return the existing row with the same name and class
    async fn upsert_student(&self, student: &Student) -> Result<Student>;

    /// Retrieve a specific student by ID
    async fn get_student(&self, student_id: &str) -> Result<Option<Student>>;

    /// List students ordered by name, optionally restricted to one class
    async fn list_students(&self, class: Option<StudentClass>) -> Result<Vec<Student>>;

    async fn count_students(&self) -> Result<u64>;
}

#[async_trait]
pub trait PaymentStorage: Send + Sync {
    /// Insert a new payment
    async fn store_payment(&self, payment: &Payment) -> Result<WriteOutcome>;

    /// Retrieve a payment with its student's name and class
    async fn get_payment(&self, payment_id: &str) -> Result<Option<PaymentWithStudent>>;

    /// Page through payments, newest first. Returns the page and the total match count.
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<PaymentWithStudent>, u64)>;

    /// A non-rejected payment of this student for exactly this period
    async fn find_active_payment_for_period(
        &self,
        student_id: &str,
        period: &MonthRange,
    ) -> Result<Option<Payment>>;

    /// Periods of every approved payment of one student
    async fn list_approved_periods(&self, student_id: &str) -> Result<Vec<MonthRange>>;

    /// All approved payments, ordered by class, student name, then start month
    async fn list_approved_payments(&self) -> Result<Vec<PaymentWithStudent>>;

    /// Persist the review fields (status, approval and rejection metadata)
    async fn update_review(&self, payment: &Payment) -> Result<WriteOutcome>;

    async fn payment_totals(&self) -> Result<PaymentTotals>;
}
