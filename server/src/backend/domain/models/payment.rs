//! Domain model for a submitted dues payment.

use chrono::{DateTime, Utc};
use shared::{PaymentStatus, StudentClass};
use uuid::Uuid;

use super::month::MonthRange;

/// Where a receipt image ended up after upload
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFile {
    /// Path relative to the public root, e.g. `/uploads/payments/2025/A1/<id>/2025-07_2025-09/receipt_1.png`
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub status: PaymentStatus,
    pub period: MonthRange,
    pub amount: i64,
    pub receipt: ReceiptFile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
}

impl Payment {
    /// A freshly submitted payment awaiting review
    pub fn new_pending(
        student_id: &str,
        period: MonthRange,
        amount: i64,
        receipt: ReceiptFile,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            status: PaymentStatus::Pending,
            period,
            amount,
            receipt,
            created_at: now,
            updated_at: now,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
        }
    }

    /// Mark approved, clearing any earlier rejection reason
    pub fn approve(&mut self, approved_by: Option<String>, now: DateTime<Utc>) {
        self.status = PaymentStatus::Approved;
        self.approved_at = Some(now);
        self.approved_by = approved_by;
        self.rejection_reason = None;
        self.updated_at = now;
    }

    /// Mark rejected, clearing any earlier approval
    pub fn reject(&mut self, reason: Option<String>, now: DateTime<Utc>) {
        self.status = PaymentStatus::Rejected;
        self.rejection_reason = reason;
        self.approved_at = None;
        self.approved_by = None;
        self.updated_at = now;
    }
}

/// A payment joined with the student fields shown alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentWithStudent {
    pub payment: Payment,
    pub student_name: String,
    pub student_class: StudentClass,
}
