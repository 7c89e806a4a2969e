//! Payment submission and review.
//!
//! ## Business Rules
//!
//! - A payment covers an inclusive month range inside the academic window
//! - The amount is always months covered times the monthly fee
//! - A month that is already paid (covered by an approved payment) cannot be
//!   submitted again
//! - A student holds at most one non-rejected payment per exact period; the
//!   storage layer enforces this with a partial unique index, the pre-check
//!   here only produces a friendlier error
//! - Review moves a payment to APPROVED or REJECTED; PENDING is never a
//!   valid review outcome

use chrono::Utc;
use shared::{PaymentStatus, StudentClass};
use tracing::{error, info, warn};

use crate::backend::domain::commands::payments::{
    PaymentListQuery, PaymentListResult, ReviewPaymentCommand, SubmitPaymentCommand, SubmitPaymentResult,
};
use crate::backend::domain::models::{DuesPolicy, MonthRange, Payment, PaymentWithStudent, YearMonth};
use crate::backend::domain::reconciliation::{compute_paid_months, first_paid_month};
use crate::backend::domain::upload_service::{UploadError, UploadService};
use crate::backend::storage::{
    DbConnection, PaymentFilter, PaymentRepository, PaymentStorage, PaymentTotals, StudentRepository,
    StudentStorage, WriteOutcome,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("Student not found")]
    StudentNotFound(String),
    #[error("Payment not found")]
    NotFound(String),
    #[error("A payment for {0} already exists")]
    DuplicatePeriod(String),
    #[error("{0} is already paid")]
    AlreadyPaid(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn required(value: Option<String>, field: &str) -> Result<String, PaymentError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::Validation(format!("Missing required field: {}", field)))
}

fn parse_month(value: &str, field: &str) -> Result<YearMonth, PaymentError> {
    value
        .parse()
        .map_err(|_| PaymentError::Validation(format!("{} must be in YYYY-MM format, got '{}'", field, value)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct PaymentService {
    payment_repository: PaymentRepository,
    student_repository: StudentRepository,
    upload_service: UploadService,
    policy: DuesPolicy,
}

impl PaymentService {
    pub fn new(db: DbConnection, upload_service: UploadService, policy: DuesPolicy) -> Self {
        Self {
            payment_repository: PaymentRepository::new(db.clone()),
            student_repository: StudentRepository::new(db),
            upload_service,
            policy,
        }
    }

    /// Error for a request body cut off at the transport limit, before the
    /// receipt could be measured
    pub fn oversized_receipt(&self) -> PaymentError {
        PaymentError::Upload(self.upload_service.too_large(self.upload_service.max_file_size()))
    }

    /// Submit a payment with its receipt; it starts out PENDING
    pub async fn submit_payment(&self, command: SubmitPaymentCommand) -> Result<SubmitPaymentResult, PaymentError> {
        let student_id = required(command.student_id, "student_id")?;
        let start_month = required(command.start_month, "start_month")?;
        let end_month = required(command.end_month, "end_month")?;
        let file = command
            .file
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| PaymentError::Validation("Missing required field: file".to_string()))?;

        info!("Submitting payment for student {} ({} to {})", student_id, start_month, end_month);

        let student = self
            .student_repository
            .get_student(&student_id)
            .await?
            .ok_or_else(|| PaymentError::StudentNotFound(student_id.clone()))?;

        let period = self.validate_period(&start_month, &end_month)?;

        // Months already covered by an approved payment cannot be paid twice
        let approved = self.payment_repository.list_approved_periods(&student.id).await?;
        let paid = compute_paid_months(&approved);
        if let Some(month) = first_paid_month(&period, &paid) {
            warn!("Student {} tried to pay for {} again", student.id, month);
            return Err(PaymentError::AlreadyPaid(month.label()));
        }

        if self
            .payment_repository
            .find_active_payment_for_period(&student.id, &period)
            .await?
            .is_some()
        {
            warn!("Duplicate payment for student {} period {}", student.id, period.display_period());
            return Err(PaymentError::DuplicatePeriod(period.display_period()));
        }

        let now = Utc::now();
        let receipt = self
            .upload_service
            .save_payment_file(&file, &student.id, student.class, &period, now)
            .await?;

        let payment = Payment::new_pending(&student.id, period, self.policy.amount_for(&period), receipt, now);

        match self.payment_repository.store_payment(&payment).await {
            Ok(WriteOutcome::Written) => {
                info!(
                    "Payment {} created for {} ({}), amount {}",
                    payment.id,
                    student.name,
                    period.display_period(),
                    payment.amount
                );
                Ok(SubmitPaymentResult { payment, student })
            }
            Ok(_) => {
                // Lost a race with a concurrent identical submission
                warn!("Payment period {} taken concurrently for student {}", period.display_period(), student.id);
                self.upload_service.discard(&payment.receipt).await;
                Err(PaymentError::DuplicatePeriod(period.display_period()))
            }
            Err(e) => {
                error!("Failed to store payment for student {}: {}", student.id, e);
                self.upload_service.discard(&payment.receipt).await;
                Err(PaymentError::Storage(e))
            }
        }
    }

    fn validate_period(&self, start_month: &str, end_month: &str) -> Result<MonthRange, PaymentError> {
        let start = parse_month(start_month, "start_month")?;
        let end = parse_month(end_month, "end_month")?;
        if start > end {
            return Err(PaymentError::Validation(
                "start_month must not be after end_month".to_string(),
            ));
        }

        let period = MonthRange::new(start, end);
        let window = &self.policy.window;
        if !window.covers(&period) {
            return Err(PaymentError::Validation(format!(
                "Period must fall within the academic year {} to {}",
                window.start(),
                window.end()
            )));
        }
        Ok(period)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentWithStudent, PaymentError> {
        self.payment_repository
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))
    }

    /// Page through payments, newest first
    pub async fn list_payments(&self, query: PaymentListQuery) -> Result<PaymentListResult, PaymentError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut status = match non_blank(query.status) {
            Some(raw) => Some(
                raw.parse::<PaymentStatus>()
                    .map_err(|_| PaymentError::Validation(format!("Invalid status '{}'", raw)))?,
            ),
            None => None,
        };
        if query.approved_only.unwrap_or(false) {
            status = Some(PaymentStatus::Approved);
        }

        let class = match non_blank(query.class) {
            Some(raw) => Some(
                raw.parse::<StudentClass>()
                    .map_err(|_| PaymentError::Validation(format!("Invalid class '{}'", raw)))?,
            ),
            None => None,
        };

        let filter = PaymentFilter {
            student_id: non_blank(query.student_id),
            status,
            class,
            search: non_blank(query.search),
        };

        let offset = (page as u64 - 1) * limit as u64;
        let (payments, total) = self.payment_repository.list_payments(&filter, offset, limit).await?;
        let total_pages = total.div_ceil(limit as u64);

        info!("Listed {} of {} payments (page {}, limit {})", payments.len(), total, page, limit);

        Ok(PaymentListResult {
            payments,
            page,
            limit,
            total,
            total_pages,
        })
    }

    /// Approve or reject a payment
    pub async fn review_payment(&self, command: ReviewPaymentCommand) -> Result<PaymentWithStudent, PaymentError> {
        let status = match command.status.trim().parse::<PaymentStatus>() {
            Ok(status @ (PaymentStatus::Approved | PaymentStatus::Rejected)) => status,
            _ => {
                return Err(PaymentError::Validation(format!(
                    "Invalid status '{}': must be APPROVED or REJECTED",
                    command.status
                )))
            }
        };

        let mut record = self.get_payment(&command.payment_id).await?;
        let now = Utc::now();
        match status {
            PaymentStatus::Approved => record.payment.approve(non_blank(command.approved_by), now),
            _ => record.payment.reject(non_blank(command.rejection_reason), now),
        }

        match self.payment_repository.update_review(&record.payment).await? {
            WriteOutcome::Written => {
                info!("Payment {} marked {}", record.payment.id, status);
                Ok(record)
            }
            WriteOutcome::PeriodConflict => {
                warn!(
                    "Cannot mark payment {} {}: another live payment holds {}",
                    record.payment.id,
                    status,
                    record.payment.period.display_period()
                );
                Err(PaymentError::DuplicatePeriod(record.payment.period.display_period()))
            }
            WriteOutcome::NotFound => Err(PaymentError::NotFound(command.payment_id)),
        }
    }

    /// Counts and amount over every payment
    pub async fn stats(&self) -> Result<PaymentTotals, PaymentError> {
        Ok(self.payment_repository.payment_totals().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::{AcademicWindow, Student};
    use crate::backend::domain::upload_service::{UploadedFile, DEFAULT_MAX_FILE_SIZE};
    use crate::backend::storage::ReceiptStore;
    use shared::Gender;
    use tempfile::TempDir;

    struct TestEnv {
        _temp: TempDir,
        service: PaymentService,
        store: ReceiptStore,
        student: Student,
    }

    async fn setup_test() -> TestEnv {
        let temp = TempDir::new().unwrap();
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let store = ReceiptStore::new(temp.path());
        let policy = DuesPolicy::new(30000, AcademicWindow::starting_at("2025-07".parse().unwrap()));
        let service = PaymentService::new(
            db.clone(),
            UploadService::new(store.clone(), DEFAULT_MAX_FILE_SIZE),
            policy,
        );
        let student = StudentRepository::new(db)
            .upsert_student(&Student::new("Ayu Lestari", StudentClass::A2, Gender::Female))
            .await
            .unwrap();
        TestEnv {
            _temp: temp,
            service,
            store,
            student,
        }
    }

    fn receipt() -> UploadedFile {
        UploadedFile {
            file_name: "transfer.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1u8; 2048],
        }
    }

    fn submission(student_id: &str, start: &str, end: &str) -> SubmitPaymentCommand {
        SubmitPaymentCommand {
            student_id: Some(student_id.to_string()),
            start_month: Some(start.to_string()),
            end_month: Some(end.to_string()),
            file: Some(receipt()),
        }
    }

    fn review(payment_id: &str, status: &str) -> ReviewPaymentCommand {
        ReviewPaymentCommand {
            payment_id: payment_id.to_string(),
            status: status.to_string(),
            rejection_reason: None,
            approved_by: None,
        }
    }

    #[tokio::test]
    async fn test_submit_payment_creates_pending() {
        let env = setup_test().await;
        let result = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-09"))
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Pending);
        assert_eq!(result.payment.amount, 90000);
        assert_eq!(result.payment.period.display_period(), "2025-07 - 2025-09");
        assert_eq!(result.student.name, "Ayu Lestari");
        assert!(env.store.resolve(&result.payment.receipt.file_path).unwrap().exists());

        let stored = env.service.get_payment(&result.payment.id).await.unwrap();
        assert_eq!(stored.student_class, StudentClass::A2);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let env = setup_test().await;

        let mut no_file = submission(&env.student.id, "2025-07", "2025-07");
        no_file.file = None;
        let err = env.service.submit_payment(no_file).await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(ref m) if m.contains("file")));

        let mut blank_month = submission(&env.student.id, "2025-07", "2025-07");
        blank_month.end_month = Some("  ".to_string());
        let err = env.service.submit_payment(blank_month).await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(ref m) if m.contains("end_month")));
    }

    #[tokio::test]
    async fn test_unknown_student() {
        let env = setup_test().await;
        let err = env
            .service
            .submit_payment(submission("ghost", "2025-07", "2025-07"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::StudentNotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_periods() {
        let env = setup_test().await;
        for (start, end) in [
            ("2025-7", "2025-08"),
            ("2025-09", "2025-07"),
            ("2025-06", "2025-07"),
            ("2026-06", "2026-07"),
        ] {
            let err = env
                .service
                .submit_payment(submission(&env.student.id, start, end))
                .await
                .unwrap_err();
            assert!(matches!(err, PaymentError::Validation(_)), "{} to {} should be invalid", start, end);
        }
    }

    #[tokio::test]
    async fn test_duplicate_period_conflicts_until_rejected() {
        let env = setup_test().await;
        let first = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-09"))
            .await
            .unwrap();

        let err = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-09"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::DuplicatePeriod(_)));

        env.service.review_payment(review(&first.payment.id, "REJECTED")).await.unwrap();

        let resubmitted = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-09"))
            .await
            .unwrap();
        assert_ne!(resubmitted.payment.id, first.payment.id);
    }

    #[tokio::test]
    async fn test_paid_months_cannot_be_resubmitted() {
        let env = setup_test().await;
        let first = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-09"))
            .await
            .unwrap();
        env.service.review_payment(review(&first.payment.id, "APPROVED")).await.unwrap();

        let err = env
            .service
            .submit_payment(submission(&env.student.id, "2025-09", "2025-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyPaid(ref m) if m == "September 2025"));

        env.service
            .submit_payment(submission(&env.student.id, "2025-10", "2025-10"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_oversized_receipt_stores_nothing() {
        let env = setup_test().await;
        let mut command = submission(&env.student.id, "2025-07", "2025-07");
        command.file = Some(UploadedFile {
            bytes: vec![0u8; 6 * 1024 * 1024],
            ..receipt()
        });

        let err = env.service.submit_payment(command).await.unwrap_err();
        assert!(matches!(err, PaymentError::Upload(UploadError::TooLarge { .. })));
        assert_eq!(env.service.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_review_sets_and_clears_fields() {
        let env = setup_test().await;
        let submitted = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-07"))
            .await
            .unwrap();

        let mut reject = review(&submitted.payment.id, "REJECTED");
        reject.rejection_reason = Some("Receipt unreadable".to_string());
        let rejected = env.service.review_payment(reject).await.unwrap();
        assert_eq!(rejected.payment.status, PaymentStatus::Rejected);
        assert_eq!(rejected.payment.rejection_reason.as_deref(), Some("Receipt unreadable"));

        let mut approve = review(&submitted.payment.id, "APPROVED");
        approve.approved_by = Some("Treasurer".to_string());
        let approved = env.service.review_payment(approve).await.unwrap();
        assert_eq!(approved.payment.status, PaymentStatus::Approved);
        assert_eq!(approved.payment.approved_by.as_deref(), Some("Treasurer"));
        assert!(approved.payment.approved_at.is_some());
        assert!(approved.payment.rejection_reason.is_none());

        let stored = env.service.get_payment(&submitted.payment.id).await.unwrap();
        assert_eq!(stored.payment.status, PaymentStatus::Approved);
        assert!(stored.payment.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_review_rejects_bad_status_and_missing_payment() {
        let env = setup_test().await;
        let submitted = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-07"))
            .await
            .unwrap();

        for status in ["PENDING", "PAID", ""] {
            let err = env.service.review_payment(review(&submitted.payment.id, status)).await.unwrap_err();
            assert!(matches!(err, PaymentError::Validation(_)), "{:?} should be refused", status);
        }

        let err = env.service.review_payment(review("missing", "APPROVED")).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reactivating_rejected_payment_conflicts() {
        let env = setup_test().await;
        let first = env
            .service
            .submit_payment(submission(&env.student.id, "2025-08", "2025-08"))
            .await
            .unwrap();
        env.service.review_payment(review(&first.payment.id, "REJECTED")).await.unwrap();
        env.service
            .submit_payment(submission(&env.student.id, "2025-08", "2025-08"))
            .await
            .unwrap();

        let err = env.service.review_payment(review(&first.payment.id, "APPROVED")).await.unwrap_err();
        assert!(matches!(err, PaymentError::DuplicatePeriod(_)));
    }

    #[tokio::test]
    async fn test_list_payments_pagination_and_filters() {
        let env = setup_test().await;
        let mut ids = Vec::new();
        for month in ["2025-07", "2025-08", "2025-09"] {
            let result = env
                .service
                .submit_payment(submission(&env.student.id, month, month))
                .await
                .unwrap();
            ids.push(result.payment.id);
        }
        env.service.review_payment(review(&ids[0], "APPROVED")).await.unwrap();

        let page = env
            .service
            .list_payments(PaymentListQuery {
                page: Some(1),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.payments.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let approved = env
            .service
            .list_payments(PaymentListQuery {
                approved_only: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(approved.total, 1);
        assert_eq!(approved.payments[0].payment.id, ids[0]);
        assert_eq!(approved.limit, DEFAULT_PAGE_SIZE);

        let search = env
            .service
            .list_payments(PaymentListQuery {
                search: Some("AYU".to_string()),
                limit: Some(500),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.total, 3);
        assert_eq!(search.limit, MAX_PAGE_SIZE);

        let err = env
            .service
            .list_payments(PaymentListQuery {
                status: Some("WAITING".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let env = setup_test().await;
        let a = env
            .service
            .submit_payment(submission(&env.student.id, "2025-07", "2025-08"))
            .await
            .unwrap();
        let b = env
            .service
            .submit_payment(submission(&env.student.id, "2025-09", "2025-09"))
            .await
            .unwrap();
        env.service
            .submit_payment(submission(&env.student.id, "2025-10", "2025-10"))
            .await
            .unwrap();
        env.service.review_payment(review(&a.payment.id, "APPROVED")).await.unwrap();
        env.service.review_payment(review(&b.payment.id, "REJECTED")).await.unwrap();

        let stats = env.service.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 1);
    }
}
