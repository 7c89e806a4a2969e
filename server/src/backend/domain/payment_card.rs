//! Per-student payment card and month picker.
//!
//! Read-only views built from approved payments through the pure
//! functions in [`super::reconciliation`]. The card only counts months
//! inside the academic window; the cross-student overview reports every
//! approved month as stored.

use std::collections::BTreeMap;
use tracing::info;

use crate::backend::domain::commands::payment_card::{MonthPickerView, PaymentCardView, StudentApprovedMonths};
use crate::backend::domain::models::{DuesPolicy, MonthRange};
use crate::backend::domain::reconciliation::{
    compute_paid_months, is_month_available, month_grid, restrict_to_window, summarize,
};
use crate::backend::domain::student_service::StudentError;
use crate::backend::storage::{DbConnection, PaymentRepository, PaymentStorage, StudentRepository, StudentStorage};

#[derive(Clone)]
pub struct PaymentCardService {
    payment_repository: PaymentRepository,
    student_repository: StudentRepository,
    policy: DuesPolicy,
}

impl PaymentCardService {
    pub fn new(db: DbConnection, policy: DuesPolicy) -> Self {
        Self {
            payment_repository: PaymentRepository::new(db.clone()),
            student_repository: StudentRepository::new(db),
            policy,
        }
    }

    /// Paid months, progress and amount for one student over the window
    pub async fn get_payment_card(&self, student_id: &str) -> Result<PaymentCardView, StudentError> {
        let student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| StudentError::NotFound(student_id.to_string()))?;

        let window = self.policy.window;
        let periods = self.payment_repository.list_approved_periods(&student.id).await?;
        let paid = restrict_to_window(&compute_paid_months(&periods), &window);
        let summary = summarize(&paid, window.len(), self.policy.monthly_fee);

        info!(
            "Payment card for {}: {}/{} months paid ({}%)",
            student.name, summary.paid_count, summary.total_months, summary.progress_percent
        );

        Ok(PaymentCardView {
            grid: month_grid(&window, &paid),
            student,
            window,
            summary,
            monthly_fee: self.policy.monthly_fee,
        })
    }

    /// Every window month flagged with whether it can still be paid for
    pub async fn get_month_picker(&self, student_id: &str) -> Result<MonthPickerView, StudentError> {
        let student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| StudentError::NotFound(student_id.to_string()))?;

        let window = self.policy.window;
        let periods = self.payment_repository.list_approved_periods(&student.id).await?;
        let paid = compute_paid_months(&periods);
        let months = window
            .months()
            .map(|m| (m, is_month_available(m, &paid, window.start(), window.end())))
            .collect();

        Ok(MonthPickerView {
            student_id: student.id,
            window,
            monthly_fee: self.policy.monthly_fee,
            months,
        })
    }

    /// Every student with at least one approved payment, with their paid months.
    ///
    /// Ordered by class then name.
    pub async fn list_approved_months(&self) -> Result<Vec<StudentApprovedMonths>, StudentError> {
        let approved = self.payment_repository.list_approved_payments().await?;

        // Rows arrive ordered by class and name; keep that order while grouping
        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, (StudentApprovedMonths, Vec<MonthRange>)> = BTreeMap::new();
        for row in approved {
            let entry = grouped.entry(row.payment.student_id.clone()).or_insert_with(|| {
                order.push(row.payment.student_id.clone());
                (
                    StudentApprovedMonths {
                        student_id: row.payment.student_id.clone(),
                        name: row.student_name.clone(),
                        class: row.student_class,
                        paid_months: Vec::new(),
                    },
                    Vec::new(),
                )
            });
            entry.1.push(row.payment.period);
        }

        let students = order
            .into_iter()
            .filter_map(|id| grouped.remove(&id))
            .map(|(mut student, periods)| {
                student.paid_months = compute_paid_months(&periods).into_iter().collect();
                student
            })
            .collect::<Vec<_>>();

        info!("Approved months listed for {} students", students.len());
        Ok(students)
    }
}
