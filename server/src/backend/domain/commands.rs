//! Domain-level command and query types.
//!
//! Services take and return these; the REST layer maps the public DTOs of
//! the `shared` crate onto them and back.

pub mod students {
    /// Query for listing the roster
    #[derive(Debug, Clone, Default)]
    pub struct StudentListQuery {
        /// Class code such as `A1`; `None` or empty lists everyone
        pub class: Option<String>,
    }

    /// Outcome of seeding the roster from a CSV file
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SeedReport {
        pub rows_read: usize,
        pub skipped: usize,
        pub total_students: u64,
    }
}

pub mod payments {
    use crate::backend::domain::models::{Payment, PaymentWithStudent, Student};
    use crate::backend::domain::upload_service::UploadedFile;

    /// A new payment submission, as received from the client.
    ///
    /// Fields are optional so the service can report which are missing.
    #[derive(Debug, Clone, Default)]
    pub struct SubmitPaymentCommand {
        pub student_id: Option<String>,
        pub start_month: Option<String>,
        pub end_month: Option<String>,
        pub file: Option<UploadedFile>,
    }

    #[derive(Debug, Clone)]
    pub struct SubmitPaymentResult {
        pub payment: Payment,
        pub student: Student,
    }

    /// Query parameters for listing payments
    #[derive(Debug, Clone, Default)]
    pub struct PaymentListQuery {
        pub student_id: Option<String>,
        pub status: Option<String>,
        pub class: Option<String>,
        pub search: Option<String>,
        /// Shorthand for `status = APPROVED`
        pub approved_only: Option<bool>,
        pub page: Option<u32>,
        pub limit: Option<u32>,
    }

    #[derive(Debug, Clone)]
    pub struct PaymentListResult {
        pub payments: Vec<PaymentWithStudent>,
        pub page: u32,
        pub limit: u32,
        pub total: u64,
        pub total_pages: u64,
    }

    /// Admin decision on a payment
    #[derive(Debug, Clone)]
    pub struct ReviewPaymentCommand {
        pub payment_id: String,
        /// `APPROVED` or `REJECTED`; anything else is refused
        pub status: String,
        pub rejection_reason: Option<String>,
        pub approved_by: Option<String>,
    }
}

pub mod payment_card {
    use shared::StudentClass;

    use crate::backend::domain::models::{AcademicWindow, Student, YearMonth};
    use crate::backend::domain::reconciliation::PaidMonthsSummary;

    /// One student's paid months laid over the academic window
    #[derive(Debug, Clone)]
    pub struct PaymentCardView {
        pub student: Student,
        pub window: AcademicWindow,
        /// Every window month with its paid flag
        pub grid: Vec<(YearMonth, bool)>,
        pub summary: PaidMonthsSummary,
        pub monthly_fee: i64,
    }

    /// Which window months a student may still pay for
    #[derive(Debug, Clone)]
    pub struct MonthPickerView {
        pub student_id: String,
        pub window: AcademicWindow,
        pub monthly_fee: i64,
        pub months: Vec<(YearMonth, bool)>,
    }

    /// Approved months of one student, for the cross-student overview
    #[derive(Debug, Clone, PartialEq)]
    pub struct StudentApprovedMonths {
        pub student_id: String,
        pub name: String,
        pub class: StudentClass,
        pub paid_months: Vec<YearMonth>,
    }
}
