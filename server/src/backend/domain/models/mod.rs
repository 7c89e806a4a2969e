//! Domain models for the dues tracker.

pub mod dues_policy;
pub mod month;
pub mod payment;
pub mod student;

pub use dues_policy::DuesPolicy;
pub use month::{AcademicWindow, MonthParseError, MonthRange, YearMonth, ACADEMIC_YEAR_MONTHS};
pub use payment::{Payment, PaymentWithStudent, ReceiptFile};
pub use student::Student;
