//! # Domain Module
//!
//! Business logic for the dues tracker, independent of HTTP and of the
//! concrete storage engine.
//!
//! ## Module Organization
//!
//! - **models**: students, payments, months, the academic window and fee policy
//! - **reconciliation**: pure paid-month computations over approved periods
//! - **upload_service**: receipt validation and placement on disk
//! - **student_service**: roster queries and CSV seeding
//! - **payment_service**: submission, review, listing and totals
//! - **payment_card**: per-student card, month picker and approved overview
//! - **commands**: input and output types exchanged with the REST layer
//!
//! ## Business Rules
//!
//! - Dues are tracked over a 12-month academic window
//! - A month is paid when any APPROVED payment's period covers it
//! - A payment's amount is the number of months it covers times the fee
//! - One live (non-rejected) payment per student per exact period

pub mod commands;
pub mod models;
pub mod payment_card;
pub mod payment_service;
pub mod reconciliation;
pub mod student_service;
pub mod upload_service;

pub use payment_card::PaymentCardService;
pub use payment_service::{PaymentError, PaymentService};
pub use student_service::{StudentError, StudentService};
pub use upload_service::{UploadError, UploadService, UploadedFile};
