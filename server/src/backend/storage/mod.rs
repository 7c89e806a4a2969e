//! # Storage Module
//!
//! Handles all persistence for the dues tracker.
//!
//! ## Current Implementation
//!
//! - **Relational data**: SQLite through SQLx. Students and payments live in
//!   two tables; the schema is created on startup by [`DbConnection`]
//! - **Receipt images**: plain files under the configured upload root,
//!   written by [`ReceiptStore`]
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: one repository per table, behind the traits in
//!   [`traits`] so the domain layer never sees SQL
//! - **Constraints in the database**: the one-live-payment-per-period rule is a
//!   partial unique index, not a read-then-write check

pub mod connection;
pub mod receipt_store;
pub mod repositories;
pub mod traits;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use receipt_store::ReceiptStore;
pub use repositories::{PaymentRepository, StudentRepository};
pub use traits::{PaymentFilter, PaymentStorage, PaymentTotals, StudentStorage, WriteOutcome};
