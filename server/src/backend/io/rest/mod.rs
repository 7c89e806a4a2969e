//! # REST API Interface Layer
//!
//! HTTP endpoints for the dues tracker. Handlers translate requests into
//! domain commands, call the services in [`AppState`](crate::backend::AppState)
//! and wrap results in the `ApiResponse` envelope.
//!
//! ## Endpoints
//!
//! - `/api/students`: roster, payment card, month picker
//! - `/api/payments`: submission, review, listing, approved overview, stats

pub mod errors;
pub mod mappers;
pub mod payment_apis;
pub mod student_apis;
