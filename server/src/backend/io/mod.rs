//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services. Only REST
//! today; receipts themselves are served as static files by the router.

pub mod rest;

pub use rest::errors::ApiError;
