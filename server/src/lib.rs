//! School dues tracker service: students submit monthly dues with a receipt
//! image, administrators review them, and per-student payment cards show
//! which months of the academic year are paid.

pub mod backend;
