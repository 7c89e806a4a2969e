// Repository modules
pub mod payment_repository;
pub mod student_repository;

// Re-export repository types
pub use payment_repository::PaymentRepository;
pub use student_repository::StudentRepository;
