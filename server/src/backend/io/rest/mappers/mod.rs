//! Conversions between domain models and the `shared` DTOs.

pub mod payment_card_mapper;
pub mod payment_mapper;
pub mod student_mapper;

pub use payment_card_mapper::PaymentCardMapper;
pub use payment_mapper::PaymentMapper;
pub use student_mapper::StudentMapper;
