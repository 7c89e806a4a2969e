//! Domain model for a student on the school roster.

use shared::{Gender, StudentClass};
use uuid::Uuid;

/// A student. Reference data: loaded once from the roster and never edited
/// through the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class: StudentClass,
    pub gender: Gender,
}

impl Student {
    /// Build a roster entry with a fresh ID
    pub fn new(name: &str, class: StudentClass, gender: Gender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            class,
            gender,
        }
    }
}
