use shared::{Student as SharedStudent, StudentClass, StudentListResponse, StudentSummary};

use crate::backend::domain::models::Student as DomainStudent;

/// Mapper to convert domain students to their shared DTOs.
pub struct StudentMapper;

impl StudentMapper {
    pub fn to_dto(domain: DomainStudent) -> SharedStudent {
        SharedStudent {
            id: domain.id,
            name: domain.name,
            class: domain.class,
            gender: domain.gender,
        }
    }

    pub fn to_list_response(students: Vec<DomainStudent>) -> StudentListResponse {
        StudentListResponse {
            students: students.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_summary(name: &str, class: StudentClass) -> StudentSummary {
        StudentSummary {
            name: name.to_string(),
            class,
        }
    }
}
