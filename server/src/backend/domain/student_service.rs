//! Student roster domain logic.
//!
//! The roster is read-mostly: it is seeded from a CSV export at startup and
//! then only queried. Students are keyed by `(name, class)`, so seeding the
//! same file twice leaves the roster unchanged.

use anyhow::Context;
use serde::Deserialize;
use shared::{Gender, StudentClass};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::backend::domain::commands::students::{SeedReport, StudentListQuery};
use crate::backend::domain::models::Student;
use crate::backend::storage::{DbConnection, StudentRepository, StudentStorage};

#[derive(Debug, thiserror::Error)]
pub enum StudentError {
    #[error("Invalid class '{0}'")]
    InvalidClass(String),
    #[error("Student not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// One row of the roster CSV: `name,class,gender`
#[derive(Debug, Deserialize)]
struct RosterRow {
    name: String,
    class: String,
    gender: String,
}

/// Service for looking up and seeding students
#[derive(Clone)]
pub struct StudentService {
    student_repository: StudentRepository,
}

impl StudentService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            student_repository: StudentRepository::new(db),
        }
    }

    /// List students ordered by name, optionally for one class
    pub async fn list_students(&self, query: StudentListQuery) -> Result<Vec<Student>, StudentError> {
        let class = match query.class.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<StudentClass>()
                    .map_err(|_| StudentError::InvalidClass(raw.to_string()))?,
            ),
        };

        let students = self.student_repository.list_students(class).await?;
        info!("Listed {} students (class filter: {:?})", students.len(), class);
        Ok(students)
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Student, StudentError> {
        self.student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| StudentError::NotFound(student_id.to_string()))
    }

    /// Seed the roster from a CSV file on disk
    pub async fn seed_from_csv(&self, path: &Path) -> anyhow::Result<SeedReport> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read student roster {}", path.display()))?;
        let report = self.seed_from_reader(bytes.as_slice()).await?;
        info!(
            "Seeded roster from {}: {} rows, {} skipped, {} students total",
            path.display(),
            report.rows_read,
            report.skipped,
            report.total_students
        );
        Ok(report)
    }

    /// Seed the roster from CSV data with a `name,class,gender` header.
    ///
    /// Rows with an empty name or an unknown class or gender are skipped and
    /// logged; a malformed CSV record aborts the whole seed.
    pub async fn seed_from_reader<R: Read>(&self, reader: R) -> anyhow::Result<SeedReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut students = Vec::new();
        let mut report = SeedReport::default();

        for (index, result) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let row = result.with_context(|| format!("Malformed roster row {}", index + 1))?;
            report.rows_read += 1;

            match Self::student_from_row(&row) {
                Some(student) => students.push(student),
                None => {
                    warn!("Skipping roster row {}: {:?}", index + 1, row);
                    report.skipped += 1;
                }
            }
        }

        for student in &students {
            self.student_repository.upsert_student(student).await?;
        }

        report.total_students = self.student_repository.count_students().await?;
        Ok(report)
    }

    fn student_from_row(row: &RosterRow) -> Option<Student> {
        if row.name.trim().is_empty() {
            return None;
        }
        let class = row.class.parse::<StudentClass>().ok()?;
        let gender = row.gender.parse::<Gender>().ok()?;
        Some(Student::new(&row.name, class, gender))
    }
}
