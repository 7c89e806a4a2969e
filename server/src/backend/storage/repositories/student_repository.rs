use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{Gender, StudentClass};
use sqlx::{sqlite::SqliteRow, Row};

use crate::backend::domain::models::Student;
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::traits::StudentStorage;

/// Repository for the student roster
#[derive(Clone)]
pub struct StudentRepository {
    db: DbConnection,
}

impl StudentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_student(row: &SqliteRow) -> Result<Student> {
        let class: String = row.get("class");
        let gender: String = row.get("gender");
        Ok(Student {
            id: row.get("id"),
            name: row.get("name"),
            class: class.parse::<StudentClass>().map_err(|e| anyhow!(e))?,
            gender: gender.parse::<Gender>().map_err(|e| anyhow!(e))?,
        })
    }
}

#[async_trait]
impl StudentStorage for StudentRepository {
    async fn upsert_student(&self, student: &Student) -> Result<Student> {
        sqlx::query(
            r#"
            INSERT INTO students (id, name, class, gender)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (name, class) DO NOTHING
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(student.class.as_str())
        .bind(student.gender.as_str())
        .execute(self.db.pool())
        .await?;

        let row = sqlx::query(
            r#"
            SELECT id, name, class, gender
            FROM students
            WHERE name = ? AND class = ?
            "#,
        )
        .bind(&student.name)
        .bind(student.class.as_str())
        .fetch_one(self.db.pool())
        .await?;

        Self::row_to_student(&row)
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, class, gender
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(student_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::row_to_student).transpose()
    }

    async fn list_students(&self, class: Option<StudentClass>) -> Result<Vec<Student>> {
        let rows = match class {
            Some(class) => {
                sqlx::query(
                    r#"
                    SELECT id, name, class, gender
                    FROM students
                    WHERE class = ?
                    ORDER BY name ASC
                    "#,
                )
                .bind(class.as_str())
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, name, class, gender
                    FROM students
                    ORDER BY name ASC
                    "#,
                )
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(Self::row_to_student).collect()
    }

    async fn count_students(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count as u64)
    }
}
