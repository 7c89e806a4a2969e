use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use shared::{PaymentStatus, StudentClass};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use crate::backend::domain::models::{MonthRange, Payment, PaymentWithStudent, ReceiptFile, YearMonth};
use crate::backend::storage::connection::{is_unique_violation, DbConnection};
use crate::backend::storage::traits::{PaymentFilter, PaymentStorage, PaymentTotals, WriteOutcome};

const PAYMENT_COLUMNS: &str = "p.id, p.student_id, p.status, p.start_month, p.end_month, p.amount, \
     p.file_path, p.file_name, p.file_size, p.file_mime_type, p.created_at, p.updated_at, \
     p.approved_at, p.approved_by, p.rejection_reason";

/// Repository for payment submissions
#[derive(Clone)]
pub struct PaymentRepository {
    db: DbConnection,
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid stored timestamp: {}", value))?
        .with_timezone(&Utc))
}

fn parse_month(value: &str) -> Result<YearMonth> {
    value.parse::<YearMonth>().map_err(|e| anyhow!(e))
}

impl PaymentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_payment(row: &SqliteRow) -> Result<Payment> {
        let status: String = row.get("status");
        let start_month: String = row.get("start_month");
        let end_month: String = row.get("end_month");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let approved_at: Option<String> = row.get("approved_at");

        Ok(Payment {
            id: row.get("id"),
            student_id: row.get("student_id"),
            status: status.parse::<PaymentStatus>().map_err(|e| anyhow!(e))?,
            period: MonthRange::new(parse_month(&start_month)?, parse_month(&end_month)?),
            amount: row.get("amount"),
            receipt: ReceiptFile {
                file_path: row.get("file_path"),
                file_name: row.get("file_name"),
                file_size: row.get("file_size"),
                file_mime_type: row.get("file_mime_type"),
            },
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            approved_at: approved_at.as_deref().map(parse_timestamp).transpose()?,
            approved_by: row.get("approved_by"),
            rejection_reason: row.get("rejection_reason"),
        })
    }

    fn row_to_payment_with_student(row: &SqliteRow) -> Result<PaymentWithStudent> {
        let class: String = row.get("student_class");
        Ok(PaymentWithStudent {
            payment: Self::row_to_payment(row)?,
            student_name: row.get("student_name"),
            student_class: class.parse::<StudentClass>().map_err(|e| anyhow!(e))?,
        })
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PaymentFilter) {
        if let Some(student_id) = &filter.student_id {
            builder.push(" AND p.student_id = ").push_bind(student_id.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND p.status = ").push_bind(status.as_str());
        }
        if let Some(class) = filter.class {
            builder.push(" AND s.class = ").push_bind(class.as_str());
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND LOWER(s.name) LIKE ")
                .push_bind(format!("%{}%", escape_like(&search.to_lowercase())))
                .push(" ESCAPE '\\'");
        }
    }
}

/// Escape LIKE wildcards so the search text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl PaymentStorage for PaymentRepository {
    async fn store_payment(&self, payment: &Payment) -> Result<WriteOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, student_id, status, start_month, end_month, amount,
                file_path, file_name, file_size, file_mime_type,
                created_at, updated_at, approved_at, approved_by, rejection_reason
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.student_id)
        .bind(payment.status.as_str())
        .bind(payment.period.start.to_string())
        .bind(payment.period.end.to_string())
        .bind(payment.amount)
        .bind(&payment.receipt.file_path)
        .bind(&payment.receipt.file_name)
        .bind(payment.receipt.file_size)
        .bind(&payment.receipt.file_mime_type)
        .bind(format_timestamp(&payment.created_at))
        .bind(format_timestamp(&payment.updated_at))
        .bind(payment.approved_at.as_ref().map(format_timestamp))
        .bind(&payment.approved_by)
        .bind(&payment.rejection_reason)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::PeriodConflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_payment(&self, payment_id: &str) -> Result<Option<PaymentWithStudent>> {
        let sql = format!(
            "SELECT {}, s.name AS student_name, s.class AS student_class \
             FROM payments p JOIN students s ON s.id = p.student_id \
             WHERE p.id = ?",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(payment_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_payment_with_student).transpose()
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<PaymentWithStudent>, u64)> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM payments p JOIN students s ON s.id = p.student_id WHERE 1 = 1",
        );
        Self::push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        let mut list_query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, s.name AS student_name, s.class AS student_class \
             FROM payments p JOIN students s ON s.id = p.student_id WHERE 1 = 1",
            PAYMENT_COLUMNS
        ));
        Self::push_filters(&mut list_query, filter);
        list_query
            .push(" ORDER BY p.created_at DESC, p.rowid DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = list_query.build().fetch_all(self.db.pool()).await?;
        let payments = rows
            .iter()
            .map(Self::row_to_payment_with_student)
            .collect::<Result<Vec<_>>>()?;

        Ok((payments, total as u64))
    }

    async fn find_active_payment_for_period(
        &self,
        student_id: &str,
        period: &MonthRange,
    ) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments p \
             WHERE p.student_id = ? AND p.start_month = ? AND p.end_month = ? AND p.status <> 'REJECTED' \
             LIMIT 1",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(student_id)
            .bind(period.start.to_string())
            .bind(period.end.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    async fn list_approved_periods(&self, student_id: &str) -> Result<Vec<MonthRange>> {
        let rows = sqlx::query(
            r#"
            SELECT start_month, end_month
            FROM payments
            WHERE student_id = ? AND status = 'APPROVED'
            ORDER BY start_month ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<MonthRange> {
                let start: String = row.get("start_month");
                let end: String = row.get("end_month");
                Ok(MonthRange::new(parse_month(&start)?, parse_month(&end)?))
            })
            .collect()
    }

    async fn list_approved_payments(&self) -> Result<Vec<PaymentWithStudent>> {
        let sql = format!(
            "SELECT {}, s.name AS student_name, s.class AS student_class \
             FROM payments p JOIN students s ON s.id = p.student_id \
             WHERE p.status = 'APPROVED' \
             ORDER BY s.class ASC, s.name ASC, p.start_month ASC",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(self.db.pool()).await?;

        rows.iter().map(Self::row_to_payment_with_student).collect()
    }

    async fn update_review(&self, payment: &Payment) -> Result<WriteOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?, approved_at = ?, approved_by = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(payment.status.as_str())
        .bind(payment.approved_at.as_ref().map(format_timestamp))
        .bind(&payment.approved_by)
        .bind(&payment.rejection_reason)
        .bind(format_timestamp(&payment.updated_at))
        .bind(&payment.id)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(WriteOutcome::NotFound),
            Ok(_) => Ok(WriteOutcome::Written),
            Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::PeriodConflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn payment_totals(&self) -> Result<PaymentTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'APPROVED' THEN 1 ELSE 0 END), 0) AS approved,
                COALESCE(SUM(CASE WHEN status = 'REJECTED' THEN 1 ELSE 0 END), 0) AS rejected,
                COALESCE(SUM(amount), 0) AS total_amount
            FROM payments
            "#,
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(PaymentTotals {
            total: row.get::<i64, _>("total") as u64,
            pending: row.get::<i64, _>("pending") as u64,
            approved: row.get::<i64, _>("approved") as u64,
            rejected: row.get::<i64, _>("rejected") as u64,
            total_amount: row.get("total_amount"),
        })
    }
}
