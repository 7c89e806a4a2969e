use chrono::{DateTime, SecondsFormat, Utc};
use shared::{
    ApprovedPaymentsResponse, PaginationInfo, Payment as SharedPayment, PaymentListResponse, PaymentStats,
    StudentPaidMonths, SubmitPaymentResponse,
};

use crate::backend::domain::commands::payment_card::StudentApprovedMonths;
use crate::backend::domain::commands::payments::{PaymentListResult, SubmitPaymentResult};
use crate::backend::domain::models::PaymentWithStudent;
use crate::backend::io::rest::mappers::StudentMapper;
use crate::backend::storage::PaymentTotals;

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Mapper to convert domain payments and payment query results to shared DTOs.
pub struct PaymentMapper;

impl PaymentMapper {
    pub fn to_dto(record: PaymentWithStudent) -> SharedPayment {
        let PaymentWithStudent {
            payment,
            student_name,
            student_class,
        } = record;

        SharedPayment {
            id: payment.id,
            student_id: payment.student_id,
            status: payment.status,
            start_month: payment.period.start.to_string(),
            end_month: payment.period.end.to_string(),
            amount: payment.amount,
            file_path: payment.receipt.file_path,
            file_name: payment.receipt.file_name,
            file_size: payment.receipt.file_size,
            file_mime_type: payment.receipt.file_mime_type,
            created_at: format_timestamp(&payment.created_at),
            updated_at: format_timestamp(&payment.updated_at),
            approved_at: payment.approved_at.as_ref().map(format_timestamp),
            approved_by: payment.approved_by,
            rejection_reason: payment.rejection_reason,
            student: StudentMapper::to_summary(&student_name, student_class),
        }
    }

    pub fn to_submit_response(result: SubmitPaymentResult) -> SubmitPaymentResponse {
        SubmitPaymentResponse {
            id: result.payment.id,
            status: result.payment.status,
            amount: result.payment.amount,
            period: result.payment.period.display_period(),
            student: StudentMapper::to_summary(&result.student.name, result.student.class),
        }
    }

    pub fn to_list_response(result: PaymentListResult) -> PaymentListResponse {
        PaymentListResponse {
            payments: result.payments.into_iter().map(Self::to_dto).collect(),
            pagination: PaginationInfo {
                page: result.page,
                limit: result.limit,
                total: result.total,
                total_pages: result.total_pages,
            },
        }
    }

    pub fn to_stats(totals: PaymentTotals) -> PaymentStats {
        PaymentStats {
            total: totals.total,
            pending: totals.pending,
            approved: totals.approved,
            rejected: totals.rejected,
            total_amount: totals.total_amount,
        }
    }

    pub fn to_approved_response(students: Vec<StudentApprovedMonths>) -> ApprovedPaymentsResponse {
        ApprovedPaymentsResponse {
            students: students
                .into_iter()
                .map(|s| StudentPaidMonths {
                    id: s.student_id,
                    name: s.name,
                    class: s.class,
                    paid_months: s.paid_months.iter().map(|m| m.to_string()).collect(),
                })
                .collect(),
        }
    }
}
