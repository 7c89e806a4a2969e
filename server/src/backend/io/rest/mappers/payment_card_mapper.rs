use std::collections::BTreeSet;

use shared::{MonthAvailability, MonthCell, MonthPickerResponse, PaymentCard};

use crate::backend::domain::commands::payment_card::{MonthPickerView, PaymentCardView};
use crate::backend::domain::reconciliation::month_keys;
use crate::backend::io::rest::mappers::StudentMapper;

/// Mapper for the payment card and month picker views.
pub struct PaymentCardMapper;

impl PaymentCardMapper {
    pub fn to_payment_card(view: PaymentCardView) -> PaymentCard {
        let paid: BTreeSet<_> = view.summary.paid_months.iter().copied().collect();
        PaymentCard {
            student: StudentMapper::to_dto(view.student),
            window_start: view.window.start().to_string(),
            window_end: view.window.end().to_string(),
            months: view
                .grid
                .into_iter()
                .map(|(month, paid)| MonthCell {
                    key: month.to_string(),
                    label: month.label(),
                    paid,
                })
                .collect(),
            paid_months: month_keys(&paid),
            paid_count: view.summary.paid_count,
            total_months: view.summary.total_months,
            progress_percent: view.summary.progress_percent,
            total_paid_amount: view.summary.total_paid_amount,
            monthly_fee: view.monthly_fee,
        }
    }

    pub fn to_month_picker(view: MonthPickerView) -> MonthPickerResponse {
        MonthPickerResponse {
            student_id: view.student_id,
            window_start: view.window.start().to_string(),
            window_end: view.window.end().to_string(),
            monthly_fee: view.monthly_fee,
            months: view
                .months
                .into_iter()
                .map(|(month, available)| MonthAvailability {
                    key: month.to_string(),
                    label: month.label(),
                    available,
                })
                .collect(),
        }
    }
}
