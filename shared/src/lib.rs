use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope wrapping every JSON response of the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// One of the fixed classes a student can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StudentClass {
    A1,
    A2,
    A3,
    B1,
    B2,
    B3,
    B4,
}

impl StudentClass {
    pub const ALL: [StudentClass; 7] = [
        StudentClass::A1,
        StudentClass::A2,
        StudentClass::A3,
        StudentClass::B1,
        StudentClass::B2,
        StudentClass::B3,
        StudentClass::B4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentClass::A1 => "A1",
            StudentClass::A2 => "A2",
            StudentClass::A3 => "A3",
            StudentClass::B1 => "B1",
            StudentClass::B2 => "B2",
            StudentClass::B3 => "B3",
            StudentClass::B4 => "B4",
        }
    }
}

impl fmt::Display for StudentClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        StudentClass::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == wanted)
            .ok_or_else(|| format!("Unknown class: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Accepts the stored form as well as the labels used in the school's roster
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "laki-laki" | "laki_laki" | "l" => Ok(Gender::Male),
            "female" | "f" | "perempuan" | "p" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

/// Review state of a submitted payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "APPROVED" => Ok(PaymentStatus::Approved),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class: StudentClass,
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
}

/// Student fields embedded in payment responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub name: String,
    pub class: StudentClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub status: PaymentStatus,
    /// First paid month, `YYYY-MM`
    pub start_month: String,
    /// Last paid month (inclusive), `YYYY-MM`
    pub end_month: String,
    pub amount: i64,
    /// Receipt location relative to the public root, e.g. `/uploads/payments/...`
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_mime_type: String,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
    pub approved_at: Option<String>,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub student: StudentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPaymentResponse {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: i64,
    /// Human-readable period, `YYYY-MM - YYYY-MM`
    pub period: String,
    pub student: StudentSummary,
}

/// Body of `PATCH /api/payments/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    /// `APPROVED` or `REJECTED`
    pub status: String,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub pagination: PaginationInfo,
}

/// Aggregate figures shown on the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPaidMonths {
    pub id: String,
    pub name: String,
    pub class: StudentClass,
    /// Sorted `YYYY-MM` keys
    pub paid_months: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedPaymentsResponse {
    pub students: Vec<StudentPaidMonths>,
}

/// One month of the payment card grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCell {
    pub key: String,
    pub label: String,
    pub paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCard {
    pub student: Student,
    pub window_start: String,
    pub window_end: String,
    pub months: Vec<MonthCell>,
    pub paid_months: Vec<String>,
    pub paid_count: u32,
    pub total_months: u32,
    pub progress_percent: u32,
    pub total_paid_amount: i64,
    pub monthly_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthAvailability {
    pub key: String,
    pub label: String,
    pub available: bool,
}

/// Month-picker data: which months of the window can still be paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPickerResponse {
    pub student_id: String,
    pub window_start: String,
    pub window_end: String,
    pub monthly_fee: i64,
    pub months: Vec<MonthAvailability>,
}
