//! Bookings, payments and installment plans.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingId, CourseId, PaymentId, UserId};
use crate::define_status_enum;

define_status_enum!(
    /// Lifecycle of a course booking. `Cancelled` and `Completed` are terminal.
    BookingStatus {
        Pending => "Pending",
        Confirmed => "Confirmed",
        Cancelled => "Cancelled",
        Completed => "Completed",
    }
);

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

define_status_enum!(
    /// How the student intends to pay for the course.
    PaymentPlan {
        Full => "Full",
        Installment => "Installment",
    }
);

define_status_enum!(
    PaymentMethod {
        Cash => "Cash",
        Card => "Card",
        Upi => "Upi",
        BankTransfer => "BankTransfer",
    }
);

define_status_enum!(
    /// State of a single installment. `Overdue` is derived on read and never stored.
    InstallmentStatus {
        Pending => "Pending",
        Paid => "Paid",
        Overdue => "Overdue",
    }
);

/// A student's booking of one course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub course_name: String,
    pub instructor_id: Option<UserId>,
    pub start_date: NaiveDate,
    pub preferred_slot: String,
    pub payment_plan: PaymentPlan,
    /// Course fee at booking time, in minor units.
    pub total_amount: i64,
    pub amount_paid: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn balance(&self) -> i64 {
        (self.total_amount - self.amount_paid).max(0)
    }
}

/// Insert payload for a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: UserId,
    pub course_id: CourseId,
    pub course_name: String,
    pub instructor_id: Option<UserId>,
    pub start_date: NaiveDate,
    pub preferred_slot: String,
    pub payment_plan: PaymentPlan,
    pub total_amount: i64,
}

/// A recorded payment against a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub student_id: UserId,
    pub amount: i64,
    pub method: PaymentMethod,
    /// `Some(0)` for an installment down payment, `Some(n)` for installment `n`.
    pub installment_number: Option<i32>,
    pub receipt_number: String,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// Receipt numbers are derived from the payment id and year: `RCPT-2024-000042`.
    pub fn receipt_number_for(id: PaymentId, paid_at: DateTime<Utc>) -> String {
        format!("RCPT-{}-{:06}", paid_at.year(), id.value())
    }
}

/// Insert payload for a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: BookingId,
    pub student_id: UserId,
    pub amount: i64,
    pub method: PaymentMethod,
    pub installment_number: Option<i32>,
    pub paid_at: DateTime<Utc>,
}

/// One entry of an installment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the plan.
    pub number: i32,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<PaymentId>,
}

impl Installment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

/// Installment schedule attached to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub booking_id: BookingId,
    pub months: i32,
    pub down_payment: i64,
    pub entries: Vec<Installment>,
    pub created_at: DateTime<Utc>,
}

impl InstallmentPlan {
    pub fn total_scheduled(&self) -> i64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn outstanding(&self) -> i64 {
        self.entries
            .iter()
            .filter(|e| !e.is_paid())
            .map(|e| e.amount)
            .sum()
    }
}
