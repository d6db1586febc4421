//! Booking repository trait: bookings, payments and installment plans.

use async_trait::async_trait;

use super::error::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    Booking, BookingId, BookingStatus, InstallmentPlan, NewBooking, NewPayment, Payment,
    PaymentId, UserId,
};

/// Filter for booking listings. Empty filter returns everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingFilter {
    pub student_id: Option<UserId>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn for_student(student_id: UserId) -> Self {
        Self {
            student_id: Some(student_id),
            status: None,
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.student_id.is_none_or(|id| booking.student_id == id)
            && self.status.is_none_or(|s| booking.status == s)
    }
}

/// A payment must be positive and may not exceed the outstanding balance.
pub(crate) fn check_payment_amount(
    amount: i64,
    booking: &Booking,
    operation: &str,
) -> RepositoryResult<()> {
    let context = || {
        ErrorContext::new(operation)
            .with_entity("booking")
            .with_entity_id(booking.id)
    };
    if amount <= 0 {
        return Err(RepositoryError::validation_with_context(
            format!("Payment amount must be positive, got {}", amount),
            context(),
        ));
    }
    if amount > booking.balance() {
        return Err(RepositoryError::conflict_with_context(
            format!(
                "Payment of {} exceeds the outstanding balance {} of booking {}",
                amount,
                booking.balance(),
                booking.id
            ),
            context(),
        ));
    }
    Ok(())
}

/// A stored payment and the booking right after it was applied.
#[derive(Debug, Clone)]
pub struct AppliedPayment {
    pub payment: Payment,
    pub booking: Booking,
}

/// Repository trait for bookings and money movements.
///
/// `amount_paid` only moves through the payment operations below, each of
/// which checks and writes under one lock or transaction.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    // ==================== Bookings ====================

    /// Store a new booking in `Pending` state with nothing paid.
    async fn create_booking(&self, booking: NewBooking) -> RepositoryResult<Booking>;

    /// Retrieve a booking by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking>;

    /// List bookings newest first.
    async fn list_bookings(&self, filter: BookingFilter) -> RepositoryResult<Vec<Booking>>;

    /// Persist status and instructor of a booking. `amount_paid` is left as stored.
    async fn update_booking(&self, booking: &Booking) -> RepositoryResult<Booking>;

    // ==================== Payments ====================

    /// Record a payment, assign its receipt number and add it to the booking's
    /// `amount_paid`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    /// * `Err(RepositoryError::Conflict)` - If the amount exceeds the outstanding balance
    async fn record_payment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment>;

    async fn get_payment(&self, payment_id: PaymentId) -> RepositoryResult<Payment>;

    /// List payments for a booking in the order they were made.
    async fn list_payments_for_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Vec<Payment>>;

    // ==================== Installment plans ====================

    /// Store a booking's installment plan and record its down payment, if any.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    /// * `Err(RepositoryError::Conflict)` - If the booking already has a plan
    async fn create_installment_plan(
        &self,
        plan: &InstallmentPlan,
        down_payment: Option<NewPayment>,
    ) -> RepositoryResult<(Booking, Option<Payment>)>;

    /// Pay installment `payment.installment_number` of the booking's plan:
    /// record the payment, mark the entry `Paid` and add to `amount_paid`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If there is no plan or no such installment
    /// * `Err(RepositoryError::Conflict)` - If the installment is already paid
    /// * `Err(RepositoryError::ValidationError)` - If the amount differs from the installment
    async fn pay_installment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment>;

    async fn get_installment_plan(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<InstallmentPlan>>;
}
