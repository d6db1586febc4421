//! Full payments and receipts.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::bookings::ensure_enrollment;
use super::{deliver, ServiceError, ServiceResult};
use crate::config::AppConfig;
use crate::db::repository::{AppliedPayment, BookingRepository, FullRepository, UserRepository};
use crate::models::{
    Booking, BookingId, BookingStatus, NewPayment, Payment, PaymentId, PaymentMethod, PaymentPlan,
    User,
};
use crate::notify::{templates, Mailer, OutgoingEmail};
use crate::render::{render_receipt, ReceiptData};

pub fn receipt_number(payment_id: PaymentId, paid_at: DateTime<Utc>) -> String {
    Payment::receipt_number_for(payment_id, paid_at)
}

/// Reject payments against bookings that are closed.
pub(crate) fn ensure_payable(booking: &Booking) -> ServiceResult<()> {
    if booking.status.is_terminal() {
        return Err(ServiceError::bad_request(format!(
            "Booking {} is {}",
            booking.id, booking.status
        )));
    }
    Ok(())
}

/// A payment of `amount` against `booking`, made now.
pub(crate) fn new_payment(
    booking: &Booking,
    amount: i64,
    method: PaymentMethod,
    installment_number: Option<i32>,
) -> NewPayment {
    NewPayment {
        booking_id: booking.id,
        student_id: booking.student_id,
        amount,
        method,
        installment_number,
        paid_at: Utc::now(),
    }
}

pub(crate) fn log_payment(payment: &Payment, booking: &Booking) {
    info!(
        booking_id = %booking.id,
        payment_id = %payment.id,
        amount = payment.amount,
        balance = booking.balance(),
        receipt = %payment.receipt_number,
        "Payment recorded"
    );
}

/// Pending bookings become confirmed on their first payment.
pub(crate) async fn confirm_if_pending<R: FullRepository + ?Sized>(
    repo: &R,
    booking: &mut Booking,
) -> ServiceResult<()> {
    if booking.status == BookingStatus::Pending {
        booking.status = BookingStatus::Confirmed;
        ensure_enrollment(repo, booking).await?;
    }
    Ok(())
}

/// Email the receipt for `payment` to the student.
///
/// The payment is already stored, so failures here are logged only.
pub(crate) async fn send_receipt<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    booking: &Booking,
    payment: &Payment,
) {
    match receipt_email(repo, config, booking, payment).await {
        Ok(email) => deliver(mailer, email, "payment_receipt").await,
        Err(e) => warn!(payment_id = %payment.id, error = %e, "Failed to prepare receipt email"),
    }
}

async fn receipt_email<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    booking: &Booking,
    payment: &Payment,
) -> ServiceResult<OutgoingEmail> {
    let student = repo.get_user(booking.student_id).await?;
    let pdf = render_receipt(&receipt_data(config, booking, payment, &student))?;
    Ok(templates::installment_receipt_email(
        &config.school,
        &student,
        payment,
        booking.balance(),
        pdf,
    ))
}

fn receipt_data(
    config: &AppConfig,
    booking: &Booking,
    payment: &Payment,
    student: &User,
) -> ReceiptData {
    ReceiptData {
        school: config.school.clone(),
        receipt_number: payment.receipt_number.clone(),
        paid_at: payment.paid_at,
        student_name: student.name.clone(),
        student_email: student.email.clone(),
        course_name: booking.course_name.clone(),
        booking_id: booking.id.value(),
        method: payment.method,
        installment_number: payment.installment_number,
        amount: payment.amount,
        total_amount: booking.total_amount,
        balance: booking.balance(),
    }
}

/// Pay the whole outstanding balance of a `Full` plan booking.
pub async fn pay_in_full<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    booking_id: BookingId,
    method: PaymentMethod,
) -> ServiceResult<Payment> {
    let booking = repo.get_booking(booking_id).await?;
    ensure_payable(&booking)?;
    if booking.payment_plan != PaymentPlan::Full {
        return Err(ServiceError::bad_request(format!(
            "Booking {} uses the {} plan; pay its installments instead",
            booking_id, booking.payment_plan
        )));
    }
    let balance = booking.balance();
    if balance <= 0 {
        return Err(ServiceError::bad_request(format!(
            "Booking {} is already paid",
            booking_id
        )));
    }

    // A concurrent payment that got there first makes this a Conflict.
    let AppliedPayment {
        payment,
        mut booking,
    } = repo
        .record_payment(new_payment(&booking, balance, method, None))
        .await?;
    log_payment(&payment, &booking);
    confirm_if_pending(repo, &mut booking).await?;
    let booking = repo.update_booking(&booking).await?;

    send_receipt(repo, mailer, config, &booking, &payment).await;
    Ok(payment)
}

pub async fn get_payment<R: FullRepository + ?Sized>(
    repo: &R,
    payment_id: PaymentId,
) -> ServiceResult<Payment> {
    Ok(repo.get_payment(payment_id).await?)
}

pub async fn list_payments<R: FullRepository + ?Sized>(
    repo: &R,
    booking_id: BookingId,
) -> ServiceResult<Vec<Payment>> {
    repo.get_booking(booking_id).await?;
    Ok(repo.list_payments_for_booking(booking_id).await?)
}

/// Render the receipt PDF of a payment. Returns `(filename, bytes)`.
pub async fn receipt_pdf<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    payment_id: PaymentId,
) -> ServiceResult<(String, Vec<u8>)> {
    let payment = repo.get_payment(payment_id).await?;
    let booking = repo.get_booking(payment.booking_id).await?;
    let student = repo.get_user(booking.student_id).await?;

    let bytes = render_receipt(&receipt_data(config, &booking, &payment, &student))?;
    Ok((format!("{}.pdf", payment.receipt_number), bytes))
}
