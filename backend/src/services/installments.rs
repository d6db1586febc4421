//! Installment plans: splitting a booking's balance into monthly payments.

use chrono::{Months, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use super::payments::{
    confirm_if_pending, ensure_payable, log_payment, new_payment, send_receipt,
};
use super::{ServiceError, ServiceResult};
use crate::config::AppConfig;
use crate::db::repository::{AppliedPayment, BookingRepository, FullRepository};
use crate::models::{
    BookingId, Installment, InstallmentPlan, InstallmentStatus, Payment, PaymentMethod,
    PaymentPlan,
};
use crate::notify::Mailer;

pub const MAX_MONTHS: i32 = 24;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub months: i32,
    #[serde(default)]
    pub down_payment: i64,
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Cash
}

/// `date` moved forward by `months`, clamping to the last day of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> ServiceResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| ServiceError::bad_request(format!("Date {} is out of range", date)))
}

/// Split `total - down_payment` into `months` installments.
///
/// Amounts are integer minor units. The division remainder goes to the first
/// installment so the entries always sum to the financed amount. Installment
/// `i` is due `i - 1` months after `first_due`.
pub fn compute_schedule(
    total: i64,
    down_payment: i64,
    months: i32,
    first_due: NaiveDate,
) -> ServiceResult<Vec<Installment>> {
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(ServiceError::bad_request(format!(
            "months must be between 1 and {}",
            MAX_MONTHS
        )));
    }
    if total <= 0 {
        return Err(ServiceError::bad_request("Nothing left to finance"));
    }
    if down_payment < 0 || down_payment >= total {
        return Err(ServiceError::bad_request(
            "down_payment must be at least 0 and less than the amount due",
        ));
    }

    let remaining = total - down_payment;
    let count = i64::from(months);
    let base = remaining / count;
    let remainder = remaining % count;
    if base == 0 {
        return Err(ServiceError::bad_request(format!(
            "Amount {} cannot be split into {} installments",
            remaining, months
        )));
    }

    (1..=months)
        .map(|number| {
            let amount = if number == 1 { base + remainder } else { base };
            Ok(Installment {
                number,
                amount,
                due_date: add_months(first_due, (number - 1) as u32)?,
                status: InstallmentStatus::Pending,
                paid_at: None,
                payment_id: None,
            })
        })
        .collect()
}

/// Mark unpaid installments due before `today` as `Overdue`.
pub fn with_overdue(mut plan: InstallmentPlan, today: NaiveDate) -> InstallmentPlan {
    for entry in &mut plan.entries {
        if !entry.is_paid() {
            entry.status = if entry.due_date < today {
                InstallmentStatus::Overdue
            } else {
                InstallmentStatus::Pending
            };
        }
    }
    plan
}

/// Create the plan for an `Installment` booking and take the down payment.
pub async fn create_plan<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    booking_id: BookingId,
    request: CreatePlanRequest,
) -> ServiceResult<InstallmentPlan> {
    let booking = repo.get_booking(booking_id).await?;
    ensure_payable(&booking)?;
    if booking.payment_plan != PaymentPlan::Installment {
        return Err(ServiceError::bad_request(format!(
            "Booking {} uses the {} plan",
            booking_id, booking.payment_plan
        )));
    }
    if repo.get_installment_plan(booking_id).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "Booking {} already has an installment plan",
            booking_id
        )));
    }

    let first_due = add_months(booking.start_date, 1)?;
    let entries = compute_schedule(
        booking.balance(),
        request.down_payment,
        request.months,
        first_due,
    )?;

    let plan = InstallmentPlan {
        booking_id,
        months: request.months,
        down_payment: request.down_payment,
        entries,
        created_at: Utc::now(),
    };
    let down_payment = (request.down_payment > 0)
        .then(|| new_payment(&booking, request.down_payment, request.method, Some(0)));
    let (mut booking, down_payment) = repo.create_installment_plan(&plan, down_payment).await?;
    if let Some(payment) = &down_payment {
        log_payment(payment, &booking);
    }

    confirm_if_pending(repo, &mut booking).await?;
    let booking = repo.update_booking(&booking).await?;
    info!(
        booking_id = %booking_id,
        months = plan.months,
        down_payment = plan.down_payment,
        "Installment plan created"
    );

    if let Some(payment) = down_payment {
        send_receipt(repo, mailer, config, &booking, &payment).await;
    }
    Ok(plan)
}

pub async fn get_plan<R: FullRepository + ?Sized>(
    repo: &R,
    booking_id: BookingId,
    today: NaiveDate,
) -> ServiceResult<InstallmentPlan> {
    repo.get_booking(booking_id).await?;
    let plan = repo
        .get_installment_plan(booking_id)
        .await?
        .ok_or_else(|| {
            ServiceError::not_found(format!("Booking {} has no installment plan", booking_id))
        })?;
    Ok(with_overdue(plan, today))
}

/// Pay installment `number`. Earlier installments must be paid first.
pub async fn pay_installment<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    booking_id: BookingId,
    number: i32,
    method: PaymentMethod,
) -> ServiceResult<Payment> {
    let booking = repo.get_booking(booking_id).await?;
    ensure_payable(&booking)?;
    let plan = repo
        .get_installment_plan(booking_id)
        .await?
        .ok_or_else(|| {
            ServiceError::not_found(format!("Booking {} has no installment plan", booking_id))
        })?;

    let entry = plan
        .entries
        .iter()
        .find(|e| e.number == number)
        .ok_or_else(|| {
            ServiceError::not_found(format!(
                "Installment {} not found for booking {}",
                number, booking_id
            ))
        })?;
    if entry.is_paid() {
        return Err(ServiceError::bad_request(format!(
            "Installment {} is already paid",
            number
        )));
    }
    if let Some(earlier) = plan
        .entries
        .iter()
        .find(|e| e.number < number && !e.is_paid())
    {
        return Err(ServiceError::bad_request(format!(
            "Installment {} must be paid first",
            earlier.number
        )));
    }
    let amount = entry.amount;

    // Checked again under the repository lock; a concurrent payer gets a Conflict.
    let AppliedPayment { payment, booking } = repo
        .pay_installment(new_payment(&booking, amount, method, Some(number)))
        .await?;
    log_payment(&payment, &booking);
    info!(
        booking_id = %booking_id,
        installment = number,
        outstanding = plan.outstanding() - amount,
        "Installment paid"
    );

    send_receipt(repo, mailer, config, &booking, &payment).await;
    Ok(payment)
}
