//! `/v1/bookings`, `/v1/payments` and the installment endpoints.
//!
//! Owner checks load the record first and compare its `student_id` with the
//! caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;

use super::{pdf_response, HandlerResult};
use crate::http::auth::AuthUser;
use crate::http::dto::{BookingListQuery, BookingStatusRequest, ListResponse, PayRequest};
use crate::http::error::AppError;
use crate::http::extract::{ApiJson, ApiQuery};
use crate::http::state::AppState;
use crate::models::{Booking, BookingId, InstallmentPlan, Payment, PaymentId, UserId};
use crate::services::bookings::{self, CreateBookingRequest};
use crate::services::installments::{self, CreatePlanRequest};
use crate::services::payments;

async fn owned_booking(
    state: &AppState,
    caller: &AuthUser,
    booking_id: i64,
) -> Result<Booking, AppError> {
    let booking = bookings::get_booking(state.repo(), BookingId::new(booking_id)).await?;
    caller.require_self_or_staff(booking.student_id)?;
    Ok(booking)
}

/// POST /v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = bookings::create_booking(
        state.repo(),
        state.mailer(),
        &state.config,
        caller.id(),
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings?student_id=&status=
pub async fn list_bookings(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> HandlerResult<ListResponse<Booking>> {
    caller.require_staff()?;
    let items = bookings::list_bookings(state.repo(), query.into()).await?;
    Ok(Json(items.into()))
}

/// GET /v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
) -> HandlerResult<Booking> {
    Ok(Json(owned_booking(&state, &caller, booking_id).await?))
}

/// PATCH /v1/bookings/{id}/status
pub async fn update_booking_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
    ApiJson(request): ApiJson<BookingStatusRequest>,
) -> HandlerResult<Booking> {
    caller.require_staff()?;
    let booking =
        bookings::update_booking_status(state.repo(), BookingId::new(booking_id), request.status)
            .await?;
    Ok(Json(booking))
}

/// GET /v1/students/{id}/bookings
pub async fn list_student_bookings(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(student_id): Path<i64>,
) -> HandlerResult<ListResponse<Booking>> {
    let student_id = UserId::new(student_id);
    caller.require_self_or_staff(student_id)?;
    let items = bookings::list_student_bookings(state.repo(), student_id).await?;
    Ok(Json(items.into()))
}

// =============================================================================
// Payments
// =============================================================================

/// GET /v1/bookings/{id}/payments
pub async fn list_payments(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
) -> HandlerResult<ListResponse<Payment>> {
    let booking = owned_booking(&state, &caller, booking_id).await?;
    let items = payments::list_payments(state.repo(), booking.id).await?;
    Ok(Json(items.into()))
}

/// POST /v1/bookings/{id}/pay
pub async fn pay_in_full(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
    ApiJson(request): ApiJson<PayRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let booking = owned_booking(&state, &caller, booking_id).await?;
    let payment = payments::pay_in_full(
        state.repo(),
        state.mailer(),
        &state.config,
        booking.id,
        request.method,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /v1/payments/{id}
pub async fn get_payment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(payment_id): Path<i64>,
) -> HandlerResult<Payment> {
    let payment = payments::get_payment(state.repo(), PaymentId::new(payment_id)).await?;
    caller.require_self_or_staff(payment.student_id)?;
    Ok(Json(payment))
}

/// GET /v1/payments/{id}/receipt
pub async fn payment_receipt(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(payment_id): Path<i64>,
) -> Result<Response, AppError> {
    let payment_id = PaymentId::new(payment_id);
    let payment = payments::get_payment(state.repo(), payment_id).await?;
    caller.require_self_or_staff(payment.student_id)?;
    let (filename, bytes) = payments::receipt_pdf(state.repo(), &state.config, payment_id).await?;
    Ok(pdf_response(&filename, bytes))
}

// =============================================================================
// Installments
// =============================================================================

/// POST /v1/bookings/{id}/installments
pub async fn create_installment_plan(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
    ApiJson(request): ApiJson<CreatePlanRequest>,
) -> Result<(StatusCode, Json<InstallmentPlan>), AppError> {
    let booking = owned_booking(&state, &caller, booking_id).await?;
    let plan = installments::create_plan(
        state.repo(),
        state.mailer(),
        &state.config,
        booking.id,
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /v1/bookings/{id}/installments
pub async fn get_installment_plan(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(booking_id): Path<i64>,
) -> HandlerResult<InstallmentPlan> {
    let booking = owned_booking(&state, &caller, booking_id).await?;
    let plan =
        installments::get_plan(state.repo(), booking.id, Utc::now().date_naive()).await?;
    Ok(Json(plan))
}

/// POST /v1/bookings/{id}/installments/{number}/pay
pub async fn pay_installment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((booking_id, number)): Path<(i64, i32)>,
    ApiJson(request): ApiJson<PayRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let booking = owned_booking(&state, &caller, booking_id).await?;
    let payment = installments::pay_installment(
        state.repo(),
        state.mailer(),
        &state.config,
        booking.id,
        number,
        request.method,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
