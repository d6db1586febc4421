//! Course bookings and their status lifecycle.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use super::enrollments::{self, require_role, EnrollRequest};
use super::{deliver, ServiceError, ServiceResult};
use crate::config::AppConfig;
use crate::db::repository::{
    BookingFilter, BookingRepository, CourseRepository, FullRepository, UserRepository,
};
use crate::models::{
    Booking, BookingId, BookingStatus, CourseId, NewBooking, PaymentPlan, UserId, UserRole,
};
use crate::notify::{templates, Mailer};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub course_id: CourseId,
    #[serde(default)]
    pub instructor_id: Option<UserId>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub preferred_slot: String,
    pub payment_plan: PaymentPlan,
}

pub async fn create_booking<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    student_id: UserId,
    request: CreateBookingRequest,
) -> ServiceResult<Booking> {
    let student = repo.get_user(student_id).await?;
    if student.role != UserRole::Student {
        return Err(ServiceError::Forbidden(
            "Only students can book courses".to_string(),
        ));
    }

    let course = repo.get_course(request.course_id).await?;
    if !course.active {
        return Err(ServiceError::bad_request(format!(
            "Course '{}' is not open for booking",
            course.name
        )));
    }
    if let Some(instructor_id) = request.instructor_id {
        require_role(repo, instructor_id, UserRole::Instructor).await?;
    }
    if request.start_date < Utc::now().date_naive() {
        return Err(ServiceError::bad_request("start_date cannot be in the past"));
    }

    let booking = repo
        .create_booking(NewBooking {
            student_id,
            course_id: course.id,
            course_name: course.name,
            instructor_id: request.instructor_id,
            start_date: request.start_date,
            preferred_slot: request.preferred_slot.trim().to_string(),
            payment_plan: request.payment_plan,
            total_amount: course.fee,
        })
        .await?;
    info!(
        booking_id = %booking.id,
        student_id = %student_id,
        plan = %booking.payment_plan,
        "Booking created"
    );

    deliver(
        mailer,
        templates::booking_confirmation_email(&config.school, &student, &booking),
        "booking_confirmation",
    )
    .await;
    Ok(booking)
}

pub async fn get_booking<R: FullRepository + ?Sized>(
    repo: &R,
    booking_id: BookingId,
) -> ServiceResult<Booking> {
    Ok(repo.get_booking(booking_id).await?)
}

pub async fn list_bookings<R: FullRepository + ?Sized>(
    repo: &R,
    filter: BookingFilter,
) -> ServiceResult<Vec<Booking>> {
    Ok(repo.list_bookings(filter).await?)
}

pub async fn list_student_bookings<R: FullRepository + ?Sized>(
    repo: &R,
    student_id: UserId,
) -> ServiceResult<Vec<Booking>> {
    repo.get_user(student_id).await?;
    Ok(repo.list_bookings(BookingFilter::for_student(student_id)).await?)
}

/// Create the enrollment backing a confirmed booking, if it does not exist yet.
pub(crate) async fn ensure_enrollment<R: FullRepository + ?Sized>(
    repo: &R,
    booking: &Booking,
) -> ServiceResult<()> {
    enrollments::enroll(
        repo,
        EnrollRequest {
            student_id: booking.student_id,
            course_id: booking.course_id,
            booking_id: Some(booking.id),
            instructor_id: booking.instructor_id,
        },
    )
    .await?;
    Ok(())
}

/// Move a booking to `status`. Confirming creates the student's enrollment.
pub async fn update_booking_status<R: FullRepository + ?Sized>(
    repo: &R,
    booking_id: BookingId,
    status: BookingStatus,
) -> ServiceResult<Booking> {
    let mut booking = repo.get_booking(booking_id).await?;
    if booking.status == status {
        return Ok(booking);
    }
    if booking.status.is_terminal() {
        return Err(ServiceError::bad_request(format!(
            "Booking {} is {} and cannot change",
            booking_id, booking.status
        )));
    }

    booking.status = status;
    let updated = repo.update_booking(&booking).await?;
    if status == BookingStatus::Confirmed {
        ensure_enrollment(repo, &updated).await?;
    }
    info!(booking_id = %updated.id, status = %updated.status, "Booking status updated");
    Ok(updated)
}
