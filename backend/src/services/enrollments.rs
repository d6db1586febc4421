//! Student progress through a course.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::{ServiceError, ServiceResult};
use crate::db::repository::{
    BookingRepository, CourseRepository, EnrollmentRepository, FullRepository, UserRepository,
};
use crate::models::{
    BookingId, CourseId, Enrollment, EnrollmentId, EnrollmentStatus, NewEnrollment, UserId,
    UserRole,
};

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollRequest {
    pub student_id: UserId,
    pub course_id: CourseId,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    #[serde(default)]
    pub instructor_id: Option<UserId>,
}

/// Ensure `user_id` refers to a user with `role`.
pub(crate) async fn require_role<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
    role: UserRole,
) -> ServiceResult<()> {
    let user = repo.get_user(user_id).await?;
    if user.role != role {
        return Err(ServiceError::bad_request(format!(
            "User {} is not a {}",
            user_id, role
        )));
    }
    Ok(())
}

/// Create an `Active` enrollment. Idempotent per booking.
pub async fn enroll<R: FullRepository + ?Sized>(
    repo: &R,
    request: EnrollRequest,
) -> ServiceResult<Enrollment> {
    if let Some(booking_id) = request.booking_id {
        if let Some(existing) = repo.find_enrollment_by_booking(booking_id).await? {
            return Ok(existing);
        }
        let booking = repo.get_booking(booking_id).await?;
        if booking.student_id != request.student_id || booking.course_id != request.course_id {
            return Err(ServiceError::bad_request(format!(
                "Booking {} is for a different student or course",
                booking_id
            )));
        }
    }

    require_role(repo, request.student_id, UserRole::Student).await?;
    if let Some(instructor_id) = request.instructor_id {
        require_role(repo, instructor_id, UserRole::Instructor).await?;
    }
    let course = repo.get_course(request.course_id).await?;

    let enrollment = repo
        .create_enrollment(NewEnrollment {
            student_id: request.student_id,
            course_id: course.id,
            course_name: course.name,
            instructor_id: request.instructor_id,
            booking_id: request.booking_id,
            total_lessons: course.total_lessons,
        })
        .await?;
    info!(
        enrollment_id = %enrollment.id,
        student_id = %enrollment.student_id,
        course_id = %enrollment.course_id,
        "Enrollment created"
    );
    Ok(enrollment)
}

/// Set the number of completed lessons. Reaching the total completes the enrollment.
pub async fn record_progress<R: FullRepository + ?Sized>(
    repo: &R,
    enrollment_id: EnrollmentId,
    lessons_completed: i32,
) -> ServiceResult<Enrollment> {
    let mut enrollment = repo.get_enrollment(enrollment_id).await?;
    if enrollment.status != EnrollmentStatus::Active {
        return Err(ServiceError::bad_request(format!(
            "Enrollment {} is {}",
            enrollment_id, enrollment.status
        )));
    }
    if lessons_completed < 0 || lessons_completed > enrollment.total_lessons {
        return Err(ServiceError::bad_request(format!(
            "lessons_completed must be between 0 and {}",
            enrollment.total_lessons
        )));
    }

    enrollment.lessons_completed = lessons_completed;
    if enrollment.lessons_done() {
        enrollment.status = EnrollmentStatus::Completed;
        enrollment.completed_at = Some(Utc::now());
    }

    let updated = repo.update_enrollment(&enrollment).await?;
    info!(
        enrollment_id = %updated.id,
        progress = updated.progress_percent(),
        status = %updated.status,
        "Progress recorded"
    );
    Ok(updated)
}

/// `Completed` and `Dropped` are terminal; completing needs every lesson done.
pub async fn update_status<R: FullRepository + ?Sized>(
    repo: &R,
    enrollment_id: EnrollmentId,
    status: EnrollmentStatus,
) -> ServiceResult<Enrollment> {
    let mut enrollment = repo.get_enrollment(enrollment_id).await?;
    if enrollment.status == status {
        return Ok(enrollment);
    }
    if enrollment.status != EnrollmentStatus::Active {
        return Err(ServiceError::bad_request(format!(
            "Enrollment {} is already {}",
            enrollment_id, enrollment.status
        )));
    }
    if status == EnrollmentStatus::Completed {
        if !enrollment.lessons_done() {
            return Err(ServiceError::bad_request(format!(
                "Only {} of {} lessons completed",
                enrollment.lessons_completed, enrollment.total_lessons
            )));
        }
        enrollment.completed_at = Some(Utc::now());
    }
    enrollment.status = status;

    let updated = repo.update_enrollment(&enrollment).await?;
    info!(enrollment_id = %updated.id, status = %updated.status, "Enrollment status updated");
    Ok(updated)
}

pub async fn get_enrollment<R: FullRepository + ?Sized>(
    repo: &R,
    enrollment_id: EnrollmentId,
) -> ServiceResult<Enrollment> {
    Ok(repo.get_enrollment(enrollment_id).await?)
}

pub async fn list_for_student<R: FullRepository + ?Sized>(
    repo: &R,
    student_id: UserId,
) -> ServiceResult<Vec<Enrollment>> {
    repo.get_user(student_id).await?;
    Ok(repo.list_enrollments_for_student(student_id).await?)
}
