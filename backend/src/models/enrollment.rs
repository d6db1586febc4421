//! Course progress records and the certificates they gate.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingId, CertificateId, CourseId, EnrollmentId, UserId};
use crate::define_status_enum;

define_status_enum!(
    /// Progress state of an enrollment. `Completed` and `Dropped` are terminal.
    EnrollmentStatus {
        Active => "Active",
        Completed => "Completed",
        Dropped => "Dropped",
    }
);

define_status_enum!(
    CertificateStatus {
        Pending => "Pending",
        Issued => "Issued",
    }
);

/// A student's progress through one course offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub course_name: String,
    pub instructor_id: Option<UserId>,
    pub booking_id: Option<BookingId>,
    pub status: EnrollmentStatus,
    pub lessons_completed: i32,
    pub total_lessons: i32,
    /// Copied from the certificate once one is issued.
    pub certificate_status: CertificateStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Whole-number completion percentage.
    pub fn progress_percent(&self) -> i32 {
        if self.total_lessons <= 0 {
            return 0;
        }
        (self.lessons_completed.clamp(0, self.total_lessons) * 100) / self.total_lessons
    }

    pub fn lessons_done(&self) -> bool {
        self.lessons_completed >= self.total_lessons
    }
}

/// Insert payload for an enrollment.
#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: UserId,
    pub course_id: CourseId,
    pub course_name: String,
    pub instructor_id: Option<UserId>,
    pub booking_id: Option<BookingId>,
    pub total_lessons: i32,
}

/// Completion certificate.
///
/// `certificate_number` and `verification_hash` are assigned when the
/// certificate moves to `Issued`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub enrollment_id: EnrollmentId,
    pub student_id: UserId,
    pub student_name: String,
    pub course_name: String,
    pub certificate_number: Option<String>,
    pub verification_hash: Option<String>,
    pub status: CertificateStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Certificate {
    /// `DSC-2024-000007`
    pub fn number_for(id: CertificateId, issued_at: DateTime<Utc>) -> String {
        format!("DSC-{}-{:06}", issued_at.year(), id.value())
    }
}

/// Insert payload for a certificate in `Pending` state.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub enrollment_id: EnrollmentId,
    pub student_id: UserId,
    pub student_name: String,
    pub course_name: String,
}
