//! Enrollment repository trait: progress records and certificates.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    BookingId, Certificate, CertificateId, Enrollment, EnrollmentId, NewCertificate,
    NewEnrollment, UserId,
};

/// Repository trait for enrollments and the certificates they gate.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    // ==================== Enrollments ====================

    /// Store a new `Active` enrollment with zero lessons completed.
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> RepositoryResult<Enrollment>;

    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> RepositoryResult<Enrollment>;

    /// Enrollment created from a booking, if any.
    async fn find_enrollment_by_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<Enrollment>>;

    async fn list_enrollments_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Enrollment>>;

    /// Persist status, progress, certificate status and completion time.
    async fn update_enrollment(&self, enrollment: &Enrollment) -> RepositoryResult<Enrollment>;

    // ==================== Certificates ====================

    /// Store a `Pending` certificate for an enrollment.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the enrollment already has one
    async fn create_certificate(&self, certificate: NewCertificate)
        -> RepositoryResult<Certificate>;

    async fn get_certificate(&self, certificate_id: CertificateId)
        -> RepositoryResult<Certificate>;

    async fn find_certificate_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> RepositoryResult<Option<Certificate>>;

    async fn find_certificate_by_hash(&self, hash: &str) -> RepositoryResult<Option<Certificate>>;

    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> RepositoryResult<Option<Certificate>>;

    /// Persist number, hash, status and issue time.
    async fn update_certificate(&self, certificate: &Certificate)
        -> RepositoryResult<Certificate>;

    async fn list_certificates_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Certificate>>;
}
