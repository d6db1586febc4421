//! Repository trait definitions for database operations.
//!
//! Persistence is split into focused traits, one per group of related
//! documents, so that backends and test doubles can be reasoned about in
//! isolation.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`accounts`]: Users, OTP codes, sessions and uploaded documents
//! - [`courses`]: Course catalog
//! - [`inquiries`]: Public contact inquiries
//! - [`bookings`]: Bookings, payments and installment plans
//! - [`enrollments`]: Progress records and certificates
//!
//! # Convenience Trait Bound
//!
//! Services that need everything take a [`FullRepository`]:
//!
//! ```ignore
//! async fn confirm<R: FullRepository + ?Sized>(repo: &R, id: BookingId) -> RepositoryResult<()> {
//!     let booking = repo.get_booking(id).await?;
//!     repo.get_course(booking.course_id).await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod bookings;
pub mod courses;
pub mod enrollments;
pub mod error;
pub mod inquiries;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use accounts::UserRepository;
pub use bookings::{AppliedPayment, BookingFilter, BookingRepository};
pub use courses::CourseRepository;
pub use enrollments::EnrollmentRepository;
pub use inquiries::InquiryRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements all five
/// repository traits.
pub trait FullRepository:
    UserRepository + CourseRepository + InquiryRepository + BookingRepository + EnrollmentRepository
{
}

impl<T> FullRepository for T where
    T: UserRepository
        + CourseRepository
        + InquiryRepository
        + BookingRepository
        + EnrollmentRepository
{
}
