//! Strongly-typed identifiers.

use crate::define_id_type;

define_id_type!(i64, UserId);
define_id_type!(i64, CourseId);
define_id_type!(i64, InquiryId);
define_id_type!(i64, BookingId);
define_id_type!(i64, PaymentId);
define_id_type!(i64, EnrollmentId);
define_id_type!(i64, CertificateId);
define_id_type!(i64, DocumentId);
