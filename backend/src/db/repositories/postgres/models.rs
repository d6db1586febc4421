//! Diesel row types and their conversions into domain models.
//!
//! Status columns are stored as their wire strings; converting a row back
//! fails with a validation error when a column holds an unknown value.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use super::schema::{
    bookings, certificates, courses, documents, enrollments, inquiries, installment_plans,
    installments, otps, payments, sessions, users,
};
use crate::db::repository::RepositoryResult;
use crate::models::{
    Booking, BookingId, Certificate, CertificateId, Course, CourseId, Document, DocumentId,
    Enrollment, EnrollmentId, Inquiry, InquiryId, Installment, NewBooking, NewCertificate,
    NewCourse, NewDocument, NewEnrollment, NewInquiry, NewPayment, NewUser, Otp, Payment,
    PaymentId, Session, User, UserId,
};

// ==================== Accounts ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password_hash: String,
    pub password_salt: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_domain(self) -> RepositoryResult<User> {
        Ok(User {
            id: UserId::new(self.user_id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role.parse()?,
            password_hash: self.password_hash,
            password_salt: self.password_salt,
            verified: self.verified,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password_hash: String,
    pub password_salt: String,
    pub verified: bool,
}

impl From<NewUser> for NewUserRow {
    fn from(user: NewUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            password_hash: user.password_hash,
            password_salt: user.password_salt,
            verified: user.verified,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = otps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OtpRow {
    pub email: String,
    pub purpose: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub failed_attempts: i32,
}

impl OtpRow {
    pub fn into_domain(self) -> RepositoryResult<Otp> {
        Ok(Otp {
            email: self.email,
            code: self.code,
            purpose: self.purpose.parse()?,
            expires_at: self.expires_at,
            consumed: self.consumed,
            failed_attempts: self.failed_attempts,
        })
    }
}

impl From<Otp> for OtpRow {
    fn from(otp: Otp) -> Self {
        Self {
            email: otp.email,
            purpose: otp.purpose.as_str().to_string(),
            code: otp.code,
            expires_at: otp.expires_at,
            consumed: otp.consumed,
            failed_attempts: otp.failed_attempts,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            token: row.token,
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

impl From<Session> for SessionRow {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user_id: session.user_id.value(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DocumentRow {
    pub document_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub original_filename: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: DocumentId::new(row.document_id),
            user_id: UserId::new(row.user_id),
            kind: row.kind,
            original_filename: row.original_filename,
            stored_path: row.stored_path,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocumentRow {
    pub user_id: i64,
    pub kind: String,
    pub original_filename: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl From<NewDocument> for NewDocumentRow {
    fn from(doc: NewDocument) -> Self {
        Self {
            user_id: doc.user_id.value(),
            kind: doc.kind,
            original_filename: doc.original_filename,
            stored_path: doc.stored_path,
            content_type: doc.content_type,
            size_bytes: doc.size_bytes,
        }
    }
}

// ==================== Courses and inquiries ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CourseRow {
    pub course_id: i64,
    pub name: String,
    pub description: String,
    pub fee: i64,
    pub duration_weeks: i32,
    pub total_lessons: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: CourseId::new(row.course_id),
            name: row.name,
            description: row.description,
            fee: row.fee,
            duration_weeks: row.duration_weeks,
            total_lessons: row.total_lessons,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourseRow {
    pub name: String,
    pub description: String,
    pub fee: i64,
    pub duration_weeks: i32,
    pub total_lessons: i32,
}

impl From<NewCourse> for NewCourseRow {
    fn from(course: NewCourse) -> Self {
        Self {
            name: course.name,
            description: course.description,
            fee: course.fee,
            duration_weeks: course.duration_weeks,
            total_lessons: course.total_lessons,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = inquiries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InquiryRow {
    pub inquiry_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_name: Option<String>,
    pub message: String,
    pub status: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl InquiryRow {
    pub fn into_domain(self) -> RepositoryResult<Inquiry> {
        Ok(Inquiry {
            id: InquiryId::new(self.inquiry_id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            course_name: self.course_name,
            message: self.message,
            status: self.status.parse()?,
            response: self.response,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inquiries)]
pub struct NewInquiryRow {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_name: Option<String>,
    pub message: String,
}

impl From<NewInquiry> for NewInquiryRow {
    fn from(inquiry: NewInquiry) -> Self {
        Self {
            name: inquiry.name,
            email: inquiry.email,
            phone: inquiry.phone,
            course_name: inquiry.course_name,
            message: inquiry.message,
        }
    }
}

// ==================== Bookings and payments ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
    pub booking_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub course_name: String,
    pub instructor_id: Option<i64>,
    pub start_date: NaiveDate,
    pub preferred_slot: String,
    pub payment_plan: String,
    pub total_amount: i64,
    pub amount_paid: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl BookingRow {
    pub fn into_domain(self) -> RepositoryResult<Booking> {
        Ok(Booking {
            id: BookingId::new(self.booking_id),
            student_id: UserId::new(self.student_id),
            course_id: CourseId::new(self.course_id),
            course_name: self.course_name,
            instructor_id: self.instructor_id.map(UserId::new),
            start_date: self.start_date,
            preferred_slot: self.preferred_slot,
            payment_plan: self.payment_plan.parse()?,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            status: self.status.parse()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub student_id: i64,
    pub course_id: i64,
    pub course_name: String,
    pub instructor_id: Option<i64>,
    pub start_date: NaiveDate,
    pub preferred_slot: String,
    pub payment_plan: String,
    pub total_amount: i64,
}

impl From<NewBooking> for NewBookingRow {
    fn from(booking: NewBooking) -> Self {
        Self {
            student_id: booking.student_id.value(),
            course_id: booking.course_id.value(),
            course_name: booking.course_name,
            instructor_id: booking.instructor_id.map(|id| id.value()),
            start_date: booking.start_date,
            preferred_slot: booking.preferred_slot,
            payment_plan: booking.payment_plan.as_str().to_string(),
            total_amount: booking.total_amount,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub payment_id: i64,
    pub booking_id: i64,
    pub student_id: i64,
    pub amount: i64,
    pub method: String,
    pub installment_number: Option<i32>,
    pub paid_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_domain(self) -> RepositoryResult<Payment> {
        let id = PaymentId::new(self.payment_id);
        Ok(Payment {
            id,
            booking_id: BookingId::new(self.booking_id),
            student_id: UserId::new(self.student_id),
            amount: self.amount,
            method: self.method.parse()?,
            installment_number: self.installment_number,
            receipt_number: Payment::receipt_number_for(id, self.paid_at),
            paid_at: self.paid_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub booking_id: i64,
    pub student_id: i64,
    pub amount: i64,
    pub method: String,
    pub installment_number: Option<i32>,
    pub paid_at: DateTime<Utc>,
}

impl From<NewPayment> for NewPaymentRow {
    fn from(payment: NewPayment) -> Self {
        Self {
            booking_id: payment.booking_id.value(),
            student_id: payment.student_id.value(),
            amount: payment.amount,
            method: payment.method.as_str().to_string(),
            installment_number: payment.installment_number,
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = installment_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InstallmentPlanRow {
    pub booking_id: i64,
    pub months: i32,
    pub down_payment: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = installments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InstallmentRow {
    pub booking_id: i64,
    pub number: i32,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<i64>,
}

impl InstallmentRow {
    pub fn from_domain(booking_id: BookingId, entry: &Installment) -> Self {
        Self {
            booking_id: booking_id.value(),
            number: entry.number,
            amount: entry.amount,
            due_date: entry.due_date,
            status: entry.status.as_str().to_string(),
            paid_at: entry.paid_at,
            payment_id: entry.payment_id.map(|id| id.value()),
        }
    }

    pub fn into_domain(self) -> RepositoryResult<Installment> {
        Ok(Installment {
            number: self.number,
            amount: self.amount,
            due_date: self.due_date,
            status: self.status.parse()?,
            paid_at: self.paid_at,
            payment_id: self.payment_id.map(PaymentId::new),
        })
    }
}

// ==================== Enrollments and certificates ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EnrollmentRow {
    pub enrollment_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub course_name: String,
    pub instructor_id: Option<i64>,
    pub booking_id: Option<i64>,
    pub status: String,
    pub lessons_completed: i32,
    pub total_lessons: i32,
    pub certificate_status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrollmentRow {
    pub fn into_domain(self) -> RepositoryResult<Enrollment> {
        Ok(Enrollment {
            id: EnrollmentId::new(self.enrollment_id),
            student_id: UserId::new(self.student_id),
            course_id: CourseId::new(self.course_id),
            course_name: self.course_name,
            instructor_id: self.instructor_id.map(UserId::new),
            booking_id: self.booking_id.map(BookingId::new),
            status: self.status.parse()?,
            lessons_completed: self.lessons_completed,
            total_lessons: self.total_lessons,
            certificate_status: self.certificate_status.parse()?,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = enrollments)]
pub struct NewEnrollmentRow {
    pub student_id: i64,
    pub course_id: i64,
    pub course_name: String,
    pub instructor_id: Option<i64>,
    pub booking_id: Option<i64>,
    pub total_lessons: i32,
}

impl From<NewEnrollment> for NewEnrollmentRow {
    fn from(enrollment: NewEnrollment) -> Self {
        Self {
            student_id: enrollment.student_id.value(),
            course_id: enrollment.course_id.value(),
            course_name: enrollment.course_name,
            instructor_id: enrollment.instructor_id.map(|id| id.value()),
            booking_id: enrollment.booking_id.map(|id| id.value()),
            total_lessons: enrollment.total_lessons,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CertificateRow {
    pub certificate_id: i64,
    pub enrollment_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub course_name: String,
    pub certificate_number: Option<String>,
    pub verification_hash: Option<String>,
    pub status: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CertificateRow {
    pub fn into_domain(self) -> RepositoryResult<Certificate> {
        Ok(Certificate {
            id: CertificateId::new(self.certificate_id),
            enrollment_id: EnrollmentId::new(self.enrollment_id),
            student_id: UserId::new(self.student_id),
            student_name: self.student_name,
            course_name: self.course_name,
            certificate_number: self.certificate_number,
            verification_hash: self.verification_hash,
            status: self.status.parse()?,
            issued_at: self.issued_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = certificates)]
pub struct NewCertificateRow {
    pub enrollment_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub course_name: String,
}

impl From<NewCertificate> for NewCertificateRow {
    fn from(certificate: NewCertificate) -> Self {
        Self {
            enrollment_id: certificate.enrollment_id.value(),
            student_id: certificate.student_id.value(),
            student_name: certificate.student_name,
            course_name: certificate.course_name,
        }
    }
}
