//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using `HashMap`s behind a single lock, providing fast, deterministic,
//! and isolated execution.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::repository::bookings::{check_payment_amount, BookingFilter};
use crate::db::repository::*;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use drivingschool::db::repositories::LocalRepository;
/// use drivingschool::db::repository::CourseRepository;
/// use drivingschool::models::NewCourse;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// let course = repo
///     .create_course(NewCourse {
///         name: "Two-Wheeler".to_string(),
///         description: String::new(),
///         fee: 350_000,
///         duration_weeks: 4,
///         total_lessons: 10,
///     })
///     .await
///     .unwrap();
/// assert_eq!(course.id.value(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: HashMap<UserId, User>,
    otps: HashMap<(String, OtpPurpose), Otp>,
    sessions: HashMap<String, Session>,
    documents: HashMap<DocumentId, Document>,
    courses: HashMap<CourseId, Course>,
    inquiries: HashMap<InquiryId, Inquiry>,
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<PaymentId, Payment>,
    installment_plans: HashMap<BookingId, InstallmentPlan>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    certificates: HashMap<CertificateId, Certificate>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            otps: HashMap::new(),
            sessions: HashMap::new(),
            documents: HashMap::new(),
            courses: HashMap::new(),
            inquiries: HashMap::new(),
            bookings: HashMap::new(),
            payments: HashMap::new(),
            installment_plans: HashMap::new(),
            enrollments: HashMap::new(),
            certificates: HashMap::new(),
            is_healthy: true,
        }
    }
}

/// Next sequence value for a table: one past its current maximum key.
fn next_key<K: Copy + Into<i64>, V>(map: &HashMap<K, V>) -> i64 {
    map.keys().map(|k| (*k).into()).max().unwrap_or(0) + 1
}

fn sorted_by_key<K: Ord + Copy + std::hash::Hash, V: Clone>(map: &HashMap<K, V>, keep: impl Fn(&V) -> bool) -> Vec<V> {
    let mut keys: Vec<K> = map.keys().copied().collect();
    keys.sort();
    keys.into_iter()
        .filter_map(|k| map.get(&k))
        .filter(|v| keep(v))
        .cloned()
        .collect()
}

impl LocalData {
    /// Insert `payment` and add it to its booking's `amount_paid`.
    ///
    /// Every check runs before anything is written.
    fn apply_payment(
        &mut self,
        payment: NewPayment,
        operation: &str,
    ) -> RepositoryResult<AppliedPayment> {
        let booking = self
            .bookings
            .get(&payment.booking_id)
            .ok_or_else(|| LocalRepository::missing("Booking", payment.booking_id, operation))?;
        check_payment_amount(payment.amount, booking, operation)?;

        let id = PaymentId::new(next_key(&self.payments));
        let stored = Payment {
            id,
            booking_id: payment.booking_id,
            student_id: payment.student_id,
            amount: payment.amount,
            method: payment.method,
            installment_number: payment.installment_number,
            receipt_number: Payment::receipt_number_for(id, payment.paid_at),
            paid_at: payment.paid_at,
        };
        self.payments.insert(id, stored.clone());

        let booking = self
            .bookings
            .get_mut(&payment.booking_id)
            .ok_or_else(|| LocalRepository::missing("Booking", payment.booking_id, operation))?;
        booking.amount_paid += stored.amount;
        Ok(AppliedPayment {
            payment: stored,
            booking: booking.clone(),
        })
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.data.read().users.len()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.data.read().sessions.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }

    fn missing(entity: &str, id: impl ToString, operation: &str) -> RepositoryError {
        let id = id.to_string();
        RepositoryError::not_found_with_context(
            format!("{} {} not found", entity, id),
            ErrorContext::new(operation)
                .with_entity(entity.to_lowercase())
                .with_entity_id(id),
        )
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_user(&self, user: NewUser) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::conflict_with_context(
                format!("Email {} is already registered", user.email),
                ErrorContext::new("create_user").with_entity("user"),
            ));
        }
        let id = UserId::new(next_key(&data.users));
        let stored = User {
            id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            password_salt: user.password_salt,
            verified: user.verified,
            created_at: Utc::now(),
        };
        data.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.check_health()?;
        self.data
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Self::missing("User", user_id, "get_user"))
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().users, |u| u.role == role))
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .users
            .get_mut(&user.id)
            .ok_or_else(|| Self::missing("User", user.id, "update_user"))?;
        stored.name = user.name.clone();
        stored.phone = user.phone.clone();
        stored.verified = user.verified;
        stored.password_hash = user.password_hash.clone();
        stored.password_salt = user.password_salt.clone();
        Ok(stored.clone())
    }

    async fn store_otp(&self, otp: Otp) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .otps
            .insert((otp.email.clone(), otp.purpose), otp);
        Ok(())
    }

    async fn find_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .otps
            .get(&(email.to_string(), purpose))
            .cloned())
    }

    async fn consume_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        match data.otps.get_mut(&(email.to_string(), purpose)) {
            Some(otp) if !otp.consumed => {
                otp.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_otp_failure(
        &self,
        email: &str,
        purpose: OtpPurpose,
        max_attempts: i32,
    ) -> RepositoryResult<i32> {
        self.check_health()?;
        let mut data = self.data.write();
        match data.otps.get_mut(&(email.to_string(), purpose)) {
            Some(otp) => {
                otp.failed_attempts += 1;
                if otp.failed_attempts >= max_attempts {
                    otp.consumed = true;
                }
                Ok(otp.failed_attempts)
            }
            None => Ok(0),
        }
    }

    async fn create_session(&self, session: Session) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .sessions
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> RepositoryResult<Option<Session>> {
        self.check_health()?;
        Ok(self.data.read().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> RepositoryResult<()> {
        self.check_health()?;
        self.data.write().sessions.remove(token);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write();
        let before = data.sessions.len();
        data.sessions.retain(|_, session| session.user_id != user_id);
        Ok(before - data.sessions.len())
    }

    async fn add_document(&self, document: NewDocument) -> RepositoryResult<Document> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.users.contains_key(&document.user_id) {
            return Err(Self::missing("User", document.user_id, "add_document"));
        }
        let id = DocumentId::new(next_key(&data.documents));
        let stored = Document {
            id,
            user_id: document.user_id,
            kind: document.kind,
            original_filename: document.original_filename,
            stored_path: document.stored_path,
            content_type: document.content_type,
            size_bytes: document.size_bytes,
            uploaded_at: Utc::now(),
        };
        data.documents.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_documents(&self, user_id: UserId) -> RepositoryResult<Vec<Document>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().documents, |d| {
            d.user_id == user_id
        }))
    }
}

#[async_trait]
impl CourseRepository for LocalRepository {
    async fn create_course(&self, course: NewCourse) -> RepositoryResult<Course> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .courses
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(&course.name))
        {
            return Err(RepositoryError::conflict_with_context(
                format!("Course '{}' already exists", course.name),
                ErrorContext::new("create_course").with_entity("course"),
            ));
        }
        let id = CourseId::new(next_key(&data.courses));
        let stored = Course {
            id,
            name: course.name,
            description: course.description,
            fee: course.fee,
            duration_weeks: course.duration_weeks,
            total_lessons: course.total_lessons,
            active: true,
            created_at: Utc::now(),
        };
        data.courses.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_course(&self, course_id: CourseId) -> RepositoryResult<Course> {
        self.check_health()?;
        self.data
            .read()
            .courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| Self::missing("Course", course_id, "get_course"))
    }

    async fn find_course_by_name(&self, name: &str) -> RepositoryResult<Option<Course>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .courses
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_courses(&self, active_only: bool) -> RepositoryResult<Vec<Course>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().courses, |c| {
            !active_only || c.active
        }))
    }

    async fn update_course(&self, course: &Course) -> RepositoryResult<Course> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .courses
            .get_mut(&course.id)
            .ok_or_else(|| Self::missing("Course", course.id, "update_course"))?;
        stored.name = course.name.clone();
        stored.description = course.description.clone();
        stored.fee = course.fee;
        stored.duration_weeks = course.duration_weeks;
        stored.total_lessons = course.total_lessons;
        stored.active = course.active;
        Ok(stored.clone())
    }
}

#[async_trait]
impl InquiryRepository for LocalRepository {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> RepositoryResult<Inquiry> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = InquiryId::new(next_key(&data.inquiries));
        let stored = Inquiry {
            id,
            name: inquiry.name,
            email: inquiry.email,
            phone: inquiry.phone,
            course_name: inquiry.course_name,
            message: inquiry.message,
            status: InquiryStatus::Pending,
            response: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        data.inquiries.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_inquiry(&self, inquiry_id: InquiryId) -> RepositoryResult<Inquiry> {
        self.check_health()?;
        self.data
            .read()
            .inquiries
            .get(&inquiry_id)
            .cloned()
            .ok_or_else(|| Self::missing("Inquiry", inquiry_id, "get_inquiry"))
    }

    async fn list_inquiries(
        &self,
        status: Option<InquiryStatus>,
    ) -> RepositoryResult<Vec<Inquiry>> {
        self.check_health()?;
        let mut inquiries = sorted_by_key(&self.data.read().inquiries, |i| {
            status.is_none_or(|s| i.status == s)
        });
        inquiries.reverse();
        Ok(inquiries)
    }

    async fn update_inquiry(&self, inquiry: &Inquiry) -> RepositoryResult<Inquiry> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .inquiries
            .get_mut(&inquiry.id)
            .ok_or_else(|| Self::missing("Inquiry", inquiry.id, "update_inquiry"))?;
        stored.status = inquiry.status;
        stored.response = inquiry.response.clone();
        stored.resolved_at = inquiry.resolved_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn create_booking(&self, booking: NewBooking) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = BookingId::new(next_key(&data.bookings));
        let stored = Booking {
            id,
            student_id: booking.student_id,
            course_id: booking.course_id,
            course_name: booking.course_name,
            instructor_id: booking.instructor_id,
            start_date: booking.start_date,
            preferred_slot: booking.preferred_slot,
            payment_plan: booking.payment_plan,
            total_amount: booking.total_amount,
            amount_paid: 0,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        data.bookings.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.check_health()?;
        self.data
            .read()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| Self::missing("Booking", booking_id, "get_booking"))
    }

    async fn list_bookings(&self, filter: BookingFilter) -> RepositoryResult<Vec<Booking>> {
        self.check_health()?;
        let mut bookings = sorted_by_key(&self.data.read().bookings, |b| filter.matches(b));
        bookings.reverse();
        Ok(bookings)
    }

    async fn update_booking(&self, booking: &Booking) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| Self::missing("Booking", booking.id, "update_booking"))?;
        stored.status = booking.status;
        stored.instructor_id = booking.instructor_id;
        Ok(stored.clone())
    }

    async fn record_payment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment> {
        self.check_health()?;
        self.data.write().apply_payment(payment, "record_payment")
    }

    async fn get_payment(&self, payment_id: PaymentId) -> RepositoryResult<Payment> {
        self.check_health()?;
        self.data
            .read()
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| Self::missing("Payment", payment_id, "get_payment"))
    }

    async fn list_payments_for_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Vec<Payment>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().payments, |p| {
            p.booking_id == booking_id
        }))
    }

    async fn create_installment_plan(
        &self,
        plan: &InstallmentPlan,
        down_payment: Option<NewPayment>,
    ) -> RepositoryResult<(Booking, Option<Payment>)> {
        self.check_health()?;
        let mut data = self.data.write();
        let booking = data.bookings.get(&plan.booking_id).cloned().ok_or_else(|| {
            Self::missing("Booking", plan.booking_id, "create_installment_plan")
        })?;
        if data.installment_plans.contains_key(&plan.booking_id) {
            return Err(RepositoryError::conflict_with_context(
                format!("Booking {} already has an installment plan", plan.booking_id),
                ErrorContext::new("create_installment_plan")
                    .with_entity("installment_plan")
                    .with_entity_id(plan.booking_id),
            ));
        }

        let (booking, payment) = match down_payment {
            Some(payment) => {
                let applied = data.apply_payment(payment, "create_installment_plan")?;
                (applied.booking, Some(applied.payment))
            }
            None => (booking, None),
        };
        data.installment_plans.insert(plan.booking_id, plan.clone());
        Ok((booking, payment))
    }

    async fn pay_installment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment> {
        self.check_health()?;
        let booking_id = payment.booking_id;
        let context = || {
            ErrorContext::new("pay_installment")
                .with_entity("installment_plan")
                .with_entity_id(booking_id)
        };
        let mut data = self.data.write();
        let plan = data.installment_plans.get(&booking_id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Booking {} has no installment plan", booking_id),
                context(),
            )
        })?;
        let number = payment.installment_number.unwrap_or_default();
        let entry = plan
            .entries
            .iter()
            .find(|e| e.number == number)
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Installment {} not found for booking {}", number, booking_id),
                    context(),
                )
            })?;
        if entry.is_paid() {
            return Err(RepositoryError::conflict_with_context(
                format!("Installment {} is already paid", number),
                context(),
            ));
        }
        if entry.amount != payment.amount {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "Installment {} is {}, not {}",
                    number, entry.amount, payment.amount
                ),
                context(),
            ));
        }

        let applied = data.apply_payment(payment, "pay_installment")?;
        if let Some(entry) = data
            .installment_plans
            .get_mut(&booking_id)
            .and_then(|plan| plan.entries.iter_mut().find(|e| e.number == number))
        {
            entry.status = InstallmentStatus::Paid;
            entry.paid_at = Some(applied.payment.paid_at);
            entry.payment_id = Some(applied.payment.id);
        }
        Ok(applied)
    }

    async fn get_installment_plan(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<InstallmentPlan>> {
        self.check_health()?;
        Ok(self.data.read().installment_plans.get(&booking_id).cloned())
    }
}

#[async_trait]
impl EnrollmentRepository for LocalRepository {
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> RepositoryResult<Enrollment> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = EnrollmentId::new(next_key(&data.enrollments));
        let stored = Enrollment {
            id,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            course_name: enrollment.course_name,
            instructor_id: enrollment.instructor_id,
            booking_id: enrollment.booking_id,
            status: EnrollmentStatus::Active,
            lessons_completed: 0,
            total_lessons: enrollment.total_lessons,
            certificate_status: CertificateStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
        };
        data.enrollments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> RepositoryResult<Enrollment> {
        self.check_health()?;
        self.data
            .read()
            .enrollments
            .get(&enrollment_id)
            .cloned()
            .ok_or_else(|| Self::missing("Enrollment", enrollment_id, "get_enrollment"))
    }

    async fn find_enrollment_by_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<Enrollment>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .enrollments
            .values()
            .find(|e| e.booking_id == Some(booking_id))
            .cloned())
    }

    async fn list_enrollments_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Enrollment>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().enrollments, |e| {
            e.student_id == student_id
        }))
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> RepositoryResult<Enrollment> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .enrollments
            .get_mut(&enrollment.id)
            .ok_or_else(|| Self::missing("Enrollment", enrollment.id, "update_enrollment"))?;
        stored.status = enrollment.status;
        stored.lessons_completed = enrollment.lessons_completed;
        stored.instructor_id = enrollment.instructor_id;
        stored.certificate_status = enrollment.certificate_status;
        stored.completed_at = enrollment.completed_at;
        Ok(stored.clone())
    }

    async fn create_certificate(
        &self,
        certificate: NewCertificate,
    ) -> RepositoryResult<Certificate> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .certificates
            .values()
            .any(|c| c.enrollment_id == certificate.enrollment_id)
        {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Enrollment {} already has a certificate",
                    certificate.enrollment_id
                ),
                ErrorContext::new("create_certificate")
                    .with_entity("certificate")
                    .with_entity_id(certificate.enrollment_id),
            ));
        }
        let id = CertificateId::new(next_key(&data.certificates));
        let stored = Certificate {
            id,
            enrollment_id: certificate.enrollment_id,
            student_id: certificate.student_id,
            student_name: certificate.student_name,
            course_name: certificate.course_name,
            certificate_number: None,
            verification_hash: None,
            status: CertificateStatus::Pending,
            issued_at: None,
            created_at: Utc::now(),
        };
        data.certificates.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_certificate(
        &self,
        certificate_id: CertificateId,
    ) -> RepositoryResult<Certificate> {
        self.check_health()?;
        self.data
            .read()
            .certificates
            .get(&certificate_id)
            .cloned()
            .ok_or_else(|| Self::missing("Certificate", certificate_id, "get_certificate"))
    }

    async fn find_certificate_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> RepositoryResult<Option<Certificate>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .certificates
            .values()
            .find(|c| c.enrollment_id == enrollment_id)
            .cloned())
    }

    async fn find_certificate_by_hash(&self, hash: &str) -> RepositoryResult<Option<Certificate>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .certificates
            .values()
            .find(|c| c.verification_hash.as_deref() == Some(hash))
            .cloned())
    }

    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> RepositoryResult<Option<Certificate>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .certificates
            .values()
            .find(|c| c.certificate_number.as_deref() == Some(number))
            .cloned())
    }

    async fn update_certificate(
        &self,
        certificate: &Certificate,
    ) -> RepositoryResult<Certificate> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data
            .certificates
            .get_mut(&certificate.id)
            .ok_or_else(|| Self::missing("Certificate", certificate.id, "update_certificate"))?;
        stored.certificate_number = certificate.certificate_number.clone();
        stored.verification_hash = certificate.verification_hash.clone();
        stored.status = certificate.status;
        stored.issued_at = certificate.issued_at;
        Ok(stored.clone())
    }

    async fn list_certificates_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Certificate>> {
        self.check_health()?;
        Ok(sorted_by_key(&self.data.read().certificates, |c| {
            c.student_id == student_id
        }))
    }
}
