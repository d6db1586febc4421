//! End-to-end service flows against the in-memory repository.
//!
//! Each test drives the public service functions the way the HTTP handlers
//! do and inspects the repository and the log mailer's outbox afterwards.

mod support;

use chrono::{Duration, Utc};

use drivingschool::db::{BookingRepository, EnrollmentRepository, UserRepository};
use drivingschool::models::{
    Booking, BookingStatus, CertificateStatus, Course, EnrollmentStatus, InquiryStatus,
    InstallmentStatus, NewInquiry, OtpPurpose, PaymentMethod, PaymentPlan, User, UserId,
    UserRole,
};
use drivingschool::services::bookings::CreateBookingRequest;
use drivingschool::services::courses::CourseUpdate;
use drivingschool::services::enrollments::EnrollRequest;
use drivingschool::services::installments::CreatePlanRequest;
use drivingschool::services::{
    auth, bookings, certificates, courses, enrollments, inquiries, installments, payments,
    ServiceError,
};
use support::fixtures::{next_week, Fixture, PASSWORD};

async fn book(fx: &Fixture, student: &User, course: &Course, plan: PaymentPlan) -> Booking {
    bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        student.id,
        CreateBookingRequest {
            course_id: course.id,
            instructor_id: None,
            start_date: next_week(),
            preferred_slot: "Morning".to_string(),
            payment_plan: plan,
        },
    )
    .await
    .unwrap()
}

async fn verify(fx: &Fixture, email: &str, code: &str) -> Result<(), ServiceError> {
    auth::verify_otp(&fx.repo, &fx.config, email, code, OtpPurpose::Verification).await
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_register_verify_login_logout() {
    let fx = Fixture::new();
    let user = auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        auth::RegisterRequest {
            name: "Lee Park".to_string(),
            email: "  Lee@Example.com ".to_string(),
            phone: String::new(),
            password: PASSWORD.to_string(),
            role: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(user.email, "lee@example.com");
    assert_eq!(user.role, UserRole::Student);
    assert!(!user.verified);
    assert_eq!(fx.mailer.sent_to("lee@example.com").len(), 1);

    let err = auth::login(&fx.repo, &fx.config, "lee@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let code = fx
        .otp_code("lee@example.com", OtpPurpose::Verification)
        .await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let err = verify(&fx, "lee@example.com", wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    verify(&fx, "LEE@example.com", &code)
        .await
        .unwrap();
    let err = verify(&fx, "lee@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let session = auth::login(&fx.repo, &fx.config, "lee@example.com", PASSWORD)
        .await
        .unwrap();
    assert!(session.expires_at > Utc::now());
    let me = auth::authenticate(&fx.repo, &session.token).await.unwrap();
    assert_eq!(me.id, user.id);

    auth::logout(&fx.repo, &session.token).await.unwrap();
    auth::logout(&fx.repo, &session.token).await.unwrap();
    let err = auth::authenticate(&fx.repo, &session.token)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let fx = Fixture::new();
    fx.student("sam@example.com").await;

    let wrong_password = auth::login(&fx.repo, &fx.config, "sam@example.com", "not-the-one")
        .await
        .unwrap_err();
    let unknown = auth::login(&fx.repo, &fx.config, "nobody@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(wrong_password, ServiceError::Unauthorized(_)));
    assert_eq!(wrong_password.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_registration_rules() {
    let fx = Fixture::new();
    fx.student("sam@example.com").await;

    let request = |email: &str, password: &str, role| auth::RegisterRequest {
        name: "Someone".to_string(),
        email: email.to_string(),
        phone: String::new(),
        password: password.to_string(),
        role,
    };

    let err = auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        request("SAM@example.com", PASSWORD, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        request("boss@example.com", PASSWORD, Some(UserRole::Admin)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        request("short@example.com", "1234567", None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        request("not-an-email", PASSWORD, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_resend_otp_rules() {
    let fx = Fixture::new();
    fx.student("sam@example.com").await;

    let err = auth::issue_otp(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        "sam@example.com",
        OtpPurpose::Verification,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    fx.mailer.clear();
    auth::issue_otp(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        "ghost@example.com",
        OtpPurpose::Verification,
    )
    .await
    .unwrap();
    assert!(fx.mailer.sent().is_empty());
    assert!(fx
        .repo
        .find_otp("ghost@example.com", OtpPurpose::Verification)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_otp_locks_after_repeated_wrong_guesses() {
    let fx = Fixture::new();
    auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        auth::RegisterRequest {
            name: "Guess".to_string(),
            email: "guess@example.com".to_string(),
            phone: String::new(),
            password: PASSWORD.to_string(),
            role: None,
        },
    )
    .await
    .unwrap();

    let code = fx
        .otp_code("guess@example.com", OtpPurpose::Verification)
        .await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    for _ in 1..fx.config.auth.otp_max_attempts {
        let err = verify(&fx, "guess@example.com", wrong).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(ref m) if m == "Invalid code"));
    }
    let err = verify(&fx, "guess@example.com", wrong).await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(ref m) if m.contains("Too many")));

    // The right code no longer works once the limit is hit.
    assert!(verify(&fx, "guess@example.com", &code).await.is_err());
    let user = fx
        .repo
        .find_user_by_email("guess@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.verified);

    // A fresh code starts a fresh count.
    auth::issue_otp(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        "guess@example.com",
        OtpPurpose::Verification,
    )
    .await
    .unwrap();
    let code = fx
        .otp_code("guess@example.com", OtpPurpose::Verification)
        .await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    verify(&fx, "guess@example.com", wrong).await.unwrap_err();
    verify(&fx, "guess@example.com", &code).await.unwrap();
}

#[tokio::test]
async fn test_password_reset() {
    let fx = Fixture::new();
    fx.student("sam@example.com").await;
    fx.mailer.clear();

    auth::forgot_password(&fx.repo, &fx.mailer, &fx.config, "ghost@example.com")
        .await
        .unwrap();
    assert!(fx.mailer.sent().is_empty());

    auth::forgot_password(&fx.repo, &fx.mailer, &fx.config, "sam@example.com")
        .await
        .unwrap();
    assert_eq!(fx.mailer.sent_to("sam@example.com").len(), 1);

    let code = fx
        .otp_code("sam@example.com", OtpPurpose::PasswordReset)
        .await;
    let session = auth::login(&fx.repo, &fx.config, "sam@example.com", PASSWORD)
        .await
        .unwrap();
    auth::reset_password(
        &fx.repo,
        &fx.config,
        "sam@example.com",
        &code,
        "brand-new-secret",
    )
    .await
    .unwrap();

    let err = auth::authenticate(&fx.repo, &session.token)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert_eq!(fx.repo.session_count(), 0);

    assert!(auth::login(&fx.repo, &fx.config, "sam@example.com", PASSWORD)
        .await
        .is_err());
    auth::login(&fx.repo, &fx.config, "sam@example.com", "brand-new-secret")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_otp_is_rejected() {
    let fx = Fixture::new();
    auth::register(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        auth::RegisterRequest {
            name: "Late".to_string(),
            email: "late@example.com".to_string(),
            phone: String::new(),
            password: PASSWORD.to_string(),
            role: None,
        },
    )
    .await
    .unwrap();

    let mut otp = fx
        .repo
        .find_otp("late@example.com", OtpPurpose::Verification)
        .await
        .unwrap()
        .unwrap();
    otp.expires_at = Utc::now() - Duration::minutes(1);
    let code = otp.code.clone();
    fx.repo.store_otp(otp).await.unwrap();

    let err = verify(&fx, "late@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let fx = Fixture::new();
    assert!(auth::ensure_admin(&fx.repo, &fx.config)
        .await
        .unwrap()
        .is_none());

    let mut config = fx.config.clone();
    config.auth.admin_email = Some("Root@Example.com".to_string());
    config.auth.admin_password = Some("admin-password".to_string());

    let first = auth::ensure_admin(&fx.repo, &config)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.role, UserRole::Admin);
    assert!(first.verified);
    assert_eq!(first.email, "root@example.com");

    let second = auth::ensure_admin(&fx.repo, &config)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    auth::login(&fx.repo, &config, "root@example.com", "admin-password")
        .await
        .unwrap();
}

// =============================================================================
// Courses and inquiries
// =============================================================================

#[tokio::test]
async fn test_course_catalog_rules() {
    let fx = Fixture::new();
    let car = fx.course("Car - Manual", 150000, 20).await;
    let bike = fx.course("Motorcycle", 90000, 10).await;

    let err = courses::create_course(
        &fx.repo,
        drivingschool::models::NewCourse {
            name: "car - manual".to_string(),
            description: String::new(),
            fee: 1,
            duration_weeks: 1,
            total_lessons: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = courses::update_course(
        &fx.repo,
        car.id,
        CourseUpdate {
            fee: Some(0),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let updated = courses::update_course(
        &fx.repo,
        bike.id,
        CourseUpdate {
            fee: Some(95000),
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.fee, 95000);
    assert!(!updated.active);

    assert_eq!(courses::list_courses(&fx.repo, false).await.unwrap().len(), 2);
    let active = courses::list_courses(&fx.repo, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, car.id);
}

#[tokio::test]
async fn test_inquiry_lifecycle() {
    let fx = Fixture::new();
    let inquiry = |message: &str, email: &str| NewInquiry {
        name: "Pat".to_string(),
        email: email.to_string(),
        phone: String::new(),
        course_name: Some("  ".to_string()),
        message: message.to_string(),
    };

    let err = inquiries::submit_inquiry(&fx.repo, inquiry("", "pat@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
    let err = inquiries::submit_inquiry(&fx.repo, inquiry("Hi", "pat"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let created = inquiries::submit_inquiry(
        &fx.repo,
        inquiry("Do you teach on weekends?", "Pat@Example.com"),
    )
    .await
    .unwrap();
    assert_eq!(created.status, InquiryStatus::Pending);
    assert_eq!(created.course_name, None);
    assert_eq!(created.email, "pat@example.com");

    let in_progress = inquiries::update_inquiry_status(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        created.id,
        InquiryStatus::InProgress,
        None,
    )
    .await
    .unwrap();
    assert_eq!(in_progress.status, InquiryStatus::InProgress);
    assert!(fx.mailer.sent().is_empty());

    let resolved = inquiries::update_inquiry_status(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        created.id,
        InquiryStatus::Resolved,
        Some("Yes, Saturdays 9-13.".to_string()),
    )
    .await
    .unwrap();
    assert!(resolved.resolved_at.is_some());
    let sent = fx.mailer.sent_to("pat@example.com");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text_body.contains("Saturdays 9-13"));

    let err = inquiries::update_inquiry_status(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        created.id,
        InquiryStatus::Pending,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let pending = inquiries::list_inquiries(&fx.repo, Some(InquiryStatus::Pending))
        .await
        .unwrap();
    assert!(pending.is_empty());
    let resolved = inquiries::list_inquiries(&fx.repo, Some(InquiryStatus::Resolved))
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_resolution() {
    let fx = Fixture::new();
    let created = inquiries::submit_inquiry(
        &fx.repo,
        NewInquiry {
            name: "Kim".to_string(),
            email: "kim@example.com".to_string(),
            phone: String::new(),
            course_name: None,
            message: "Price?".to_string(),
        },
    )
    .await
    .unwrap();

    fx.mailer.set_failing(true);
    let resolved = inquiries::update_inquiry_status(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        created.id,
        InquiryStatus::Resolved,
        Some("1500.00".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(resolved.status, InquiryStatus::Resolved);
    assert!(fx.mailer.sent().is_empty());
}

// =============================================================================
// Bookings and payments
// =============================================================================

#[tokio::test]
async fn test_booking_validation() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let instructor = fx
        .verified_user("Ivy Instructor", "ivy@example.com", UserRole::Instructor)
        .await;
    let course = fx.course("Car - Manual", 150000, 20).await;

    let request = |start_date, instructor_id| CreateBookingRequest {
        course_id: course.id,
        instructor_id,
        start_date,
        preferred_slot: String::new(),
        payment_plan: PaymentPlan::Full,
    };

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    let err = bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        student.id,
        request(yesterday, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        instructor.id,
        request(next_week(), None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        student.id,
        request(next_week(), Some(student.id)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let booking = bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        student.id,
        request(next_week(), Some(instructor.id)),
    )
    .await
    .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_amount, 150000);
    assert_eq!(booking.instructor_id, Some(instructor.id));

    courses::update_course(
        &fx.repo,
        course.id,
        CourseUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let err = bookings::create_booking(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        student.id,
        request(next_week(), None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_full_payment_confirms_and_enrolls() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Car - Manual", 150000, 10).await;
    let booking = book(&fx, &student, &course, PaymentPlan::Full).await;
    assert!(fx
        .mailer
        .sent_to("sam@example.com")
        .iter()
        .any(|m| m.subject == format!("Booking #{} received", booking.id)));

    let payment = payments::pay_in_full(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        PaymentMethod::Card,
    )
    .await
    .unwrap();
    assert_eq!(payment.amount, 150000);
    assert_eq!(payment.installment_number, None);
    assert_eq!(
        payment.receipt_number,
        payments::receipt_number(payment.id, payment.paid_at)
    );

    let booking = bookings::get_booking(&fx.repo, booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.amount_paid, 150000);
    assert_eq!(booking.balance(), 0);

    let enrolled = enrollments::list_for_student(&fx.repo, student.id)
        .await
        .unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].status, EnrollmentStatus::Active);
    assert_eq!(enrolled[0].total_lessons, 10);
    assert_eq!(enrolled[0].booking_id, Some(booking.id));

    let receipt_mail = fx
        .mailer
        .sent_to("sam@example.com")
        .into_iter()
        .find(|m| m.subject.contains(&payment.receipt_number))
        .expect("receipt emailed");
    assert_eq!(
        receipt_mail.attachments[0].filename,
        format!("{}.pdf", payment.receipt_number)
    );

    let err = payments::pay_in_full(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        PaymentMethod::Cash,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let (filename, pdf) = payments::receipt_pdf(&fx.repo, &fx.config, payment.id)
        .await
        .unwrap();
    assert_eq!(filename, format!("{}.pdf", payment.receipt_number));
    assert!(pdf.starts_with(b"%PDF"));

    let listed = payments::list_payments(&fx.repo, booking.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_plan_mismatch_is_rejected() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Car - Manual", 150000, 10).await;
    let full = book(&fx, &student, &course, PaymentPlan::Full).await;
    let monthly = book(&fx, &student, &course, PaymentPlan::Installment).await;

    let err = installments::create_plan(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        full.id,
        CreatePlanRequest {
            months: 3,
            down_payment: 0,
            method: PaymentMethod::Cash,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = payments::pay_in_full(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        monthly.id,
        PaymentMethod::Cash,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_installment_plan_flow() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Car - Automatic", 100000, 12).await;
    let booking = book(&fx, &student, &course, PaymentPlan::Installment).await;

    let plan = installments::create_plan(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        CreatePlanRequest {
            months: 3,
            down_payment: 10000,
            method: PaymentMethod::Upi,
        },
    )
    .await
    .unwrap();
    assert_eq!(plan.entries.len(), 3);
    assert!(plan.entries.iter().all(|e| e.amount == 30000));
    assert_eq!(plan.total_scheduled() + plan.down_payment, 100000);
    assert_eq!(
        plan.entries[0].due_date,
        installments::add_months(booking.start_date, 1).unwrap()
    );

    let after_plan = bookings::get_booking(&fx.repo, booking.id).await.unwrap();
    assert_eq!(after_plan.status, BookingStatus::Confirmed);
    assert_eq!(after_plan.amount_paid, 10000);
    let down = payments::list_payments(&fx.repo, booking.id).await.unwrap();
    assert_eq!(down.len(), 1);
    assert_eq!(down[0].installment_number, Some(0));

    let err = installments::create_plan(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        CreatePlanRequest {
            months: 2,
            down_payment: 0,
            method: PaymentMethod::Cash,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let pay = |number| {
        installments::pay_installment(
            &fx.repo,
            &fx.mailer,
            &fx.config,
            booking.id,
            number,
            PaymentMethod::Cash,
        )
    };

    assert!(matches!(pay(2).await, Err(ServiceError::BadRequest(_))));
    assert!(matches!(pay(4).await, Err(ServiceError::NotFound(_))));

    let first = pay(1).await.unwrap();
    assert_eq!(first.amount, 30000);
    assert_eq!(first.installment_number, Some(1));
    assert!(matches!(pay(1).await, Err(ServiceError::BadRequest(_))));

    let stored = fx
        .repo
        .get_installment_plan(booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.entries[0].status, InstallmentStatus::Paid);
    assert_eq!(stored.entries[0].payment_id, Some(first.id));
    assert_eq!(stored.outstanding(), 60000);

    let far_future = booking.start_date + Duration::days(200);
    let viewed = installments::get_plan(&fx.repo, booking.id, far_future)
        .await
        .unwrap();
    assert_eq!(viewed.entries[0].status, InstallmentStatus::Paid);
    assert_eq!(viewed.entries[1].status, InstallmentStatus::Overdue);
    assert_eq!(viewed.entries[2].status, InstallmentStatus::Overdue);

    pay(2).await.unwrap();
    pay(3).await.unwrap();
    let paid_off = bookings::get_booking(&fx.repo, booking.id).await.unwrap();
    assert_eq!(paid_off.amount_paid, 100000);
    assert_eq!(paid_off.balance(), 0);

    let receipts = fx
        .mailer
        .sent_to("sam@example.com")
        .into_iter()
        .filter(|m| m.subject.starts_with("Receipt"))
        .count();
    assert_eq!(receipts, 4);
}

#[tokio::test]
async fn test_plan_without_down_payment_and_missing_plan() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Car - Automatic", 100001, 12).await;
    let booking = book(&fx, &student, &course, PaymentPlan::Installment).await;

    let err = installments::get_plan(&fx.repo, booking.id, Utc::now().date_naive())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let plan = installments::create_plan(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        CreatePlanRequest {
            months: 2,
            down_payment: 0,
            method: PaymentMethod::Cash,
        },
    )
    .await
    .unwrap();
    assert_eq!(plan.entries[0].amount, 50001);
    assert_eq!(plan.entries[1].amount, 50000);
    assert!(payments::list_payments(&fx.repo, booking.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_booking_status_transitions() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Car - Manual", 150000, 10).await;
    let booking = book(&fx, &student, &course, PaymentPlan::Full).await;

    let confirmed = bookings::update_booking_status(&fx.repo, booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    bookings::update_booking_status(&fx.repo, booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert!(fx
        .repo
        .find_enrollment_by_booking(booking.id)
        .await
        .unwrap()
        .is_some());
    assert_eq!(
        enrollments::list_for_student(&fx.repo, student.id)
            .await
            .unwrap()
            .len(),
        1
    );

    bookings::update_booking_status(&fx.repo, booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    let err = bookings::update_booking_status(&fx.repo, booking.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = payments::pay_in_full(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        PaymentMethod::Cash,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let student_bookings = bookings::list_student_bookings(&fx.repo, student.id)
        .await
        .unwrap();
    assert_eq!(student_bookings.len(), 1);
    let err = bookings::list_student_bookings(&fx.repo, UserId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Repository(_)));
}

// =============================================================================
// Enrollments and certificates
// =============================================================================

#[tokio::test]
async fn test_progress_and_status_rules() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Motorcycle", 90000, 4).await;

    let enrollment = enrollments::enroll(
        &fx.repo,
        EnrollRequest {
            student_id: student.id,
            course_id: course.id,
            booking_id: None,
            instructor_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(enrollment.certificate_status, CertificateStatus::Pending);

    assert!(matches!(
        enrollments::record_progress(&fx.repo, enrollment.id, 5).await,
        Err(ServiceError::BadRequest(_))
    ));
    let halfway = enrollments::record_progress(&fx.repo, enrollment.id, 2)
        .await
        .unwrap();
    assert_eq!(halfway.progress_percent(), 50);
    assert_eq!(halfway.status, EnrollmentStatus::Active);

    assert!(matches!(
        enrollments::update_status(&fx.repo, enrollment.id, EnrollmentStatus::Completed).await,
        Err(ServiceError::BadRequest(_))
    ));

    let done = enrollments::record_progress(&fx.repo, enrollment.id, 4)
        .await
        .unwrap();
    assert_eq!(done.status, EnrollmentStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(matches!(
        enrollments::record_progress(&fx.repo, enrollment.id, 3).await,
        Err(ServiceError::BadRequest(_))
    ));

    let other = enrollments::enroll(
        &fx.repo,
        EnrollRequest {
            student_id: student.id,
            course_id: course.id,
            booking_id: None,
            instructor_id: None,
        },
    )
    .await
    .unwrap();
    enrollments::update_status(&fx.repo, other.id, EnrollmentStatus::Dropped)
        .await
        .unwrap();
    assert!(matches!(
        enrollments::update_status(&fx.repo, other.id, EnrollmentStatus::Active).await,
        Err(ServiceError::BadRequest(_))
    ));

    let err = enrollments::enroll(
        &fx.repo,
        EnrollRequest {
            student_id: student.id,
            course_id: course.id,
            booking_id: None,
            instructor_id: Some(student.id),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_certificate_issue_and_verify() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Motorcycle", 90000, 4).await;
    let booking = book(&fx, &student, &course, PaymentPlan::Full).await;
    payments::pay_in_full(
        &fx.repo,
        &fx.mailer,
        &fx.config,
        booking.id,
        PaymentMethod::Cash,
    )
    .await
    .unwrap();
    let enrollment = fx
        .repo
        .find_enrollment_by_booking(booking.id)
        .await
        .unwrap()
        .unwrap();

    let err = certificates::generate(&fx.repo, &fx.mailer, &fx.config, enrollment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    enrollments::record_progress(&fx.repo, enrollment.id, 4)
        .await
        .unwrap();
    let certificate = certificates::generate(&fx.repo, &fx.mailer, &fx.config, enrollment.id)
        .await
        .unwrap();
    assert_eq!(certificate.status, CertificateStatus::Issued);
    assert_eq!(certificate.student_name, "Sam Student");
    let number = certificate.certificate_number.clone().unwrap();
    let hash = certificate.verification_hash.clone().unwrap();
    assert!(number.starts_with("DSC-"));
    assert_eq!(hash.len(), 64);

    let enrollment = enrollments::get_enrollment(&fx.repo, enrollment.id)
        .await
        .unwrap();
    assert_eq!(enrollment.certificate_status, CertificateStatus::Issued);

    let mail = fx
        .mailer
        .sent_to("sam@example.com")
        .into_iter()
        .find(|m| m.subject.contains(&number))
        .expect("certificate emailed");
    assert_eq!(mail.attachments[0].filename, format!("{}.pdf", number));

    let again = certificates::generate(&fx.repo, &fx.mailer, &fx.config, enrollment.id)
        .await
        .unwrap();
    assert_eq!(again.id, certificate.id);
    assert_eq!(again.certificate_number.as_deref(), Some(number.as_str()));

    let by_number = certificates::verify(&fx.repo, &number.to_lowercase())
        .await
        .unwrap();
    assert!(by_number.valid);
    let by_hash = certificates::verify(&fx.repo, &hash.to_uppercase())
        .await
        .unwrap();
    assert!(by_hash.valid);
    assert_eq!(by_hash.certificate.unwrap().id, certificate.id);

    let unknown = certificates::verify(&fx.repo, "DSC-1999-000001").await.unwrap();
    assert!(!unknown.valid);
    assert!(unknown.certificate.is_none());

    let (filename, pdf) = certificates::render_pdf(&fx.repo, &fx.config, certificate.id)
        .await
        .unwrap();
    assert_eq!(filename, format!("{}.pdf", number));
    assert!(pdf.starts_with(b"%PDF"));

    let listed = certificates::list_for_student(&fx.repo, student.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_tampered_certificate_fails_verification() {
    let fx = Fixture::new();
    let student = fx.student("sam@example.com").await;
    let course = fx.course("Motorcycle", 90000, 1).await;
    let enrollment = enrollments::enroll(
        &fx.repo,
        EnrollRequest {
            student_id: student.id,
            course_id: course.id,
            booking_id: None,
            instructor_id: None,
        },
    )
    .await
    .unwrap();
    enrollments::record_progress(&fx.repo, enrollment.id, 1)
        .await
        .unwrap();
    let mut certificate = certificates::generate(&fx.repo, &fx.mailer, &fx.config, enrollment.id)
        .await
        .unwrap();

    certificate.issued_at = certificate.issued_at.map(|t| t + Duration::days(1));
    fx.repo.update_certificate(&certificate).await.unwrap();

    let number = certificate.certificate_number.clone().unwrap();
    let result = certificates::verify(&fx.repo, &number).await.unwrap();
    assert!(!result.valid);
    assert!(result.certificate.is_some());
}
