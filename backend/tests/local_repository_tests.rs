//! Expanded tests for LocalRepository.
//!
//! These tests cover concurrent access patterns, filtering and ordering, and
//! error conditions for the in-memory repository.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use drivingschool::db::repositories::LocalRepository;
use drivingschool::db::repository::{
    BookingFilter, BookingRepository, CourseRepository, EnrollmentRepository, InquiryRepository,
    RepositoryError, UserRepository,
};
use drivingschool::models::{
    Booking, BookingId, BookingStatus, Course, CourseId, InquiryStatus, Installment,
    InstallmentPlan, InstallmentStatus, NewBooking, NewCertificate, NewCourse, NewEnrollment,
    NewInquiry, NewPayment, NewUser, PaymentMethod, PaymentPlan, Session, User, UserId, UserRole,
};

fn new_user(email: &str, role: UserRole) -> NewUser {
    NewUser {
        name: format!("User {}", email),
        email: email.to_string(),
        phone: String::new(),
        role,
        password_hash: "hash".to_string(),
        password_salt: "salt".to_string(),
        verified: true,
    }
}

fn new_course(name: &str) -> NewCourse {
    NewCourse {
        name: name.to_string(),
        description: String::new(),
        fee: 100_000,
        duration_weeks: 4,
        total_lessons: 8,
    }
}

fn new_booking(student: &User, course: &Course) -> NewBooking {
    NewBooking {
        student_id: student.id,
        course_id: course.id,
        course_name: course.name.clone(),
        instructor_id: None,
        start_date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
        preferred_slot: String::new(),
        payment_plan: PaymentPlan::Full,
        total_amount: course.fee,
    }
}

async fn seed(repo: &LocalRepository) -> (User, Course) {
    let student = repo
        .create_user(new_user("student@example.com", UserRole::Student))
        .await
        .unwrap();
    let course = repo.create_course(new_course("Car - Manual")).await.unwrap();
    (student, course)
}

#[tokio::test]
async fn test_concurrent_user_creation_assigns_unique_ids() {
    let repo = Arc::new(LocalRepository::new());
    let mut handles = vec![];

    for i in 0..20 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_user(new_user(&format!("u{}@example.com", i), UserRole::Student))
                .await
        }));
    }

    let mut ids = vec![];
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(repo.user_count(), 20);
}

#[tokio::test]
async fn test_concurrent_duplicate_email_has_one_winner() {
    let repo = Arc::new(LocalRepository::new());
    let mut handles = vec![];

    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_user(new_user("same@example.com", UserRole::Student))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, RepositoryError::Conflict { .. })),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_concurrent_payments_on_one_booking() {
    let repo = Arc::new(LocalRepository::new());
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();

    let mut handles = vec![];
    for n in 1..=5 {
        let repo = repo.clone();
        let booking_id = booking.id;
        let student_id = student.id;
        handles.push(tokio::spawn(async move {
            repo.record_payment(NewPayment {
                booking_id,
                student_id,
                amount: 1_000,
                method: PaymentMethod::Cash,
                installment_number: Some(n),
                paid_at: Utc::now(),
            })
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let payments = repo.list_payments_for_booking(booking.id).await.unwrap();
    assert_eq!(payments.len(), 5);
    let mut receipts: Vec<_> = payments.iter().map(|p| p.receipt_number.clone()).collect();
    receipts.sort();
    receipts.dedup();
    assert_eq!(receipts.len(), 5);
    assert_eq!(repo.get_booking(booking.id).await.unwrap().amount_paid, 5_000);
}

fn payment(booking: &Booking, amount: i64, installment_number: Option<i32>) -> NewPayment {
    NewPayment {
        booking_id: booking.id,
        student_id: booking.student_id,
        amount,
        method: PaymentMethod::Card,
        installment_number,
        paid_at: Utc::now(),
    }
}

fn plan_for(booking: &Booking, amounts: &[i64]) -> InstallmentPlan {
    InstallmentPlan {
        booking_id: booking.id,
        months: amounts.len() as i32,
        down_payment: booking.total_amount - amounts.iter().sum::<i64>(),
        entries: amounts
            .iter()
            .zip(1..)
            .map(|(&amount, number)| Installment {
                number,
                amount,
                due_date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
                status: InstallmentStatus::Pending,
                paid_at: None,
                payment_id: None,
            })
            .collect(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_payment_beyond_balance_is_a_conflict() {
    let repo = LocalRepository::new();
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();

    let applied = repo
        .record_payment(payment(&booking, 60_000, None))
        .await
        .unwrap();
    assert_eq!(applied.booking.amount_paid, 60_000);
    assert_eq!(applied.booking.balance(), 40_000);

    let err = repo
        .record_payment(payment(&booking, 40_001, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));
    let err = repo
        .record_payment(payment(&booking, 0, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
    assert_eq!(repo.list_payments_for_booking(booking.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_full_payments_have_one_winner() {
    let repo = Arc::new(LocalRepository::new());
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();

    let mut handles = vec![];
    for _ in 0..8 {
        let repo = repo.clone();
        let new_payment = payment(&booking, booking.total_amount, None);
        handles.push(tokio::spawn(
            async move { repo.record_payment(new_payment).await },
        ));
    }

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(e) => assert!(matches!(e, RepositoryError::Conflict { .. })),
        }
    }
    assert_eq!(paid, 1);
    let stored = repo.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.amount_paid, stored.total_amount);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_installment_payers_have_one_winner() {
    let repo = Arc::new(LocalRepository::new());
    let (student, course) = seed(&repo).await;

    let mut bookings = vec![];
    for _ in 0..50 {
        let booking = repo
            .create_booking(new_booking(&student, &course))
            .await
            .unwrap();
        repo.create_installment_plan(&plan_for(&booking, &[50_000, 50_000]), None)
            .await
            .unwrap();
        bookings.push(booking);
    }

    let mut handles = vec![];
    for booking in &bookings {
        for _ in 0..4 {
            let repo = repo.clone();
            let new_payment = payment(booking, 50_000, Some(1));
            handles.push(tokio::spawn(
                async move { repo.pay_installment(new_payment).await },
            ));
        }
    }
    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(e) => assert!(matches!(e, RepositoryError::Conflict { .. })),
        }
    }
    assert_eq!(paid, bookings.len());

    for booking in &bookings {
        let stored = repo.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.amount_paid, 50_000);
        assert_eq!(
            repo.list_payments_for_booking(booking.id).await.unwrap().len(),
            1
        );
        let plan = repo.get_installment_plan(booking.id).await.unwrap().unwrap();
        assert!(plan.entries[0].is_paid());
        assert!(!plan.entries[1].is_paid());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_plan_creation_takes_one_down_payment() {
    let repo = Arc::new(LocalRepository::new());
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();
    let plan = plan_for(&booking, &[45_000, 45_000]);

    let mut handles = vec![];
    for _ in 0..6 {
        let repo = repo.clone();
        let plan = plan.clone();
        let down = payment(&booking, 10_000, Some(0));
        handles.push(tokio::spawn(async move {
            repo.create_installment_plan(&plan, Some(down)).await
        }));
    }
    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok((stored, down)) => {
                created += 1;
                assert_eq!(stored.amount_paid, 10_000);
                assert_eq!(down.unwrap().installment_number, Some(0));
            }
            Err(e) => assert!(matches!(e, RepositoryError::Conflict { .. })),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(repo.get_booking(booking.id).await.unwrap().amount_paid, 10_000);
    assert_eq!(repo.list_payments_for_booking(booking.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_installment_payment_checks() {
    let repo = LocalRepository::new();
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();

    let err = repo
        .pay_installment(payment(&booking, 50_000, Some(1)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    repo.create_installment_plan(&plan_for(&booking, &[50_000, 50_000]), None)
        .await
        .unwrap();
    let err = repo
        .pay_installment(payment(&booking, 50_000, Some(3)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let err = repo
        .pay_installment(payment(&booking, 49_999, Some(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));

    let applied = repo
        .pay_installment(payment(&booking, 50_000, Some(2)))
        .await
        .unwrap();
    assert_eq!(applied.booking.amount_paid, 50_000);
    let plan = repo.get_installment_plan(booking.id).await.unwrap().unwrap();
    assert_eq!(plan.entries[1].payment_id, Some(applied.payment.id));
    assert_eq!(plan.entries[1].paid_at, Some(applied.payment.paid_at));
}

#[tokio::test]
async fn test_booking_filter_and_newest_first_order() {
    let repo = LocalRepository::new();
    let (student, course) = seed(&repo).await;
    let other = repo
        .create_user(new_user("other@example.com", UserRole::Student))
        .await
        .unwrap();

    let first = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();
    let second = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();
    repo.create_booking(new_booking(&other, &course))
        .await
        .unwrap();

    let mut confirmed = second.clone();
    confirmed.status = BookingStatus::Confirmed;
    repo.update_booking(&confirmed).await.unwrap();

    let all = repo.list_bookings(BookingFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let mine = repo
        .list_bookings(BookingFilter::for_student(student.id))
        .await
        .unwrap();
    assert_eq!(
        mine.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let pending_mine = repo
        .list_bookings(BookingFilter {
            student_id: Some(student.id),
            status: Some(BookingStatus::Pending),
        })
        .await
        .unwrap();
    assert_eq!(pending_mine.len(), 1);
    assert_eq!(pending_mine[0].id, first.id);
}

#[tokio::test]
async fn test_update_booking_ignores_money_fields() {
    let repo = LocalRepository::new();
    let (student, course) = seed(&repo).await;
    let booking = repo
        .create_booking(new_booking(&student, &course))
        .await
        .unwrap();

    let mut changed = booking.clone();
    changed.total_amount = 1;
    changed.amount_paid = 25_000;
    changed.status = BookingStatus::Confirmed;
    let stored = repo.update_booking(&changed).await.unwrap();
    assert_eq!(stored.total_amount, booking.total_amount);
    assert_eq!(stored.amount_paid, 0);
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_missing_rows_are_not_found() {
    let repo = LocalRepository::new();

    let err = repo.get_booking(BookingId::new(42)).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.message().contains("Booking 42"));

    let err = repo.get_course(CourseId::new(7)).await.unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .record_payment(NewPayment {
            booking_id: BookingId::new(3),
            student_id: UserId::new(1),
            amount: 10,
            method: PaymentMethod::Card,
            installment_number: None,
            paid_at: Utc::now(),
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let plan = InstallmentPlan {
        booking_id: BookingId::new(3),
        months: 2,
        down_payment: 0,
        entries: vec![],
        created_at: Utc::now(),
    };
    assert!(repo
        .create_installment_plan(&plan, None)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(repo
        .get_installment_plan(BookingId::new(3))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_course_names_are_unique_ignoring_case() {
    let repo = LocalRepository::new();
    repo.create_course(new_course("Motorcycle")).await.unwrap();

    let err = repo
        .create_course(new_course("MOTORCYCLE"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));

    let found = repo.find_course_by_name("motorcycle").await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_inquiries_list_newest_first_by_status() {
    let repo = LocalRepository::new();
    for i in 0..3 {
        repo.create_inquiry(NewInquiry {
            name: format!("Visitor {}", i),
            email: format!("v{}@example.com", i),
            phone: String::new(),
            course_name: None,
            message: "Hello".to_string(),
        })
        .await
        .unwrap();
    }

    let mut middle = repo
        .get_inquiry(drivingschool::models::InquiryId::new(2))
        .await
        .unwrap();
    middle.status = InquiryStatus::Resolved;
    middle.resolved_at = Some(Utc::now());
    repo.update_inquiry(&middle).await.unwrap();

    let all = repo.list_inquiries(None).await.unwrap();
    assert_eq!(
        all.iter().map(|i| i.id.value()).collect::<Vec<_>>(),
        vec![3, 2, 1]
    );
    let pending = repo
        .list_inquiries(Some(InquiryStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
}

#[tokio::test]
async fn test_one_certificate_per_enrollment() {
    let repo = LocalRepository::new();
    let (student, course) = seed(&repo).await;
    let enrollment = repo
        .create_enrollment(NewEnrollment {
            student_id: student.id,
            course_id: course.id,
            course_name: course.name.clone(),
            instructor_id: None,
            booking_id: None,
            total_lessons: course.total_lessons,
        })
        .await
        .unwrap();

    let certificate = || NewCertificate {
        enrollment_id: enrollment.id,
        student_id: student.id,
        student_name: student.name.clone(),
        course_name: course.name.clone(),
    };
    let created = repo.create_certificate(certificate()).await.unwrap();
    assert!(created.certificate_number.is_none());

    let err = repo.create_certificate(certificate()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));

    let mut issued = created.clone();
    issued.certificate_number = Some("DSC-2030-000001".to_string());
    issued.verification_hash = Some("ab".repeat(32));
    repo.update_certificate(&issued).await.unwrap();

    assert!(repo
        .find_certificate_by_number("DSC-2030-000001")
        .await
        .unwrap()
        .is_some());
    assert!(repo
        .find_certificate_by_hash(&"ab".repeat(32))
        .await
        .unwrap()
        .is_some());
    assert_eq!(
        repo.list_certificates_for_student(student.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_sessions_round_trip_and_clear() {
    let repo = LocalRepository::new();
    let (student, _) = seed(&repo).await;
    let now = Utc::now();
    repo.create_session(Session {
        token: "tok".to_string(),
        user_id: student.id,
        created_at: now,
        expires_at: now + Duration::hours(1),
    })
    .await
    .unwrap();
    assert_eq!(repo.session_count(), 1);
    assert_eq!(
        repo.find_session("tok").await.unwrap().unwrap().user_id,
        student.id
    );

    repo.delete_session("tok").await.unwrap();
    assert!(repo.find_session("tok").await.unwrap().is_none());

    repo.clear();
    assert_eq!(repo.user_count(), 0);
    assert!(repo.list_courses(false).await.unwrap().is_empty());
}
