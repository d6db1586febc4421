//! Shared setup for service and HTTP tests.

use chrono::{Duration, NaiveDate, Utc};

use drivingschool::config::AppConfig;
use drivingschool::db::repositories::LocalRepository;
use drivingschool::db::UserRepository;
use drivingschool::models::{Course, NewCourse, NewUser, OtpPurpose, User, UserRole};
use drivingschool::notify::LogMailer;
use drivingschool::services::{auth, courses};

pub const PASSWORD: &str = "correct-horse";

pub struct Fixture {
    pub repo: LocalRepository,
    pub mailer: LogMailer,
    pub config: AppConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            repo: LocalRepository::new(),
            mailer: LogMailer::new(),
            config: AppConfig::default(),
        }
    }

    /// Register through the service and confirm the emailed OTP.
    pub async fn verified_user(&self, name: &str, email: &str, role: UserRole) -> User {
        let user = auth::register(
            &self.repo,
            &self.mailer,
            &self.config,
            auth::RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                phone: "555-0100".to_string(),
                password: PASSWORD.to_string(),
                role: Some(role),
            },
        )
        .await
        .unwrap();
        let code = self.otp_code(email, OtpPurpose::Verification).await;
        auth::verify_otp(
            &self.repo,
            &self.config,
            email,
            &code,
            OtpPurpose::Verification,
        )
        .await
        .unwrap();
        self.repo.get_user(user.id).await.unwrap()
    }

    pub async fn student(&self, email: &str) -> User {
        self.verified_user("Sam Student", email, UserRole::Student)
            .await
    }

    /// Admins cannot self-register, so they are inserted directly.
    pub async fn admin(&self, email: &str) -> User {
        let salt = auth::generate_salt();
        self.repo
            .create_user(NewUser {
                name: "Ada Admin".to_string(),
                email: email.to_string(),
                phone: String::new(),
                role: UserRole::Admin,
                password_hash: auth::hash_password(PASSWORD, &salt),
                password_salt: salt,
                verified: true,
            })
            .await
            .unwrap()
    }

    pub async fn otp_code(&self, email: &str, purpose: OtpPurpose) -> String {
        self.repo
            .find_otp(email, purpose)
            .await
            .unwrap()
            .expect("otp issued")
            .code
    }

    pub async fn course(&self, name: &str, fee: i64, lessons: i32) -> Course {
        courses::create_course(
            &self.repo,
            NewCourse {
                name: name.to_string(),
                description: format!("{} course", name),
                fee,
                duration_weeks: 6,
                total_lessons: lessons,
            },
        )
        .await
        .unwrap()
    }
}

pub fn next_week() -> NaiveDate {
    (Utc::now() + Duration::days(7)).date_naive()
}
