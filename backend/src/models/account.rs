//! Accounts, one-time passwords and login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::define_status_enum;

define_status_enum!(
    /// Role of an account holder.
    UserRole {
        Student => "Student",
        Instructor => "Instructor",
        Admin => "Admin",
    }
);

impl UserRole {
    /// Instructors and admins manage other people's records.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Instructor | UserRole::Admin)
    }
}

define_status_enum!(
    /// What an OTP code unlocks.
    OtpPurpose {
        Verification => "Verification",
        PasswordReset => "PasswordReset",
    }
);

/// Stored account record.
///
/// Password material is skipped during serialization so a `User` can be
/// returned from handlers directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub password_salt: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub password_hash: String,
    pub password_salt: String,
    pub verified: bool,
}

/// One-time password issued for email verification or password reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp {
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    /// Wrong guesses against this code so far.
    #[serde(default)]
    pub failed_attempts: i32,
}

impl Otp {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Bearer-token session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
