//! Accounts: registration, OTP verification, login sessions and password reset.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    deliver, normalize_email, require_non_empty, validate_email, ServiceError, ServiceResult,
};
use crate::config::AppConfig;
use crate::db::checksum::sha256_hex_parts;
use crate::db::repository::{FullRepository, UserRepository};
use crate::models::{NewUser, Otp, OtpPurpose, Session, User, UserRole};
use crate::notify::{templates, Mailer};

pub const MIN_PASSWORD_LEN: usize = 8;
const SALT_BYTES: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

// ==================== Password hashing ====================

pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 of `salt || password`.
pub fn hash_password(password: &str, salt: &str) -> String {
    sha256_hex_parts(&[salt.as_bytes(), password.as_bytes()])
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    constant_time_eq(
        hash_password(password, salt).as_bytes(),
        expected_hash.as_bytes(),
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Random six-digit code, zero padded.
pub fn generate_otp_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

// ==================== Registration & OTP ====================

pub async fn register<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    request: RegisterRequest,
) -> ServiceResult<User> {
    require_non_empty("name", &request.name)?;
    validate_email(&request.email)?;
    validate_password(&request.password)?;

    let role = request.role.unwrap_or(UserRole::Student);
    if role == UserRole::Admin {
        return Err(ServiceError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let email = normalize_email(&request.email);
    if repo.find_user_by_email(&email).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "Email {} is already registered",
            email
        )));
    }

    let salt = generate_salt();
    let user = repo
        .create_user(NewUser {
            name: request.name.trim().to_string(),
            email,
            phone: request.phone.trim().to_string(),
            role,
            password_hash: hash_password(&request.password, &salt),
            password_salt: salt,
            verified: false,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    send_otp(repo, mailer, config, &user, OtpPurpose::Verification).await?;
    Ok(user)
}

/// Create the configured admin account if no user holds that email yet.
///
/// Returns `None` when `[auth]` has no admin credentials. The account is
/// created verified; an existing account is returned untouched.
pub async fn ensure_admin<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
) -> ServiceResult<Option<User>> {
    let (Some(email), Some(password)) = (&config.auth.admin_email, &config.auth.admin_password)
    else {
        return Ok(None);
    };
    validate_email(email)?;
    validate_password(password)?;

    let email = normalize_email(email);
    if let Some(existing) = repo.find_user_by_email(&email).await? {
        if existing.role != UserRole::Admin {
            warn!(user_id = %existing.id, "Configured admin email belongs to a non-admin account");
        }
        return Ok(Some(existing));
    }

    let salt = generate_salt();
    let admin = repo
        .create_user(NewUser {
            name: "Administrator".to_string(),
            email,
            phone: String::new(),
            role: UserRole::Admin,
            password_hash: hash_password(password, &salt),
            password_salt: salt,
            verified: true,
        })
        .await?;
    info!(user_id = %admin.id, "Admin account created");
    Ok(Some(admin))
}

async fn send_otp<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    user: &User,
    purpose: OtpPurpose,
) -> ServiceResult<()> {
    let otp = Otp {
        email: user.email.clone(),
        code: generate_otp_code(),
        purpose,
        expires_at: Utc::now() + Duration::minutes(config.auth.otp_ttl_minutes),
        consumed: false,
        failed_attempts: 0,
    };
    let email = templates::otp_email(
        &config.school,
        &user.name,
        &user.email,
        &otp.code,
        purpose,
        config.auth.otp_ttl_minutes,
    );
    repo.store_otp(otp).await?;
    debug!(user_id = %user.id, %purpose, "OTP issued");
    deliver(mailer, email, "otp").await;
    Ok(())
}

/// Issue a fresh code for `email`, replacing any live one.
///
/// Unknown emails succeed without sending anything so the endpoint does not
/// reveal which addresses hold an account.
pub async fn issue_otp<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    email: &str,
    purpose: OtpPurpose,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    let Some(user) = repo.find_user_by_email(&email).await? else {
        debug!(%purpose, "OTP requested for unknown email");
        return Ok(());
    };

    if purpose == OtpPurpose::Verification && user.verified {
        return Err(ServiceError::bad_request("Account is already verified"));
    }
    send_otp(repo, mailer, config, &user, purpose).await
}

/// Check and consume a code. A verification code marks the account verified.
///
/// After `auth.otp_max_attempts` wrong guesses the code is used up and a new
/// one must be requested.
pub async fn verify_otp<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    let otp = repo
        .find_otp(&email, purpose)
        .await?
        .ok_or_else(|| ServiceError::bad_request("No code has been issued for this email"))?;

    if otp.consumed {
        return Err(ServiceError::bad_request("Code has already been used"));
    }
    if otp.is_expired(Utc::now()) {
        return Err(ServiceError::bad_request("Code has expired"));
    }
    if !constant_time_eq(otp.code.as_bytes(), code.trim().as_bytes()) {
        let max_attempts = config.auth.otp_max_attempts;
        let attempts = repo.record_otp_failure(&email, purpose, max_attempts).await?;
        if attempts >= max_attempts {
            warn!(%purpose, attempts, "OTP locked after repeated wrong guesses");
            return Err(ServiceError::bad_request(
                "Too many wrong attempts; request a new code",
            ));
        }
        return Err(ServiceError::bad_request("Invalid code"));
    }
    if !repo.consume_otp(&email, purpose).await? {
        return Err(ServiceError::bad_request("Code has already been used"));
    }

    if purpose == OtpPurpose::Verification {
        if let Some(mut user) = repo.find_user_by_email(&email).await? {
            user.verified = true;
            repo.update_user(&user).await?;
            info!(user_id = %user.id, "Email verified");
        }
    }
    Ok(())
}

// ==================== Sessions ====================

pub async fn login<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> ServiceResult<LoginResponse> {
    let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

    let user = repo
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_salt, &user.password_hash) {
        return Err(invalid());
    }
    if !user.verified {
        return Err(ServiceError::Forbidden(
            "Email address has not been verified".to_string(),
        ));
    }

    let now = Utc::now();
    let session = Session {
        token: Uuid::new_v4().to_string(),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::hours(config.auth.session_ttl_hours),
    };
    repo.create_session(session.clone()).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(LoginResponse {
        token: session.token,
        user,
        expires_at: session.expires_at,
    })
}

pub async fn logout<R: FullRepository + ?Sized>(repo: &R, token: &str) -> ServiceResult<()> {
    repo.delete_session(token).await?;
    Ok(())
}

/// Resolve a bearer token to its user.
pub async fn authenticate<R: FullRepository + ?Sized>(repo: &R, token: &str) -> ServiceResult<User> {
    let unauthorized = || ServiceError::Unauthorized("Invalid or expired session".to_string());

    let session = repo.find_session(token).await?.ok_or_else(unauthorized)?;
    if session.is_expired(Utc::now()) {
        repo.delete_session(token).await?;
        return Err(unauthorized());
    }

    match repo.get_user(session.user_id).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_not_found() => Err(unauthorized()),
        Err(e) => Err(e.into()),
    }
}

// ==================== Password reset ====================

/// Always succeeds so callers cannot tell which emails are registered.
pub async fn forgot_password<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    email: &str,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    match repo.find_user_by_email(&email).await? {
        Some(user) => send_otp(repo, mailer, config, &user, OtpPurpose::PasswordReset).await,
        None => {
            debug!("Password reset requested for unknown email");
            Ok(())
        }
    }
}

pub async fn reset_password<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    email: &str,
    code: &str,
    new_password: &str,
) -> ServiceResult<()> {
    validate_password(new_password)?;
    verify_otp(repo, config, email, code, OtpPurpose::PasswordReset).await?;

    let mut user = repo
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| ServiceError::not_found("Account not found"))?;
    let salt = generate_salt();
    user.password_hash = hash_password(new_password, &salt);
    user.password_salt = salt;
    repo.update_user(&user).await?;
    let revoked = repo.delete_user_sessions(user.id).await?;
    info!(user_id = %user.id, revoked, "Password reset");
    Ok(())
}

pub async fn list_instructors<R: FullRepository + ?Sized>(repo: &R) -> ServiceResult<Vec<User>> {
    Ok(repo.list_users_by_role(UserRole::Instructor).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_BYTES * 2);
        let hash = hash_password("correct horse", &salt);
        assert!(verify_password("correct horse", &salt, &hash));
        assert!(!verify_password("wrong horse", &salt, &hash));
        assert!(!verify_password("correct horse", "other-salt", &hash));
    }

    #[test]
    fn test_otp_code_shape() {
        for _ in 0..50 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
