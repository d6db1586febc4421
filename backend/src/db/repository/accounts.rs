//! Account repository trait: users, OTP codes, sessions and documents.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    Document, NewDocument, NewUser, Otp, OtpPurpose, Session, User, UserId, UserRole,
};

/// Repository trait for account data.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust and allow
/// sharing across request handlers.
#[async_trait]
pub trait UserRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the storage backend is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Users ====================

    /// Store a new user.
    ///
    /// Emails are compared case-insensitively; callers pass them lowercased.
    ///
    /// # Returns
    /// * `Ok(User)` - The stored user with its assigned ID
    /// * `Err(RepositoryError::Conflict)` - If the email is already registered
    async fn create_user(&self, user: NewUser) -> RepositoryResult<User>;

    /// Retrieve a user by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no such user exists
    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User>;

    /// Look up a user by (lowercased) email.
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// List users holding `role`, ordered by ID.
    async fn list_users_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>>;

    /// Replace the mutable fields (name, phone, verified, password) of a user.
    async fn update_user(&self, user: &User) -> RepositoryResult<User>;

    // ==================== One-time passwords ====================

    /// Store an OTP, replacing any existing code for the same email and purpose.
    async fn store_otp(&self, otp: Otp) -> RepositoryResult<()>;

    /// Fetch the current OTP for an email and purpose, consumed or not.
    async fn find_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>>;

    /// Mark the current OTP for an email and purpose as consumed.
    ///
    /// # Returns
    /// * `Ok(true)` if a live code was consumed, `Ok(false)` if none was stored
    async fn consume_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<bool>;

    /// Count a wrong guess against the current OTP. The code is consumed once
    /// `max_attempts` guesses have failed.
    ///
    /// # Returns
    /// * `Ok(attempts)` - Failed attempts recorded so far, `0` if no code is stored
    async fn record_otp_failure(
        &self,
        email: &str,
        purpose: OtpPurpose,
        max_attempts: i32,
    ) -> RepositoryResult<i32>;

    // ==================== Sessions ====================

    async fn create_session(&self, session: Session) -> RepositoryResult<()>;

    async fn find_session(&self, token: &str) -> RepositoryResult<Option<Session>>;

    /// Delete a session. Deleting an unknown token is not an error.
    async fn delete_session(&self, token: &str) -> RepositoryResult<()>;

    /// Delete every session held by a user, returning how many were removed.
    async fn delete_user_sessions(&self, user_id: UserId) -> RepositoryResult<usize>;

    // ==================== Documents ====================

    async fn add_document(&self, document: NewDocument) -> RepositoryResult<Document>;

    /// List document metadata for a user, oldest first.
    async fn list_documents(&self, user_id: UserId) -> RepositoryResult<Vec<Document>>;
}
