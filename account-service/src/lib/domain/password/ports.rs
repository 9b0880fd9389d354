use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::errors::AccountError;
use crate::domain::user::models::User;
use crate::domain::user::ports::CredentialRepository;
use crate::domain::user::ports::UserRepository;

/// Port for password-based authentication.
#[async_trait]
pub trait PasswordAuthPort: Send + Sync + 'static {
    /// Register a new password user.
    ///
    /// # Errors
    /// * `InvalidEmail` - Email is malformed
    /// * `WeakPassword` - Password violates the policy or is too common
    /// * `EmailAlreadyExists` - Email is already registered under any method
    /// * `Storage` - Storage operation failed
    async fn register(&self, email: &str, password: &str) -> Result<User, AccountError>;

    /// Verify an email/password pair.
    ///
    /// Every failure to authenticate is reported as the same
    /// `InvalidCredentials` value.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, missing hash, mismatch, or lookup failure
    /// * `Blocked` - The before-login hook vetoed the login
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError>;

    /// Issue a password-reset token for an existing user.
    ///
    /// Response timing is not equalized here; callers must do it.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this email
    async fn forgot_password(&self, email: &str) -> Result<PasswordResetToken, AccountError>;

    /// Set a new password using a reset token.
    ///
    /// # Errors
    /// * `WeakPassword` - New password violates the policy
    /// * `TokenInvalid` / `TokenExpired` - Token failed verification
    /// * `UserNotFound` - Token refers to a user that no longer exists
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError>;
}

/// Issued password-reset token.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Storage capabilities the password authenticator needs.
pub trait PasswordStore: UserRepository + CredentialRepository {}

impl<T> PasswordStore for T where T: UserRepository + CredentialRepository {}
