use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::errors::AccountError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Port for authenticated-user self-service operations.
#[async_trait]
pub trait UserManagerPort: Send + Sync + 'static {
    /// Retrieve a user by identifier.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `Storage` - Storage operation failed
    async fn get_user(&self, user_id: &UserId) -> Result<User, AccountError>;

    /// Replace the password after verifying the current one.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `InvalidCredentials` - `old_password` does not match
    /// * `WeakPassword` - `new_password` violates the password policy
    /// * `Blocked` - The before-update hook vetoed the change
    /// * `Storage` - Storage operation failed
    async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError>;

    /// First phase of an email change: issue a confirmation token.
    ///
    /// # Errors
    /// * `InvalidEmail` - New email is malformed
    /// * `EmailUnchanged` - New email normalizes to the current one
    /// * `EmailAlreadyExists` - New email belongs to another user
    /// * `InvalidCredentials` - `current_password` does not match
    async fn request_email_change(
        &self,
        user_id: &UserId,
        new_email: &str,
        current_password: &str,
    ) -> Result<EmailChangeRequest, AccountError>;

    /// Second phase of an email change: commit it.
    ///
    /// # Errors
    /// * `TokenInvalid` - Bad token, or the user's email changed since issuance
    /// * `TokenExpired` - Token is past its expiry
    /// * `EmailAlreadyExists` - New email was claimed in the meantime
    /// * `Blocked` - The before-update hook vetoed the change
    async fn confirm_email_change(&self, token: &str) -> Result<User, AccountError>;
}

/// Issued email-change confirmation, to be delivered to the new address.
#[derive(Debug, Clone)]
pub struct EmailChangeRequest {
    pub token: String,
    pub new_email: EmailAddress,
    pub expires_at: DateTime<Utc>,
}

/// Persistence operations for the user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// Must check email uniqueness and insert atomically.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Storage` - Storage operation failed
    async fn create(&self, user: User) -> Result<User, AccountError>;

    /// Retrieve user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError>;

    /// Retrieve user by normalized email address.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError>;

    /// Set the verified flag, leaving every other field as stored.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `Storage` - Storage operation failed
    async fn mark_verified(&self, id: &UserId) -> Result<User, AccountError>;

    /// Move a user from `current` to `new` and mark them verified.
    ///
    /// Compare-and-set: returns `None` without writing when the stored email
    /// is no longer `current`.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `EmailAlreadyExists` - New email is already registered to someone else
    /// * `Storage` - Storage operation failed
    async fn change_email(
        &self,
        id: &UserId,
        current: &EmailAddress,
        new: &EmailAddress,
    ) -> Result<Option<User>, AccountError>;

    /// Remove a user.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `Storage` - Storage operation failed
    async fn delete(&self, id: &UserId) -> Result<(), AccountError>;
}

/// Password hash storage, kept apart from the user record.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, AccountError>;

    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), AccountError>;
}

/// Storage capabilities the user manager needs.
pub trait UserManagerStore: UserRepository + CredentialRepository {}

impl<T> UserManagerStore for T where T: UserRepository + CredentialRepository {}
