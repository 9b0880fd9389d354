use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenSigner;
use chrono::Duration;
use chrono::Utc;

use crate::domain::errors::AccountError;
use crate::domain::hooks::AfterHook;
use crate::domain::hooks::BeforeHook;
use crate::domain::hooks::HookDispatcher;
use crate::domain::tokens;
use crate::domain::tokens::EmailChangeClaims;
use crate::domain::user::models::AccountChange;
use crate::domain::user::models::AccountUpdate;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::EmailChangeRequest;
use crate::domain::user::ports::UserManagerPort;
use crate::domain::user::ports::UserManagerStore;
use crate::domain::user::ports::UserRepository;
use crate::domain::validation::PasswordPolicy;

pub const DEFAULT_EMAIL_CHANGE_TTL_SECS: i64 = 60 * 60;

/// Delete a user whose creation could not be completed.
///
/// Failure here is logged and swallowed: the caller is already returning the
/// error that triggered the cleanup and must not have it masked.
pub(crate) async fn remove_orphaned_user<R>(repository: &R, user: &User, operation: &'static str)
where
    R: UserRepository + ?Sized,
{
    match repository.delete(&user.id).await {
        Ok(()) => {
            tracing::warn!(operation, user_id = %user.id, "Removed partially created user");
        }
        Err(e) => {
            tracing::error!(
                operation,
                user_id = %user.id,
                error = %e,
                "Failed to remove partially created user"
            );
        }
    }
}

/// Extension points of the user manager.
#[derive(Clone, Default)]
pub struct UserManagerHooks {
    pub before_update: Option<BeforeHook<AccountUpdate>>,
    pub after_update: Option<AfterHook<AccountUpdate>>,
}

/// Self-service account mutations for authenticated users.
pub struct UserManager<S>
where
    S: UserManagerStore,
{
    store: Arc<S>,
    signer: Arc<TokenSigner>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    email_change_ttl: Duration,
    hooks: UserManagerHooks,
    dispatcher: HookDispatcher,
}

impl<S> UserManager<S>
where
    S: UserManagerStore,
{
    pub fn new(store: Arc<S>, signer: Arc<TokenSigner>) -> Self {
        Self {
            store,
            signer,
            hasher: PasswordHasher::new(),
            policy: PasswordPolicy::default(),
            email_change_ttl: Duration::seconds(DEFAULT_EMAIL_CHANGE_TTL_SECS),
            hooks: UserManagerHooks::default(),
            dispatcher: HookDispatcher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_email_change_ttl(mut self, ttl: Duration) -> Self {
        self.email_change_ttl = ttl;
        self
    }

    pub fn with_hooks(mut self, hooks: UserManagerHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: HookDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, AccountError> {
        self.store
            .find_by_id(user_id)
            .await
            .map_err(|e| e.context("failed to look up user"))?
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))
    }

    /// Check `password` against the stored hash.
    ///
    /// A user without a password (magic link, OAuth) never matches.
    async fn verify_password(&self, user_id: &UserId, password: &str) -> Result<(), AccountError> {
        let hash = self
            .store
            .get_password_hash(user_id)
            .await
            .map_err(|e| e.context("failed to load password hash"))?
            .ok_or(AccountError::InvalidCredentials)?;

        if self.hasher.verify(password, &hash)? {
            Ok(())
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    async fn ensure_email_available(
        &self,
        email: &EmailAddress,
        user_id: &UserId,
    ) -> Result<(), AccountError> {
        let owner = self
            .store
            .find_by_email(email)
            .await
            .map_err(|e| e.context("failed to look up user"))?;

        match owner {
            Some(other) if other.id != *user_id => {
                Err(AccountError::EmailAlreadyExists(email.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<S> UserManagerPort for UserManager<S>
where
    S: UserManagerStore,
{
    async fn get_user(&self, user_id: &UserId) -> Result<User, AccountError> {
        self.load_user(user_id).await
    }

    async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let user = self.load_user(user_id).await?;
        self.verify_password(&user.id, old_password).await?;
        self.policy.validate(new_password)?;

        let update = AccountUpdate {
            user_id: user.id,
            change: AccountChange::Password,
        };
        self.dispatcher
            .run_before("password change", self.hooks.before_update.as_ref(), &update)?;

        let hash = self.hasher.hash(new_password)?;
        self.store
            .set_password_hash(&user.id, &hash)
            .await
            .map_err(|e| e.context("failed to store password hash"))?;

        tracing::info!(user_id = %user.id, "Password changed");

        self.dispatcher
            .dispatch_after("password change", self.hooks.after_update.as_ref(), update);

        Ok(())
    }

    async fn request_email_change(
        &self,
        user_id: &UserId,
        new_email: &str,
        current_password: &str,
    ) -> Result<EmailChangeRequest, AccountError> {
        let new_email = EmailAddress::new(new_email)?;
        let user = self.load_user(user_id).await?;

        if new_email == user.email {
            return Err(AccountError::EmailUnchanged);
        }

        self.ensure_email_available(&new_email, &user.id).await?;
        self.verify_password(&user.id, current_password).await?;

        let expires_at = Utc::now() + self.email_change_ttl;
        let claims = EmailChangeClaims::new(
            user.id.to_string(),
            user.email.to_string(),
            new_email.to_string(),
            expires_at,
        );
        let token = tokens::issue(self.signer.as_ref(), &claims)?;

        tracing::info!(user_id = %user.id, %expires_at, "Email change requested");

        Ok(EmailChangeRequest {
            token,
            new_email,
            expires_at,
        })
    }

    async fn confirm_email_change(&self, token: &str) -> Result<User, AccountError> {
        let claims: EmailChangeClaims = tokens::verify(self.signer.as_ref(), token, Utc::now())?;
        let user_id =
            UserId::from_string(&claims.user_id).map_err(|_| AccountError::TokenInvalid)?;
        let new_email =
            EmailAddress::new(&claims.new_email).map_err(|_| AccountError::TokenInvalid)?;

        let user = self.load_user(&user_id).await?;

        // Tokens are bound to the address they were issued against, so one
        // cannot be replayed once the email has moved on.
        if user.email.as_str() != claims.old_email {
            tracing::warn!(user_id = %user.id, "Stale email change token rejected");
            return Err(AccountError::TokenInvalid);
        }

        self.ensure_email_available(&new_email, &user.id).await?;

        let update = AccountUpdate {
            user_id: user.id,
            change: AccountChange::Email {
                old: user.email.clone(),
                new: new_email.clone(),
            },
        };
        self.dispatcher
            .run_before("email change", self.hooks.before_update.as_ref(), &update)?;

        // Delivery to the new address proves control of it, so the store
        // also marks the user verified
        let updated = self
            .store
            .change_email(&user.id, &user.email, &new_email)
            .await
            .map_err(|e| e.context("failed to update user"))?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user.id, "Email changed concurrently, token rejected");
                AccountError::TokenInvalid
            })?;

        tracing::info!(user_id = %updated.id, "Email changed");

        self.dispatcher
            .dispatch_after("email change", self.hooks.after_update.as_ref(), update);

        Ok(updated)
    }
}
