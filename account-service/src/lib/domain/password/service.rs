use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenSigner;
use chrono::Duration;
use chrono::Utc;

use super::ports::PasswordAuthPort;
use super::ports::PasswordResetToken;
use super::ports::PasswordStore;
use crate::domain::errors::AccountError;
use crate::domain::hooks::AfterHook;
use crate::domain::hooks::BeforeHook;
use crate::domain::hooks::HookDispatcher;
use crate::domain::tokens;
use crate::domain::tokens::PasswordResetClaims;
use crate::domain::user::models::AuthMethod;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::service::remove_orphaned_user;
use crate::domain::validation::PasswordPolicy;

pub const DEFAULT_RESET_TTL_SECS: i64 = 60 * 60;

/// Extension points of the password authenticator.
#[derive(Clone, Default)]
pub struct PasswordHooks {
    pub after_register: Option<AfterHook<User>>,
    pub before_login: Option<BeforeHook<User>>,
    pub after_login: Option<AfterHook<User>>,
}

/// Registration, login and password reset for password users.
///
/// Immutable once built; safe to share across tasks behind an `Arc`.
pub struct PasswordAuthenticator<S>
where
    S: PasswordStore,
{
    store: Arc<S>,
    signer: Arc<TokenSigner>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    reset_ttl: Duration,
    hooks: PasswordHooks,
    dispatcher: HookDispatcher,
}

impl<S> PasswordAuthenticator<S>
where
    S: PasswordStore,
{
    /// Create an authenticator with default policy, hashing and TTL.
    pub fn new(store: Arc<S>, signer: Arc<TokenSigner>) -> Self {
        Self {
            store,
            signer,
            hasher: PasswordHasher::new(),
            policy: PasswordPolicy::default(),
            reset_ttl: Duration::seconds(DEFAULT_RESET_TTL_SECS),
            hooks: PasswordHooks::default(),
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

    /// Lifetime of issued password-reset tokens.
    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    pub fn with_hooks(mut self, hooks: PasswordHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: HookDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Resolve the user a login attempt targets, hiding why it failed.
    async fn verify_credentials(&self, email: &str, password: &str) -> Option<User> {
        let email = EmailAddress::new(email).ok()?;

        let user = match self.store.find_by_email(&email).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed during login");
                return None;
            }
        };

        let hash = match self.store.get_password_hash(&user.id).await {
            Ok(Some(hash)) => hash,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Password hash lookup failed");
                return None;
            }
        };

        match self.hasher.verify(password, &hash) {
            Ok(true) => Some(user),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash unusable");
                None
            }
        }
    }
}

#[async_trait]
impl<S> PasswordAuthPort for PasswordAuthenticator<S>
where
    S: PasswordStore,
{
    async fn register(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = EmailAddress::new(email)?;
        self.policy.validate(password)?;

        let existing = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| e.context("failed to look up user"))?;
        if existing.is_some() {
            return Err(AccountError::EmailAlreadyExists(email.to_string()));
        }

        let hash = self.hasher.hash(password)?;

        let user = self
            .store
            .create(User::new(email, AuthMethod::Password, false))
            .await
            .map_err(|e| e.context("failed to create user"))?;

        if let Err(e) = self.store.set_password_hash(&user.id, &hash).await {
            remove_orphaned_user(self.store.as_ref(), &user, "register").await;
            return Err(e.context("failed to store password hash"));
        }

        tracing::info!(user_id = %user.id, auth_method = %user.auth_method, "User registered");

        self.dispatcher
            .dispatch_after("register", self.hooks.after_register.as_ref(), user.clone());

        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .verify_credentials(email, password)
            .await
            .ok_or(AccountError::InvalidCredentials)?;

        self.dispatcher
            .run_before("login", self.hooks.before_login.as_ref(), &user)?;

        tracing::debug!(user_id = %user.id, "Password login succeeded");

        self.dispatcher
            .dispatch_after("login", self.hooks.after_login.as_ref(), user.clone());

        Ok(user)
    }

    async fn forgot_password(&self, email: &str) -> Result<PasswordResetToken, AccountError> {
        let email = EmailAddress::new(email)?;

        let user = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| e.context("failed to look up user"))?
            .ok_or_else(|| AccountError::UserNotFound(email.to_string()))?;

        let expires_at = Utc::now() + self.reset_ttl;
        let claims =
            PasswordResetClaims::new(user.id.to_string(), user.email.to_string(), expires_at);
        let token = tokens::issue(self.signer.as_ref(), &claims)?;

        tracing::info!(user_id = %user.id, %expires_at, "Password reset token issued");

        Ok(PasswordResetToken {
            token,
            user,
            expires_at,
        })
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError> {
        self.policy.validate(new_password)?;

        let claims: PasswordResetClaims = tokens::verify(self.signer.as_ref(), token, Utc::now())?;
        let user_id =
            UserId::from_string(&claims.user_id).map_err(|_| AccountError::TokenInvalid)?;

        let user = self
            .store
            .find_by_id(&user_id)
            .await
            .map_err(|e| e.context("failed to look up user"))?
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))?;

        // A token addressed to a previous email must not outlive the change
        if user.email.as_str() != claims.email {
            return Err(AccountError::TokenInvalid);
        }

        let hash = self.hasher.hash(new_password)?;
        self.store
            .set_password_hash(&user.id, &hash)
            .await
            .map_err(|e| e.context("failed to store password hash"))?;

        tracing::info!(user_id = %user.id, "Password reset completed");

        Ok(())
    }
}
