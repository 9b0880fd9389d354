use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenSigner;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use super::ports::MagicLink;
use super::ports::MagicLinkPort;
use super::ports::MagicLinkStore;
use crate::domain::errors::AccountError;
use crate::domain::hooks::AfterHook;
use crate::domain::hooks::BeforeHook;
use crate::domain::hooks::HookDispatcher;
use crate::domain::tokens;
use crate::domain::tokens::MagicLinkClaims;
use crate::domain::user::models::AuthMethod;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;

pub const DEFAULT_MAGIC_LINK_TTL_SECS: i64 = 15 * 60;

/// Extension points of the magic-link authenticator.
#[derive(Clone, Default)]
pub struct MagicLinkHooks {
    /// Receives every issued link; this is where delivery usually happens.
    pub after_generate: Option<AfterHook<MagicLink>>,
    pub before_verify: Option<BeforeHook<User>>,
    pub after_verify: Option<AfterHook<User>>,
}

/// Passwordless login by emailed single-use link.
///
/// Unknown addresses are registered on request as unverified `magic_link`
/// users; redeeming the link verifies them.
pub struct MagicLinkAuthenticator<S>
where
    S: MagicLinkStore,
{
    store: Arc<S>,
    signer: Arc<TokenSigner>,
    ttl: Duration,
    hooks: MagicLinkHooks,
    dispatcher: HookDispatcher,
}

impl<S> MagicLinkAuthenticator<S>
where
    S: MagicLinkStore,
{
    pub fn new(store: Arc<S>, signer: Arc<TokenSigner>) -> Self {
        Self {
            store,
            signer,
            ttl: Duration::seconds(DEFAULT_MAGIC_LINK_TTL_SECS),
            hooks: MagicLinkHooks::default(),
            dispatcher: HookDispatcher::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_hooks(mut self, hooks: MagicLinkHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: HookDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Find the user for `email`, registering one on first contact.
    async fn find_or_register(&self, email: EmailAddress) -> Result<User, AccountError> {
        if let Some(user) = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| e.context("failed to look up user"))?
        {
            return Ok(user);
        }

        let candidate = User::new(email.clone(), AuthMethod::MagicLink, false);
        match self.store.create(candidate).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, auth_method = %user.auth_method, "User registered");
                Ok(user)
            }
            // Lost a registration race; the winner's record is the one to use
            Err(AccountError::EmailAlreadyExists(_)) => self
                .store
                .find_by_email(&email)
                .await
                .map_err(|e| e.context("failed to look up user"))?
                .ok_or_else(|| AccountError::UserNotFound(email.to_string())),
            Err(e) => Err(e.context("failed to create user")),
        }
    }
}

#[async_trait]
impl<S> MagicLinkPort for MagicLinkAuthenticator<S>
where
    S: MagicLinkStore,
{
    async fn request_magic_link(&self, email: &str) -> Result<MagicLink, AccountError> {
        let email = EmailAddress::new(email)?;
        let user = self.find_or_register(email).await?;

        let token_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;
        let claims = MagicLinkClaims::new(token_id.clone(), user.email.to_string(), expires_at);
        let token = tokens::issue(self.signer.as_ref(), &claims)?;

        tracing::info!(user_id = %user.id, %token_id, %expires_at, "Magic link issued");

        let link = MagicLink {
            token,
            token_id,
            user,
            expires_at,
        };

        self.dispatcher
            .dispatch_after("magic link", self.hooks.after_generate.as_ref(), link.clone());

        Ok(link)
    }

    async fn verify_magic_link(&self, token: &str) -> Result<User, AccountError> {
        let claims: MagicLinkClaims = tokens::verify(self.signer.as_ref(), token, Utc::now())?;
        let email = EmailAddress::new(&claims.email).map_err(|_| AccountError::TokenInvalid)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AccountError::TokenInvalid)?;

        let user = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| e.context("failed to look up user"))?
            .ok_or_else(|| AccountError::UserNotFound(email.to_string()))?;

        self.dispatcher
            .run_before("magic link login", self.hooks.before_verify.as_ref(), &user)?;

        let first_use = self
            .store
            .consume_token_id(&claims.jti, expires_at)
            .await
            .map_err(|e| e.context("failed to record magic link use"))?;
        if !first_use {
            tracing::warn!(user_id = %user.id, token_id = %claims.jti, "Magic link replay rejected");
            return Err(AccountError::TokenInvalid);
        }

        let user = if user.is_verified {
            user
        } else {
            match self.store.mark_verified(&user.id).await {
                Ok(updated) => updated,
                Err(e) => {
                    // Login still succeeds; the flag is retried on the next link
                    tracing::error!(user_id = %user.id, error = %e, "Failed to mark user verified");
                    user
                }
            }
        };

        tracing::debug!(user_id = %user.id, "Magic link login succeeded");

        self.dispatcher
            .dispatch_after("magic link login", self.hooks.after_verify.as_ref(), user.clone());

        Ok(user)
    }
}
