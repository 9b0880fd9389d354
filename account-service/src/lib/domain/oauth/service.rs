use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use super::models::AuthorizationRequest;
use super::models::LinkRequest;
use super::models::OAuthLink;
use super::models::OAuthOutcome;
use super::models::OAuthState;
use super::models::ProviderProfile;
use super::ports::OAuthPort;
use super::ports::OAuthStore;
use super::ports::ProviderAdapter;
use crate::domain::errors::AccountError;
use crate::domain::hooks::AfterHook;
use crate::domain::hooks::BeforeHook;
use crate::domain::hooks::HookDispatcher;
use crate::domain::user::models::AuthMethod;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::service::remove_orphaned_user;

pub const DEFAULT_STATE_TTL_SECS: i64 = 10 * 60;

/// Extension points of the OAuth authenticator.
#[derive(Clone, Default)]
pub struct OAuthHooks {
    pub before_link: Option<BeforeHook<LinkRequest>>,
    pub after_link: Option<AfterHook<OAuthOutcome>>,
    /// Fires for both sign-in and sign-up through the provider.
    pub after_auth: Option<AfterHook<OAuthOutcome>>,
}

/// Provider-agnostic OAuth login, sign-up and account linking.
///
/// One instance serves one provider adapter. The CSRF state issued by
/// [`OAuthPort::get_auth_url`] is single use and expires after the state TTL.
pub struct OAuthAuthenticator<S, P>
where
    S: OAuthStore,
    P: ProviderAdapter,
{
    store: Arc<S>,
    provider: P,
    state_ttl: Duration,
    verified_only: bool,
    hooks: OAuthHooks,
    dispatcher: HookDispatcher,
}

impl<S, P> OAuthAuthenticator<S, P>
where
    S: OAuthStore,
    P: ProviderAdapter,
{
    pub fn new(store: Arc<S>, provider: P) -> Self {
        Self {
            store,
            provider,
            state_ttl: Duration::seconds(DEFAULT_STATE_TTL_SECS),
            verified_only: true,
            hooks: OAuthHooks::default(),
            dispatcher: HookDispatcher::default(),
        }
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Accept provider emails the provider has not verified.
    pub fn with_verified_only(mut self, verified_only: bool) -> Self {
        self.verified_only = verified_only;
        self
    }

    pub fn with_hooks(mut self, hooks: OAuthHooks) -> Self {
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
            .map_err(|e| e.context("failed to load user"))?
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))
    }

    async fn consume_state(&self, state: &str) -> Result<(), AccountError> {
        let stored = self
            .store
            .consume_state(state)
            .await
            .map_err(|e| e.context("failed to consume oauth state"))?;

        match stored {
            Some(stored) if !stored.is_expired(Utc::now()) => Ok(()),
            Some(_) => {
                tracing::warn!(provider = self.provider.provider_id(), "Expired OAuth state");
                Err(AccountError::InvalidState)
            }
            None => {
                tracing::warn!(provider = self.provider.provider_id(), "Unknown OAuth state");
                Err(AccountError::InvalidState)
            }
        }
    }

    async fn link_to(
        &self,
        target: &UserId,
        profile: ProviderProfile,
    ) -> Result<OAuthOutcome, AccountError> {
        let provider = self.provider.provider_id();

        let existing = self
            .store
            .find_link(provider, &profile.provider_user_id)
            .await
            .map_err(|e| e.context("failed to look up oauth link"))?;

        if let Some(link) = existing {
            if link.user_id != *target {
                tracing::warn!(
                    provider,
                    user_id = %target,
                    linked_user_id = %link.user_id,
                    "Provider identity already linked to another user"
                );
                return Err(AccountError::ProviderLinked);
            }

            let user = self.load_user(target).await?;
            return Ok(OAuthOutcome {
                user,
                profile,
                created: false,
                linked: false,
            });
        }

        // One identity per provider per user
        let current = self
            .store
            .find_link_for_user(target, provider)
            .await
            .map_err(|e| e.context("failed to look up oauth link"))?;
        if current.is_some() {
            return Err(AccountError::ProviderLinked);
        }

        let request = LinkRequest {
            user_id: *target,
            provider: provider.to_string(),
            profile,
        };
        self.dispatcher
            .run_before("oauth link", self.hooks.before_link.as_ref(), &request)?;

        let user = self.load_user(target).await?;
        self.store
            .create_link(OAuthLink::new(user.id, provider, &request.profile.provider_user_id))
            .await
            .map_err(|e| e.context("failed to create oauth link"))?;

        tracing::info!(provider, user_id = %user.id, "Provider linked");

        let outcome = OAuthOutcome {
            user,
            profile: request.profile,
            created: false,
            linked: true,
        };

        self.dispatcher
            .dispatch_after("oauth link", self.hooks.after_link.as_ref(), outcome.clone());

        Ok(outcome)
    }

    async fn sign_in(
        &self,
        email: EmailAddress,
        profile: ProviderProfile,
    ) -> Result<OAuthOutcome, AccountError> {
        let provider = self.provider.provider_id();

        let existing = self
            .store
            .find_link(provider, &profile.provider_user_id)
            .await
            .map_err(|e| e.context("failed to look up oauth link"))?;

        if let Some(link) = existing {
            let user = self.load_user(&link.user_id).await?;
            tracing::debug!(provider, user_id = %user.id, "OAuth login succeeded");
            return Ok(OAuthOutcome {
                user,
                profile,
                created: false,
                linked: false,
            });
        }

        let registered = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| e.context("failed to look up user"))?;
        if let Some(user) = registered {
            tracing::warn!(
                provider,
                user_id = %user.id,
                "OAuth sign-in refused for email registered by another method"
            );
            return Err(AccountError::ProviderEmailInUse);
        }

        let candidate = User::new(email, AuthMethod::oauth(provider), profile.email_verified);
        let user = match self.store.create(candidate).await {
            Ok(user) => user,
            Err(AccountError::EmailAlreadyExists(_)) => {
                return Err(AccountError::ProviderEmailInUse);
            }
            Err(e) => return Err(e.context("failed to create user")),
        };

        let link = OAuthLink::new(user.id, provider, &profile.provider_user_id);
        if let Err(e) = self.store.create_link(link).await {
            remove_orphaned_user(self.store.as_ref(), &user, "oauth sign-up").await;
            return Err(e.context("failed to create oauth link"));
        }

        tracing::info!(
            provider,
            user_id = %user.id,
            auth_method = %user.auth_method,
            "User registered"
        );

        Ok(OAuthOutcome {
            user,
            profile,
            created: true,
            linked: false,
        })
    }
}

#[async_trait]
impl<S, P> OAuthPort for OAuthAuthenticator<S, P>
where
    S: OAuthStore,
    P: ProviderAdapter,
{
    fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    async fn get_auth_url(&self) -> Result<AuthorizationRequest, AccountError> {
        let state = auth::generate_secure_token();
        let expires_at = Utc::now() + self.state_ttl;

        self.store
            .store_state(OAuthState {
                state: state.clone(),
                expires_at,
            })
            .await
            .map_err(|e| e.context("failed to store oauth state"))?;

        Ok(AuthorizationRequest {
            url: self.provider.auth_url(&state),
            state,
            expires_at,
        })
    }

    async fn auth(
        &self,
        code: &str,
        state: &str,
        link_to: Option<&UserId>,
    ) -> Result<OAuthOutcome, AccountError> {
        self.consume_state(state).await?;

        let provider = self.provider.provider_id();
        let profile = self.provider.resolve_profile(code).await.map_err(|e| {
            tracing::warn!(provider, error = %e, "Profile resolution failed");
            AccountError::from(e)
        })?;

        let email = EmailAddress::new(&profile.email)?;
        if self.verified_only && !profile.email_verified {
            return Err(AccountError::UnverifiedEmail);
        }

        match link_to {
            Some(target) => self.link_to(target, profile).await,
            None => {
                let outcome = self.sign_in(email, profile).await?;
                self.dispatcher
                    .dispatch_after("oauth auth", self.hooks.after_auth.as_ref(), outcome.clone());
                Ok(outcome)
            }
        }
    }

    async fn unlink(&self, user_id: &UserId) -> Result<(), AccountError> {
        let provider = self.provider.provider_id();
        let removed = self
            .store
            .delete_link(user_id, provider)
            .await
            .map_err(|e| e.context("failed to delete oauth link"))?;

        if !removed {
            return Err(AccountError::NoProviderLink);
        }

        tracing::info!(provider, user_id = %user_id, "Provider unlinked");
        Ok(())
    }
}
