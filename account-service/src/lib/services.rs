use std::sync::Arc;

use auth::HashingParams;
use auth::PasswordHasher;
use auth::TokenSigner;

use crate::config::AccountConfig;
use crate::domain::errors::AccountError;
use crate::domain::hooks::HookDispatcher;
use crate::domain::magic_link::ports::MagicLinkStore;
use crate::domain::magic_link::service::MagicLinkAuthenticator;
use crate::domain::oauth::ports::OAuthStore;
use crate::domain::oauth::ports::ProviderAdapter;
use crate::domain::oauth::service::OAuthAuthenticator;
use crate::domain::password::ports::PasswordStore;
use crate::domain::password::service::PasswordAuthenticator;
use crate::domain::user::ports::UserManagerStore;
use crate::domain::user::service::UserManager;
use crate::outbound::providers::GitHubProvider;
use crate::outbound::providers::GoogleProvider;

/// Every account service wired from one configuration and one store.
///
/// Hooks are left empty; attach them with the services' `with_hooks`.
pub struct AccountServices<S>
where
    S: PasswordStore + MagicLinkStore + OAuthStore + UserManagerStore,
{
    pub password: PasswordAuthenticator<S>,
    pub magic_link: MagicLinkAuthenticator<S>,
    pub users: UserManager<S>,
    pub google: Option<OAuthAuthenticator<S, GoogleProvider>>,
    pub github: Option<OAuthAuthenticator<S, GitHubProvider>>,
}

impl<S> AccountServices<S>
where
    S: PasswordStore + MagicLinkStore + OAuthStore + UserManagerStore,
{
    /// # Errors
    /// * `Config` - `config` fails `AccountConfig::validate`
    /// * `Hashing` - Hashing parameters are rejected by Argon2
    pub fn build(store: Arc<S>, config: &AccountConfig) -> Result<Self, AccountError> {
        config.validate()?;

        let signer = Arc::new(TokenSigner::new(config.tokens.secret.as_bytes()));
        let hasher = PasswordHasher::with_params(HashingParams::from(config.hashing))?;
        let dispatcher = HookDispatcher::new(config.hooks.timeout());

        let password = PasswordAuthenticator::new(Arc::clone(&store), Arc::clone(&signer))
            .with_hasher(hasher.clone())
            .with_policy(config.password.clone())
            .with_reset_ttl(config.tokens.password_reset_ttl())
            .with_dispatcher(dispatcher);

        let magic_link = MagicLinkAuthenticator::new(Arc::clone(&store), Arc::clone(&signer))
            .with_ttl(config.tokens.magic_link_ttl())
            .with_dispatcher(dispatcher);

        let users = UserManager::new(Arc::clone(&store), Arc::clone(&signer))
            .with_hasher(hasher)
            .with_policy(config.password.clone())
            .with_email_change_ttl(config.tokens.email_change_ttl())
            .with_dispatcher(dispatcher);

        let google = config
            .oauth
            .google
            .clone()
            .map(|client| oauth(&store, GoogleProvider::new(client), config, dispatcher));
        let github = config
            .oauth
            .github
            .clone()
            .map(|client| oauth(&store, GitHubProvider::new(client), config, dispatcher));

        tracing::info!(
            google = google.is_some(),
            github = github.is_some(),
            verified_only = config.oauth.verified_only,
            "Account services configured"
        );

        Ok(Self {
            password,
            magic_link,
            users,
            google,
            github,
        })
    }
}

/// OAuth authenticator for any adapter, including custom ones.
pub fn oauth<S, P>(
    store: &Arc<S>,
    provider: P,
    config: &AccountConfig,
    dispatcher: HookDispatcher,
) -> OAuthAuthenticator<S, P>
where
    S: OAuthStore,
    P: ProviderAdapter,
{
    OAuthAuthenticator::new(Arc::clone(store), provider)
        .with_state_ttl(config.oauth.state_ttl())
        .with_verified_only(config.oauth.verified_only)
        .with_dispatcher(dispatcher)
}
