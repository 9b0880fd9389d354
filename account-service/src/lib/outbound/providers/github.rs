use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::authorization_url;
use super::exchange_code;
use super::get_json;
use super::http_client;
use crate::config::OAuthClientConfig;
use crate::domain::errors::ProviderError;
use crate::domain::oauth::models::ProviderProfile;
use crate::domain::oauth::ports::ProviderAdapter;

pub const GITHUB_PROVIDER_ID: &str = "github";

const SCOPE: &str = "read:user user:email";

/// GitHub endpoints. `api` is the REST base, e.g. for GitHub Enterprise.
#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    pub authorize: String,
    pub token: String,
    pub api: String,
}

impl Default for GitHubEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://github.com/login/oauth/authorize".to_string(),
            token: "https://github.com/login/oauth/access_token".to_string(),
            api: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Pick the address to trust from `/user/emails`.
///
/// Primary and verified wins, then any verified address, then the primary
/// one reported as unverified.
fn select_email(emails: Vec<GitHubEmail>) -> Option<(String, bool)> {
    let choice = emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .or_else(|| emails.iter().find(|e| e.primary))?;

    Some((choice.email.clone(), choice.verified))
}

fn into_profile(
    user: GitHubUser,
    emails: Vec<GitHubEmail>,
) -> Result<ProviderProfile, ProviderError> {
    let (email, email_verified) = select_email(emails).ok_or_else(|| {
        ProviderError::UnexpectedResponse("github account has no usable email".to_string())
    })?;

    Ok(ProviderProfile {
        provider_user_id: user.id.to_string(),
        email,
        email_verified,
        display_name: user.name.or(Some(user.login)),
        avatar_url: user.avatar_url,
    })
}

pub struct GitHubProvider {
    client: OAuthClientConfig,
    endpoints: GitHubEndpoints,
    http: Client,
}

impl GitHubProvider {
    pub fn new(client: OAuthClientConfig) -> Self {
        Self {
            client,
            endpoints: GitHubEndpoints::default(),
            http: http_client(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GitHubEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ProviderAdapter for GitHubProvider {
    fn provider_id(&self) -> &str {
        GITHUB_PROVIDER_ID
    }

    fn auth_url(&self, state: &str) -> String {
        authorization_url(&self.endpoints.authorize, &self.client, SCOPE, state)
    }

    async fn resolve_profile(&self, code: &str) -> Result<ProviderProfile, ProviderError> {
        let access_token =
            exchange_code(&self.http, &self.endpoints.token, &self.client, code).await?;

        let user: GitHubUser = get_json(&self.http, &self.api_url("/user"), &access_token).await?;
        let emails: Vec<GitHubEmail> =
            get_json(&self.http, &self.api_url("/user/emails"), &access_token).await?;

        tracing::debug!(
            provider = GITHUB_PROVIDER_ID,
            github_id = user.id,
            emails = emails.len(),
            "Profile resolved"
        );

        into_profile(user, emails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> GitHubUser {
        serde_json::from_str(
            r#"{
                "login": "octocat",
                "id": 583231,
                "avatar_url": "https://avatars.githubusercontent.com/u/583231",
                "name": null,
                "email": null
            }"#,
        )
        .unwrap()
    }

    fn emails(json: &str) -> Vec<GitHubEmail> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_profile_prefers_primary_verified_email() {
        let profile = into_profile(
            user(),
            emails(
                r#"[
                    {"email": "old@x.com", "primary": false, "verified": true, "visibility": null},
                    {"email": "octo@x.com", "primary": true, "verified": true, "visibility": "public"}
                ]"#,
            ),
        )
        .unwrap();

        assert_eq!(profile.provider_user_id, "583231");
        assert_eq!(profile.email, "octo@x.com");
        assert!(profile.email_verified);
        assert_eq!(profile.display_name.as_deref(), Some("octocat"));
    }

    #[test]
    fn test_profile_falls_back_to_verified_secondary() {
        let profile = into_profile(
            user(),
            emails(
                r#"[
                    {"email": "primary@x.com", "primary": true, "verified": false},
                    {"email": "work@x.com", "primary": false, "verified": true}
                ]"#,
            ),
        )
        .unwrap();

        assert_eq!(profile.email, "work@x.com");
        assert!(profile.email_verified);
    }

    #[test]
    fn test_profile_unverified_primary() {
        let profile = into_profile(
            user(),
            emails(r#"[{"email": "primary@x.com", "primary": true, "verified": false}]"#),
        )
        .unwrap();

        assert_eq!(profile.email, "primary@x.com");
        assert!(!profile.email_verified);
    }

    #[test]
    fn test_profile_without_emails() {
        let err = into_profile(user(), Vec::new()).unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_api_url_joins_base() {
        let provider = GitHubProvider::new(OAuthClientConfig {
            client_id: "gh".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "https://app.test/oauth/github".to_string(),
        })
        .with_endpoints(GitHubEndpoints {
            api: "https://ghe.corp.test/api/v3/".to_string(),
            ..GitHubEndpoints::default()
        });

        assert_eq!(provider.api_url("/user"), "https://ghe.corp.test/api/v3/user");
        assert!(provider
            .auth_url("s1")
            .starts_with("https://github.com/login/oauth/authorize?"));
    }
}
