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

pub const GOOGLE_PROVIDER_ID: &str = "google";

const SCOPE: &str = "openid email profile";

/// Google endpoints. Overridable for tests and proxies.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            userinfo: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

/// OpenID Connect userinfo document.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl TryFrom<GoogleUserInfo> for ProviderProfile {
    type Error = ProviderError;

    fn try_from(info: GoogleUserInfo) -> Result<Self, Self::Error> {
        let email = info
            .email
            .ok_or_else(|| ProviderError::UnexpectedResponse("userinfo has no email".to_string()))?;

        Ok(ProviderProfile {
            provider_user_id: info.sub,
            email,
            email_verified: info.email_verified,
            display_name: info.name,
            avatar_url: info.picture,
        })
    }
}

pub struct GoogleProvider {
    client: OAuthClientConfig,
    endpoints: GoogleEndpoints,
    http: Client,
}

impl GoogleProvider {
    pub fn new(client: OAuthClientConfig) -> Self {
        Self {
            client,
            endpoints: GoogleEndpoints::default(),
            http: http_client(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[async_trait]
impl ProviderAdapter for GoogleProvider {
    fn provider_id(&self) -> &str {
        GOOGLE_PROVIDER_ID
    }

    fn auth_url(&self, state: &str) -> String {
        authorization_url(&self.endpoints.authorize, &self.client, SCOPE, state)
    }

    async fn resolve_profile(&self, code: &str) -> Result<ProviderProfile, ProviderError> {
        let access_token =
            exchange_code(&self.http, &self.endpoints.token, &self.client, code).await?;

        let info: GoogleUserInfo =
            get_json(&self.http, &self.endpoints.userinfo, &access_token).await?;

        tracing::debug!(provider = GOOGLE_PROVIDER_ID, subject = %info.sub, "Profile resolved");

        ProviderProfile::try_from(info)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Url;

    use super::*;

    fn userinfo(json: &str) -> Result<ProviderProfile, ProviderError> {
        let info: GoogleUserInfo = serde_json::from_str(json).unwrap();
        ProviderProfile::try_from(info)
    }

    #[test]
    fn test_userinfo_to_profile() {
        let profile = userinfo(
            r#"{
                "sub": "110169484474386276334",
                "email": "Jane.Doe@gmail.com",
                "email_verified": true,
                "name": "Jane Doe",
                "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
                "locale": "en"
            }"#,
        )
        .unwrap();

        assert_eq!(profile.provider_user_id, "110169484474386276334");
        assert_eq!(profile.email, "Jane.Doe@gmail.com");
        assert!(profile.email_verified);
        assert_eq!(profile.display_name.as_deref(), Some("Jane Doe"));
        assert!(profile.avatar_url.is_some());
    }

    #[test]
    fn test_userinfo_missing_verified_flag_is_unverified() {
        let profile = userinfo(r#"{"sub": "1", "email": "a@x.com"}"#).unwrap();
        assert!(!profile.email_verified);
    }

    #[test]
    fn test_userinfo_without_email() {
        let err = userinfo(r#"{"sub": "1"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_auth_url_uses_configured_endpoint() {
        let provider = GoogleProvider::new(OAuthClientConfig {
            client_id: "google-client".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "https://app.test/oauth/google".to_string(),
        })
        .with_endpoints(GoogleEndpoints {
            authorize: "http://localhost:9000/auth".to_string(),
            ..GoogleEndpoints::default()
        });

        let url = Url::parse(&provider.auth_url("xyz")).unwrap();

        assert_eq!(url.port(), Some(9000));
        assert_eq!(url.path(), "/auth");
        assert!(url
            .query_pairs()
            .any(|(key, value)| key == "scope" && value == SCOPE));
        assert_eq!(provider.provider_id(), "google");
    }
}
