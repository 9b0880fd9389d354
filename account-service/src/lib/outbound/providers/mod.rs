//! OAuth2 provider adapters over `reqwest`.

pub mod github;
pub mod google;

use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;

use crate::config::OAuthClientConfig;
use crate::domain::errors::ProviderError;

pub use github::GitHubProvider;
pub use google::GoogleProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("account-service/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for provider calls.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub(crate) fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

/// Build an authorization URL for the standard code flow.
pub(crate) fn authorization_url(
    endpoint: &str,
    client: &OAuthClientConfig,
    scope: &str,
    state: &str,
) -> String {
    let params = [
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", client.redirect_url.as_str()),
        ("response_type", "code"),
        ("scope", scope),
        ("state", state),
    ];

    match Url::parse_with_params(endpoint, &params) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::error!(endpoint, error = %e, "Invalid authorization endpoint");
            endpoint.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchange an authorization code for an access token.
pub(crate) async fn exchange_code(
    http: &Client,
    token_url: &str,
    client: &OAuthClientConfig,
    code: &str,
) -> Result<String, ProviderError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", client.client_id.as_str()),
        ("client_secret", client.client_secret.as_str()),
        ("redirect_uri", client.redirect_url.as_str()),
    ];

    let response = http
        .post(token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    parse_token_response(status, &body)
}

/// Interpret a token endpoint reply.
///
/// Google signals a bad code with a 400, GitHub with a 200 carrying an
/// `error` field. Both end up as `InvalidCode`.
pub(crate) fn parse_token_response(
    status: StatusCode,
    body: &str,
) -> Result<String, ProviderError> {
    if status.is_server_error() {
        return Err(ProviderError::Transport(format!("token endpoint returned {}", status)));
    }

    let reply: TokenResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::UnexpectedResponse(format!("token endpoint returned {}: {}", status, e))
    })?;

    if let Some(error) = reply.error {
        let detail = match reply.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        return Err(ProviderError::InvalidCode(detail));
    }

    if status.is_client_error() {
        return Err(ProviderError::InvalidCode(format!("token endpoint returned {}", status)));
    }

    reply
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ProviderError::UnexpectedResponse("missing access_token".to_string()))
}

/// Fetch a JSON document with a bearer token.
pub(crate) async fn get_json<T>(
    http: &Client,
    url: &str,
    access_token: &str,
) -> Result<T, ProviderError>
where
    T: serde::de::DeserializeOwned,
{
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::UnexpectedResponse(format!("{} returned {}", url, status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))
}
