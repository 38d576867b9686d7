//! Token Endpoint Client
//!
//! Performs the two exchanges against TradeStation's v2 token
//! endpoint: authorization-code for a full five-field credential, and
//! refresh-token for the two volatile fields.
//!
//! # Response envelope
//!
//! The endpoint occasionally wraps responses in a WCF contract
//! envelope (`"__type":"...#TradeStation.Web.Services.DataContracts"`)
//! that trips strict JSON deserialization; the body is scrubbed of it
//! before parsing.

use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

use crate::domain::credential::{Credential, TokenRefresh};
use crate::infrastructure::config::Credentials;

/// Request timeout for token endpoint POSTs.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// WCF contract artifact stripped from response bodies before parsing.
const RESPONSE_ENVELOPE_ARTIFACT: &str =
    "\"__type\":\"EquitiesOptionsOrderConfirmation:#TradeStation.Web.Services.DataContracts\",";

/// Errors from the token endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The authorization-code exchange was rejected; no credential
    /// exists and the process cannot proceed.
    #[error("authorization code exchange rejected with status {status}")]
    ExchangeRejected {
        /// HTTP status returned by the endpoint.
        status: u16,
    },

    /// The refresh exchange was rejected; the caller must leave the
    /// token store untouched.
    #[error("token refresh rejected with status {status}")]
    RefreshRejected {
        /// HTTP status returned by the endpoint.
        status: u16,
    },

    /// The request never produced a response.
    #[error("token endpoint transport error: {0}")]
    Transport(String),

    /// The response body did not deserialize as a credential.
    #[error("token response did not deserialize: {0}")]
    Deserialize(String),

    /// The configured endpoint URL is unusable.
    #[error("invalid token endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// Client for TradeStation's token endpoint.
pub struct TokenClient {
    http: Client,
    credentials: Credentials,
    redirect_uri: String,
    token_url: String,
    authorize_url: String,
}

impl TokenClient {
    /// Create a client against the given v2 API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        credentials: Credentials,
        redirect_uri: impl Into<String>,
        host_v2: &str,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            credentials,
            redirect_uri: redirect_uri.into(),
            token_url: format!("{host_v2}/security/authorize"),
            authorize_url: format!("{host_v2}/authorize"),
        })
    }

    /// Build the browser-navigated authorize URL.
    ///
    /// The operator opens this in a browser; the redirect back to the
    /// loopback listener delivers the one-time code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEndpoint`] if the configured host
    /// does not parse as a URL.
    pub fn authorize_url(&self) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.credentials.client_id()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| AuthError::InvalidEndpoint(e.to_string()))
    }

    /// Exchange a one-time authorization code for a full credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExchangeRejected`] on any non-2xx status;
    /// there is no retry path, the process cannot proceed without a
    /// credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.credentials.client_id()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_secret", self.credentials.client_secret()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Authorization code exchange failed");
            return Err(AuthError::ExchangeRejected {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        deserialize_scrubbed(&body)
    }

    /// Exchange the refresh token for fresh volatile fields.
    ///
    /// The refresh token itself is never replaced by this path.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-2xx status, timeout or transport
    /// fault; the caller must not mutate the token store in that case.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRefresh, AuthError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id()),
            ("client_secret", self.credentials.client_secret()),
            ("refresh_token", refresh_token),
            ("response_type", "token"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        deserialize_scrubbed(&body)
    }
}

impl std::fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient")
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Strip the vendor response envelope, then deserialize.
fn deserialize_scrubbed<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, AuthError> {
    let scrubbed = body.replace(RESPONSE_ENVELOPE_ARTIFACT, "");
    serde_json::from_str(&scrubbed).map_err(|e| AuthError::Deserialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TokenClient {
        TokenClient::new(
            Credentials::new("id".to_string(), "secret".to_string()),
            "http://localhost:1234/",
            "https://sim.api.tradestation.com/v2",
        )
        .unwrap()
    }

    #[test]
    fn authorize_url_carries_query_parameters() {
        let url = client().authorize_url().unwrap();
        assert!(url.as_str().starts_with("https://sim.api.tradestation.com/v2/authorize?"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "id".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:1234/".to_string()
        )));
    }

    #[test]
    fn envelope_artifact_is_scrubbed() {
        let body = format!(
            "{{{RESPONSE_ENVELOPE_ARTIFACT}\"access_token\":\"at\",\"expires_in\":\"1199\"}}"
        );
        let refresh: TokenRefresh = deserialize_scrubbed(&body).unwrap();
        assert_eq!(refresh.access_token, "at");
        assert_eq!(refresh.expires_in, "1199");
    }

    #[test]
    fn clean_body_passes_through() {
        let refresh: TokenRefresh =
            deserialize_scrubbed(r#"{"access_token":"at","expires_in":"1199"}"#).unwrap();
        assert_eq!(refresh.access_token, "at");
    }

    #[test]
    fn garbage_body_is_a_deserialize_error() {
        let result: Result<Credential, _> = deserialize_scrubbed("<html>oops</html>");
        assert!(matches!(result, Err(AuthError::Deserialize(_))));
    }
}
