//! Startup Token Bootstrap
//!
//! Runs once, synchronously with respect to the rest of startup:
//! every streaming session is guaranteed a usable bearer token before
//! its first connection attempt.
//!
//! # Policy
//!
//! 1. Try the cached credential (refresh token only). If an immediate
//!    refresh against it succeeds, startup is done.
//! 2. Otherwise fall back to the interactive authorization-code flow:
//!    surface the authorize URL, wait for the loopback redirect,
//!    exchange the code, persist the result.
//!
//! Any failure of the interactive flow is fatal; the process cannot
//! proceed without a credential.

use thiserror::Error;

use super::client::{AuthError, TokenClient};
use super::token_store::TokenStore;
use crate::application::ports::{CacheError, CodeReceiver, CodeReceiverError, TokenCache};

/// Fatal startup errors; no usable credential exists.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The cache blob exists but is unreadable.
    #[error("token cache failure: {0}")]
    Cache(#[from] CacheError),

    /// The redirect listener failed before delivering a code.
    #[error("authorization code capture failed: {0}")]
    Code(#[from] CodeReceiverError),

    /// The token endpoint rejected the exchange.
    #[error("token acquisition failed: {0}")]
    Auth(#[from] AuthError),
}

/// Acquire an initial credential into `store`.
///
/// # Errors
///
/// Returns [`BootstrapError`] when neither the cached refresh token
/// nor the interactive flow produces a credential; callers must treat
/// that as fatal.
pub async fn bootstrap(
    client: &TokenClient,
    store: &TokenStore,
    cache: &dyn TokenCache,
    codes: &dyn CodeReceiver,
) -> Result<(), BootstrapError> {
    if let Some(cached) = cache.load()? {
        tracing::info!("Cached refresh token found, attempting silent refresh");
        store.update_all(cached.into_credential());

        let refresh_token = store.snapshot().refresh_token;
        match client.refresh(&refresh_token).await {
            Ok(refresh) => {
                store.apply_refresh(&refresh);
                tracing::info!("Silent refresh succeeded");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Silent refresh failed, falling back to browser flow");
            }
        }
    } else {
        tracing::info!("No cached credential, starting browser flow");
    }

    acquire_interactive(client, store, cache, codes).await
}

/// Full authorization-code flow: browser, redirect, exchange, persist.
async fn acquire_interactive(
    client: &TokenClient,
    store: &TokenStore,
    cache: &dyn TokenCache,
    codes: &dyn CodeReceiver,
) -> Result<(), BootstrapError> {
    let authorize_url = client.authorize_url()?;
    tracing::warn!(url = %authorize_url, "Open this URL in a browser to authorize the feed");

    let code = codes.wait_for_code().await?;
    let credential = client.exchange_code(&code).await?;

    if let Err(e) = cache.store(&credential) {
        // A failed cache write costs one browser flow on the next
        // start; it does not block this one.
        tracing::warn!(error = %e, "Failed to persist credential cache");
    }
    store.update_all(credential);
    tracing::info!("Credential acquired via authorization code");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockCodeReceiver, MockTokenCache};
    use crate::domain::credential::{CachedCredential, Credential};
    use crate::infrastructure::config::Credentials;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(host: &str) -> TokenClient {
        TokenClient::new(
            Credentials::new("id".to_string(), "secret".to_string()),
            "http://localhost:1234/",
            host,
        )
        .unwrap()
    }

    fn cached() -> CachedCredential {
        CachedCredential {
            access_token: None,
            expires_in: None,
            refresh_token: "rt-cached".to_string(),
            token_type: "Bearer".to_string(),
            userid: "trader1".to_string(),
        }
    }

    #[tokio::test]
    async fn cached_token_with_working_refresh_skips_browser_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/security/authorize"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-cached"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"at-fresh","expires_in":"1199"}"#,
            ))
            .mount(&server)
            .await;

        let mut cache = MockTokenCache::new();
        cache.expect_load().times(1).returning(|| Ok(Some(cached())));
        cache.expect_store().never();

        let mut codes = MockCodeReceiver::new();
        codes.expect_wait_for_code().never();

        let client = test_client(&server.uri());
        let store = TokenStore::default();
        bootstrap(&client, &store, &cache, &codes).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.access_token, "at-fresh");
        assert_eq!(snap.refresh_token, "rt-cached");
        assert_eq!(snap.userid, "trader1");
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_code_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/security/authorize"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/security/authorize"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=one-time"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"at-new","expires_in":"1199","refresh_token":"rt-new","token_type":"Bearer","userid":"trader1"}"#,
            ))
            .mount(&server)
            .await;

        let mut cache = MockTokenCache::new();
        cache.expect_load().times(1).returning(|| Ok(Some(cached())));
        cache
            .expect_store()
            .times(1)
            .withf(|c: &Credential| c.refresh_token == "rt-new")
            .returning(|_| Ok(()));

        let mut codes = MockCodeReceiver::new();
        codes
            .expect_wait_for_code()
            .times(1)
            .returning(|| Ok("one-time".to_string()));

        let client = test_client(&server.uri());
        let store = TokenStore::default();
        bootstrap(&client, &store, &cache, &codes).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.access_token, "at-new");
        assert_eq!(snap.refresh_token, "rt-new");
    }

    #[tokio::test]
    async fn empty_cache_goes_straight_to_code_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/security/authorize"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"at","expires_in":"1199","refresh_token":"rt","token_type":"Bearer","userid":"u"}"#,
            ))
            .mount(&server)
            .await;

        let mut cache = MockTokenCache::new();
        cache.expect_load().times(1).returning(|| Ok(None));
        cache.expect_store().times(1).returning(|_| Ok(()));

        let mut codes = MockCodeReceiver::new();
        codes
            .expect_wait_for_code()
            .times(1)
            .returning(|| Ok("c".to_string()));

        let client = test_client(&server.uri());
        let store = TokenStore::default();
        bootstrap(&client, &store, &cache, &codes).await.unwrap();
        assert_eq!(store.snapshot().access_token, "at");
    }

    #[tokio::test]
    async fn rejected_exchange_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/security/authorize"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let mut cache = MockTokenCache::new();
        cache.expect_load().times(1).returning(|| Ok(None));
        cache.expect_store().never();

        let mut codes = MockCodeReceiver::new();
        codes
            .expect_wait_for_code()
            .times(1)
            .returning(|| Ok("c".to_string()));

        let client = test_client(&server.uri());
        let store = TokenStore::default();
        let result = bootstrap(&client, &store, &cache, &codes).await;
        assert!(matches!(
            result,
            Err(BootstrapError::Auth(AuthError::ExchangeRejected { status: 400 }))
        ));
    }

    #[tokio::test]
    async fn corrupt_cache_is_fatal() {
        let mut cache = MockTokenCache::new();
        cache
            .expect_load()
            .times(1)
            .returning(|| Err(CacheError::Corrupt("bad blob".to_string())));

        let codes = MockCodeReceiver::new();
        let server = MockServer::start().await;
        let client = test_client(&server.uri());
        let store = TokenStore::default();

        let result = bootstrap(&client, &store, &cache, &codes).await;
        assert!(matches!(result, Err(BootstrapError::Cache(_))));
    }
}
