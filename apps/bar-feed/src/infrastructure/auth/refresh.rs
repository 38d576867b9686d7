//! Background Token Refresh
//!
//! Periodic refresh loop keeping the bearer token valid for the
//! process lifetime. The cadence depends on the last outcome: the
//! normal interval after success, a shortened interval after failure.
//! A failed refresh leaves the token store at its last-known-good
//! value; streaming sessions keep using that snapshot until the next
//! attempt lands.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::client::TokenClient;
use super::token_store::TokenStore;
use crate::infrastructure::config::RefreshSettings;

/// Cancellable background refresh loop.
///
/// Not started until bootstrap has produced a valid credential; runs
/// until the shutdown token fires.
pub struct RefreshScheduler {
    client: Arc<TokenClient>,
    store: Arc<TokenStore>,
    settings: RefreshSettings,
    cancel: CancellationToken,
}

impl RefreshScheduler {
    /// Create a scheduler over the shared store.
    #[must_use]
    pub const fn new(
        client: Arc<TokenClient>,
        store: Arc<TokenStore>,
        settings: RefreshSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            store,
            settings,
            cancel,
        }
    }

    /// Run the refresh loop until cancelled.
    pub async fn run(self) {
        let mut delay = self.settings.interval;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Token refresh loop cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            let refresh_token = self.store.snapshot().refresh_token;
            match self.client.refresh(&refresh_token).await {
                Ok(refresh) => {
                    self.store.apply_refresh(&refresh);
                    delay = self.settings.interval;
                    tracing::info!(
                        next_secs = delay.as_secs(),
                        "Bearer token refreshed"
                    );
                }
                Err(e) => {
                    delay = self.settings.retry_interval;
                    tracing::warn!(
                        error = %e,
                        retry_secs = delay.as_secs(),
                        "Token refresh failed, keeping last-known-good credential"
                    );
                }
            }
        }
    }
}
