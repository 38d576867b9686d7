//! OAuth Credential Value Objects
//!
//! Wire types for the token endpoint response and the on-disk cache
//! blob. All five credential fields are opaque strings; the process
//! treats them as one atomic group (see the token store).

use serde::{Deserialize, Serialize};

/// The full five-field OAuth credential.
///
/// `Debug` redacts the secret-bearing fields for safe logging.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived bearer token sent with every streaming request.
    #[serde(default)]
    pub access_token: String,
    /// Bearer token lifetime, as reported by the endpoint (opaque).
    #[serde(default)]
    pub expires_in: String,
    /// Long-lived token exchanged for fresh bearer tokens.
    #[serde(default)]
    pub refresh_token: String,
    /// Token type reported by the endpoint (`Bearer`).
    #[serde(default)]
    pub token_type: String,
    /// Account identifier reported by the endpoint.
    #[serde(default)]
    pub userid: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("userid", &self.userid)
            .finish()
    }
}

/// The two volatile fields returned by a refresh-token exchange.
///
/// A refresh never replaces the refresh token itself.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefresh {
    /// New bearer token.
    #[serde(default)]
    pub access_token: String,
    /// New bearer token lifetime.
    #[serde(default)]
    pub expires_in: String,
}

impl std::fmt::Debug for TokenRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresh")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Persisted form of a [`Credential`].
///
/// The volatile fields are nulled before write; only the long-lived
/// refresh token survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
    /// Always `null` on disk.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Always `null` on disk.
    #[serde(default)]
    pub expires_in: Option<String>,
    /// Retained refresh token.
    #[serde(default)]
    pub refresh_token: String,
    /// Retained token type.
    #[serde(default)]
    pub token_type: String,
    /// Retained account identifier.
    #[serde(default)]
    pub userid: String,
}

impl CachedCredential {
    /// Build the on-disk form from a live credential, nulling the
    /// volatile fields.
    #[must_use]
    pub fn scrubbed_from(credential: &Credential) -> Self {
        Self {
            access_token: None,
            expires_in: None,
            refresh_token: credential.refresh_token.clone(),
            token_type: credential.token_type.clone(),
            userid: credential.userid.clone(),
        }
    }

    /// Whether the cache entry carries a usable refresh token.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }

    /// Rehydrate into a [`Credential`] with empty volatile fields.
    ///
    /// Any access token that leaked into the cache is discarded; it
    /// would be stale by the time the process restarts.
    #[must_use]
    pub fn into_credential(self) -> Credential {
        Credential {
            access_token: String::new(),
            expires_in: String::new(),
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            userid: self.userid,
        }
    }
}
