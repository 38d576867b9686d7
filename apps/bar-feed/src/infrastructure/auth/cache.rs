//! On-Disk Token Cache
//!
//! Persists the credential as a single `settings.json` text blob so a
//! restart can skip the interactive browser flow. The volatile fields
//! (`access_token`, `expires_in`) are nulled before write; only the
//! long-lived refresh token is worth keeping.

use std::path::{Path, PathBuf};

use crate::application::ports::{CacheError, TokenCache};
use crate::domain::credential::{CachedCredential, Credential};

/// Default cache file name, next to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "settings.json";

/// File-backed [`TokenCache`] adapter.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    /// Create a cache at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a cache at the default location.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Result<Option<CachedCredential>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let blob = std::fs::read_to_string(&self.path)?;
        if blob.trim().is_empty() {
            return Ok(None);
        }

        let cached: CachedCredential =
            serde_json::from_str(&blob).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        if cached.has_refresh_token() {
            Ok(Some(cached))
        } else {
            Ok(None)
        }
    }

    fn store(&self, credential: &Credential) -> Result<(), CacheError> {
        let cached = CachedCredential::scrubbed_from(credential);
        let blob = serde_json::to_string(&cached)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        // Write-then-rename so a crash mid-write can never leave a
        // truncated blob where the next bootstrap expects JSON.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_credential() -> Credential {
        Credential {
            access_token: "at-1".to_string(),
            expires_in: "1199".to_string(),
            refresh_token: "rt-1".to_string(),
            token_type: "Bearer".to_string(),
            userid: "trader1".to_string(),
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path().join("settings.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn store_nulls_volatile_fields_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path().join("settings.json"));
        cache.store(&sample_credential()).unwrap();

        let blob = std::fs::read_to_string(cache.path()).unwrap();
        assert!(blob.contains(r#""access_token":null"#));
        assert!(blob.contains(r#""expires_in":null"#));
        assert!(blob.contains(r#""refresh_token":"rt-1""#));
        assert!(!blob.contains("at-1"));
    }

    #[test]
    fn round_trip_retains_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path().join("settings.json"));
        cache.store(&sample_credential()).unwrap();

        let cached = cache.load().unwrap().unwrap();
        assert_eq!(cached.refresh_token, "rt-1");
        assert_eq!(cached.token_type, "Bearer");
        assert!(cached.access_token.is_none());
    }

    #[test]
    fn store_replaces_existing_blob_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{truncated garbage from a crashed wri").unwrap();

        let cache = FileTokenCache::new(&path);
        cache.store(&sample_credential()).unwrap();

        // The final file is whole JSON and the staging file is gone.
        let cached = cache.load().unwrap().unwrap();
        assert_eq!(cached.refresh_token, "rt-1");
        assert!(!dir.path().join("settings.tmp").exists());
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = FileTokenCache::new(path);
        assert!(matches!(cache.load(), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn blob_without_refresh_token_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"access_token":null,"refresh_token":""}"#).unwrap();

        let cache = FileTokenCache::new(path);
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "").unwrap();

        let cache = FileTokenCache::new(path);
        assert!(cache.load().unwrap().is_none());
    }
}
