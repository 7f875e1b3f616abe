//! Credential storage over a secret backend
//!
//! Token-specific helpers layered on the generic [`SecretBackend`]: the
//! access token, refresh token, token metadata, and user profile blob
//! each live under a fixed key. Failures from the underlying store are
//! treated as "no credential" rather than propagated, so the pipeline
//! degrades to unauthenticated instead of crashing.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::traits::CredentialStore;
use super::types::Credential;
use crate::security::SecretBackend;

const ACCESS_TOKEN_KEY: &str = "auth.access_token";
const REFRESH_TOKEN_KEY: &str = "auth.refresh_token";
const METADATA_KEY: &str = "auth.token_metadata";
const PROFILE_KEY: &str = "auth.user_profile";

/// [`CredentialStore`] over any [`SecretBackend`]
///
/// In production the backend is the platform keychain
/// ([`crate::security::KeychainProvider`]); tests use the in-memory
/// backend from [`crate::testing`].
pub struct KeychainCredentialStore<B> {
    backend: B,
}

impl<B: SecretBackend> KeychainCredentialStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn read_secret(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "secret backend read failed; treating as absent");
                None
            }
        }
    }

    async fn write_secret(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value).await {
            warn!(key = %key, error = %e, "secret backend write failed");
        }
    }

    async fn delete_secret(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!(key = %key, error = %e, "secret backend delete failed");
        }
    }

    /// Reconstruct `expires_at` from the metadata blob, tolerating a
    /// missing or corrupt value.
    fn parse_expires_at(metadata: Option<String>) -> Option<chrono::DateTime<Utc>> {
        let metadata: Value = serde_json::from_str(&metadata?).ok()?;
        let timestamp = metadata.get("expires_at")?.as_i64()?;
        Utc.timestamp_opt(timestamp, 0).single()
    }
}

#[async_trait]
impl<B: SecretBackend> CredentialStore for KeychainCredentialStore<B> {
    async fn load(&self) -> Option<Credential> {
        let access_token = self.read_secret(ACCESS_TOKEN_KEY).await?;
        let refresh_token = self.read_secret(REFRESH_TOKEN_KEY).await?;
        let expires_at = Self::parse_expires_at(self.read_secret(METADATA_KEY).await);

        debug!("loaded credential from secure storage");
        Some(Credential { access_token, refresh_token, expires_at })
    }

    async fn save(&self, credential: &Credential) {
        self.write_secret(ACCESS_TOKEN_KEY, &credential.access_token).await;
        self.write_secret(REFRESH_TOKEN_KEY, &credential.refresh_token).await;

        let metadata = json!({
            "expires_at": credential.expires_at.map(|dt| dt.timestamp()),
        });
        self.write_secret(METADATA_KEY, &metadata.to_string()).await;

        debug!("credential mirrored to secure storage");
    }

    async fn clear(&self) {
        self.delete_secret(ACCESS_TOKEN_KEY).await;
        self.delete_secret(REFRESH_TOKEN_KEY).await;
        self.delete_secret(METADATA_KEY).await;
        self.delete_secret(PROFILE_KEY).await;

        debug!("authentication state cleared from secure storage");
    }

    async fn load_profile(&self) -> Option<Value> {
        let raw = self.read_secret(PROFILE_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "stored profile blob is corrupt; treating as absent");
                None
            }
        }
    }

    async fn save_profile(&self, profile: &Value) {
        self.write_secret(PROFILE_KEY, &profile.to_string()).await;
    }
}
