//! Platform keychain provider
//!
//! Thin wrapper over the platform keychain for storing opaque secrets,
//! scoped by a service name so multiple Tenora installs (or tests) never
//! collide. Works on macOS (Keychain Access), Windows (Credential
//! Manager), and Linux (Secret Service API) via the `keyring` crate.
//!
//! ## Usage
//!
//! ```no_run
//! use tenora_common::security::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("Tenora.api");
//! keychain.set_secret("auth.access_token", "eyJhbGciOi...")?;
//! let token = keychain.get_secret("auth.access_token")?;
//! # Ok::<(), tenora_common::security::KeychainError>(())
//! ```

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::backend::{KeychainError, SecretBackend};

/// Service-scoped access to the platform keychain
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a provider for a specific service.
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g., "Tenora.api")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("failed to open keychain entry for {key}: {e}"))
        })
    }

    /// Store a secret value in the platform keychain.
    ///
    /// # Errors
    /// Returns [`KeychainError::AccessFailed`] if keychain access fails.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "storing secret in keychain");

        let entry = self.entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("failed to store secret for {key}: {e}"))
        })
    }

    /// Retrieve a secret value from the platform keychain.
    ///
    /// # Errors
    /// Returns [`KeychainError::NotFound`] if the secret doesn't exist,
    /// [`KeychainError::AccessFailed`] if keychain access fails.
    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "retrieving secret from keychain");

        let entry = self.entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    /// Delete a secret from the platform keychain (idempotent).
    ///
    /// # Errors
    /// Returns [`KeychainError::AccessFailed`] if keychain access fails
    /// for a reason other than the entry being absent.
    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "deleting secret from keychain");

        let entry = self.entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "failed to delete secret for {key}: {e}"
            ))),
        }
    }

    /// Determine whether a secret exists.
    #[must_use]
    pub fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

#[async_trait]
impl SecretBackend for KeychainProvider {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        match self.get_secret(key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.set_secret(key, value)
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        self.delete_secret(key)
    }
}
