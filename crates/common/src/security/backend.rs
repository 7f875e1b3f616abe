//! Asynchronous secret storage interface
//!
//! Abstracts the platform keychain behind an async key-value surface so
//! the credential store can be exercised against an in-memory double.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by secret storage backends
#[derive(Debug, Error)]
pub enum KeychainError {
    /// No secret stored under the requested key
    #[error("secret not found")]
    NotFound,

    /// The underlying store rejected or failed the operation
    #[error("keychain access failed: {0}")]
    AccessFailed(String),

    /// A stored value could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Asynchronous key-value secret storage
///
/// Implemented by [`KeychainProvider`] for the platform keychain and by
/// `testing::MemorySecretBackend` for tests. Keys are logical names such
/// as `auth.access_token`; values are opaque strings.
///
/// [`KeychainProvider`]: crate::security::KeychainProvider
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch a secret, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError>;

    /// Store a secret, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Remove a secret (idempotent).
    async fn delete(&self, key: &str) -> Result<(), KeychainError>;
}
