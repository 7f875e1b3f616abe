//! Traits for credential storage
//!
//! The store seam lets the request pipeline persist credentials without
//! knowing which backend holds them, and lets tests inject in-memory
//! doubles.

use async_trait::async_trait;
use serde_json::Value;

use super::types::Credential;

/// Persistent storage for the client credential and the cached user
/// profile
///
/// Implementations are expected to *degrade, not fail*: a backend that
/// cannot be read yields `None` (the pipeline then runs unauthenticated),
/// and write failures are logged and swallowed. The pipeline never
/// observes a storage error.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, `None` when absent or unreadable.
    async fn load(&self) -> Option<Credential>;

    /// Persist a credential, replacing any previous one.
    async fn save(&self, credential: &Credential);

    /// Remove all stored authentication state (idempotent).
    async fn clear(&self);

    /// Load the cached user profile blob, `None` when absent or
    /// unreadable.
    async fn load_profile(&self) -> Option<Value>;

    /// Persist the user profile blob alongside the credential.
    async fn save_profile(&self, profile: &Value);
}
