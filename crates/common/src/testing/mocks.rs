//! In-memory mocks for secure storage
//!
//! [`MemorySecretBackend`] mimics the platform keychain at the key-value
//! level (with failure injection for degradation tests);
//! [`MemoryCredentialStore`] implements the credential-store seam
//! directly and counts operations so tests can assert on persistence
//! behaviour (e.g. "saved exactly once per refresh").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::auth::{Credential, CredentialStore};
use crate::security::{KeychainError, SecretBackend};

/// In-memory [`SecretBackend`] with failure injection
#[derive(Clone, Default)]
pub struct MemorySecretBackend {
    storage: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, every subsequent operation fails with
    /// [`KeychainError::AccessFailed`], simulating an unavailable
    /// platform keychain.
    pub fn fail_next_operations(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), KeychainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(KeychainError::AccessFailed("simulated backend outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretBackend for MemorySecretBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        self.check_available()?;
        Ok(self.storage.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.check_available()?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        self.check_available()?;
        self.storage.lock().remove(key);
        Ok(())
    }
}

/// In-memory [`CredentialStore`] with operation counters
///
/// Cloning shares state, so a test can hand one clone to the client and
/// keep another for assertions.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    credential: Arc<Mutex<Option<Credential>>>,
    profile: Arc<Mutex<Option<Value>>>,
    save_count: Arc<AtomicUsize>,
    clear_count: Arc<AtomicUsize>,
    saved_access_tokens: Arc<Mutex<Vec<String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous session had saved a
    /// credential.
    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::default();
        *store.credential.lock() = Some(credential);
        store
    }

    /// Number of `save` calls observed.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Number of `clear` calls observed.
    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }

    /// Access tokens passed to `save`, in order.
    pub fn saved_access_tokens(&self) -> Vec<String> {
        self.saved_access_tokens.lock().clone()
    }

    /// Current stored credential, if any.
    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Option<Credential> {
        self.credential.lock().clone()
    }

    async fn save(&self, credential: &Credential) {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        self.saved_access_tokens.lock().push(credential.access_token.clone());
        *self.credential.lock() = Some(credential.clone());
    }

    async fn clear(&self) {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock() = None;
        *self.profile.lock() = None;
    }

    async fn load_profile(&self) -> Option<Value> {
        self.profile.lock().clone()
    }

    async fn save_profile(&self, profile: &Value) {
        *self.profile.lock() = Some(profile.clone());
    }
}
