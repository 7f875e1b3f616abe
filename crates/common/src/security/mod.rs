//! Secure credential storage
//!
//! Two layers:
//! - [`SecretBackend`]: the asynchronous get/set/delete interface the rest
//!   of the stack programs against
//! - [`KeychainProvider`]: the platform implementation over the system
//!   keychain (macOS Keychain, Windows Credential Manager, Linux Secret
//!   Service)
//!
//! Tests substitute the in-memory backend from
//! [`crate::testing`] so no test ever touches a real keychain.

pub mod backend;
#[cfg(feature = "platform")]
pub mod keychain;

pub use backend::{KeychainError, SecretBackend};
#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
