//! Modular common utilities shared across Tenora client crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: credential types and error definitions
//! - `runtime`: async infrastructure (resilience, storage traits, test
//!   doubles)
//! - `platform`: platform integrations (system keychain)
//!
//! The `platform` tier is enabled by default; the client crate always
//! consumes the full stack.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "runtime", test))]
pub mod testing;

// Re-export commonly used types for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{Credential, RefreshResponse};
#[cfg(feature = "runtime")]
pub use auth::{CredentialStore, KeychainCredentialStore};
#[cfg(feature = "runtime")]
pub use resilience::{
    RateLimitConfig, RateLimitConfigBuilder, SlidingWindowLimiter, SlidingWindowLimiterBuilder,
};
#[cfg(feature = "runtime")]
pub use security::{KeychainError, SecretBackend};
#[cfg(feature = "platform")]
pub use security::KeychainProvider;
