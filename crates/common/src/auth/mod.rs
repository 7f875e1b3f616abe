//! Credential types and storage
//!
//! The client holds one [`Credential`] (access token + refresh token +
//! expiry) in memory and mirrors every change to a [`CredentialStore`] so
//! sessions survive process restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  RequestPipeline         │  (tenora-client)
//! └───────────┬──────────────┘
//!             │
//!             └──► CredentialStore          (async load/save/clear)
//!                        │
//!                        └──► SecretBackend (platform keychain or
//!                                            in-memory test double)
//! ```
//!
//! Storage failures never propagate upward: a backend that cannot be read
//! degrades to "not authenticated" and the pipeline dispatches requests
//! without an `Authorization` header.
//!
//! # Module Organization
//!
//! - **[`types`]**: `Credential` and the `/auth/refresh` wire response
//! - **[`traits`]**: the `CredentialStore` seam
//! - **[`store`]**: keychain-backed store implementation

pub mod types;

#[cfg(feature = "runtime")]
pub mod store;
#[cfg(feature = "runtime")]
pub mod traits;

pub use types::{Credential, RefreshResponse};

#[cfg(feature = "runtime")]
pub use store::KeychainCredentialStore;
#[cfg(feature = "runtime")]
pub use traits::CredentialStore;
