//! Resilient API access layer for the Tenora platform
//!
//! One HTTP client wrapper that every Tenora client application routes
//! its backend traffic through. It provides:
//!
//! - **Admission control**: per-endpoint-class sliding-window rate limits
//!   enforced client-side, with a punitive cool-down after a server 429
//! - **Transparent authentication**: bearer token injection, and a
//!   single-flight refresh so any number of concurrent 401s collapse into
//!   one `/auth/refresh` call whose outcome every request observes
//! - **Typed errors**: every failure surfaces as one [`ApiError`] kind
//!   with a human-readable message
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tenora_client::{ApiClient, ApiClientConfig};
//! use tenora_common::auth::KeychainCredentialStore;
//! use tenora_common::security::KeychainProvider;
//!
//! # #[derive(serde::Deserialize)]
//! # struct Property { id: String }
//! # async fn example() -> Result<(), tenora_client::ApiError> {
//! let store = KeychainCredentialStore::new(KeychainProvider::new("Tenora.api"));
//! let client = ApiClient::builder()
//!     .config(ApiClientConfig::default())
//!     .credential_store(Arc::new(store))
//!     .build()?;
//!
//! let properties: Vec<Property> = client.get("/properties", &[], &[]).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod api;
pub mod http;

pub use api::auth::{AuthService, LoginRequest, NewAccount, UserProfile, UserRole};
pub use api::client::{ApiClient, ApiClientBuilder};
pub use api::config::ApiClientConfig;
pub use api::errors::{ApiError, ApiErrorKind};
pub use api::pipeline::{AuthMode, RequestPipeline};
pub use http::client::{HttpClient, HttpClientBuilder};
