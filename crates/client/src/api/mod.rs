//! API access layer
//!
//! The ordered request pipeline (admission → credential injection →
//! dispatch → classification → single-flight refresh-and-retry), the
//! typed error taxonomy, the client facade, and the authentication
//! service built on top of it.

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod pipeline;

pub use auth::AuthService;
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ApiClientConfig;
pub use errors::{ApiError, ApiErrorKind};
pub use pipeline::{AuthMode, RequestPipeline};
