//! API client configuration
//!
//! Base URL, transport settings, and the per-endpoint-class rate-limit
//! table. The defaults are the platform's production values: auth,
//! AI-inference, and upload endpoints have server-side costs an order of
//! magnitude apart from simple CRUD reads, so each gets its own budget
//! instead of one global limiter.

use std::time::Duration;

use once_cell::sync::Lazy;
use tenora_common::resilience::{RateLimitConfig, SlidingWindowLimiter};

use super::errors::ApiError;

/// Default per-class budgets, longest-running concerns first.
static ENDPOINT_CLASSES: Lazy<Vec<(&'static str, RateLimitConfig)>> = Lazy::new(|| {
    vec![
        (
            "/auth",
            RateLimitConfig {
                max_requests: 5,
                window: Duration::from_secs(60),
                cooldown: Some(Duration::from_secs(3)),
            },
        ),
        (
            "/ai",
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(2),
                cooldown: Some(Duration::from_secs(5)),
            },
        ),
        (
            "/uploads",
            RateLimitConfig {
                max_requests: 3,
                window: Duration::from_secs(5),
                cooldown: Some(Duration::from_secs(10)),
            },
        ),
    ]
});

/// Configuration for [`ApiClient`]
///
/// [`ApiClient`]: super::client::ApiClient
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the backend API (e.g., "https://api.tenora.app/v1")
    pub base_url: String,
    /// Timeout for individual requests
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-endpoint-class rate-limit budgets (URL prefix → budget)
    pub endpoint_classes: Vec<(String, RateLimitConfig)>,
    /// Budget for URLs matching no configured class
    pub default_class: RateLimitConfig,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tenora.app/v1".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("tenora-client/{}", env!("CARGO_PKG_VERSION")),
            endpoint_classes: ENDPOINT_CLASSES
                .iter()
                .map(|(prefix, config)| ((*prefix).to_string(), config.clone()))
                .collect(),
            default_class: RateLimitConfig::default(),
        }
    }
}

impl ApiClientConfig {
    /// Configuration pointing at a specific backend, with default budgets.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Build the admission limiter described by this configuration.
    pub(crate) fn build_limiter(&self) -> Result<SlidingWindowLimiter, ApiError> {
        let mut builder =
            SlidingWindowLimiter::builder().default_config(self.default_class.clone());
        for (prefix, config) in &self.endpoint_classes {
            builder = builder.class(prefix.clone(), config.clone());
        }
        builder.build().map_err(ApiError::Config)
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::Config("base_url must not be empty".to_string()));
        }
        if self.base_url.ends_with('/') {
            return Err(ApiError::Config(
                "base_url must not end with a slash; paths start with one".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_limiter() {
        let config = ApiClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.build_limiter().is_ok());
        assert_eq!(config.endpoint_classes.len(), 3);
    }

    #[test]
    fn trailing_slash_is_rejected() {
        let config = ApiClientConfig::with_base_url("https://api.example.com/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_class_budget_is_rejected() {
        let mut config = ApiClientConfig::default();
        config.endpoint_classes.push((
            "/broken".to_string(),
            RateLimitConfig { max_requests: 0, window: Duration::from_secs(1), cooldown: None },
        ));
        assert!(config.build_limiter().is_err());
    }
}
