//! API client facade
//!
//! The typed surface application code calls: `get`/`post`/`put`/`delete`
//! delegating to the request pipeline, plus explicit credential hooks for
//! login/logout flows that must bypass the refresh machinery.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use tenora_common::auth::{Credential, CredentialStore};

use super::config::ApiClientConfig;
use super::errors::ApiError;
use super::pipeline::{AuthMode, RequestPipeline};
use crate::http::HttpClient;

/// Typed API client for the Tenora backend
///
/// Cloning is cheap; clones share the pipeline, so they see the same
/// credential and throttle against the same budgets.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a builder for fluent configuration.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Execute a GET request.
    ///
    /// # Arguments
    /// * `path` - API path (e.g., "/properties")
    /// * `query` - query parameters as key/value pairs
    /// * `capabilities` - capabilities declared for server-side
    ///   authorization
    ///
    /// # Errors
    /// Returns a classified [`ApiError`] if the request fails or the
    /// response cannot be deserialized.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        capabilities: &[&str],
    ) -> Result<T, ApiError> {
        let response = self
            .pipeline
            .execute(Method::GET, path, query, None, capabilities, AuthMode::Bearer)
            .await?;
        Self::decode(response).await
    }

    /// Execute a POST request with a JSON body.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        capabilities: &[&str],
    ) -> Result<T, ApiError> {
        let body = Self::to_body(body)?;
        let response = self
            .pipeline
            .execute(Method::POST, path, &[], Some(&body), capabilities, AuthMode::Bearer)
            .await?;
        Self::decode(response).await
    }

    /// Execute a PUT request with a JSON body.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        capabilities: &[&str],
    ) -> Result<T, ApiError> {
        let body = Self::to_body(body)?;
        let response = self
            .pipeline
            .execute(Method::PUT, path, &[], Some(&body), capabilities, AuthMode::Bearer)
            .await?;
        Self::decode(response).await
    }

    /// Execute a DELETE request.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        capabilities: &[&str],
    ) -> Result<T, ApiError> {
        let response = self
            .pipeline
            .execute(Method::DELETE, path, &[], None, capabilities, AuthMode::Bearer)
            .await?;
        Self::decode(response).await
    }

    /// Execute a POST without any credential attached.
    ///
    /// For login and register: the call is still rate-limited under the
    /// `/auth` class, but carries no (possibly stale) bearer token and a
    /// 401 means "bad credentials", not "refresh me".
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_unauthenticated<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Self::to_body(body)?;
        let response = self
            .pipeline
            .execute(Method::POST, path, &[], Some(&body), &[], AuthMode::None)
            .await?;
        Self::decode(response).await
    }

    /// Install a credential explicitly (after login/register).
    ///
    /// Updates the in-memory credential and mirrors it to the store; the
    /// refresh machinery is not involved.
    pub async fn set_credential(&self, credential: Credential) {
        self.pipeline.set_credential(credential).await;
    }

    /// Drop all authentication state (logout).
    pub async fn clear_credential(&self) {
        self.pipeline.forget_credential().await;
    }

    /// Snapshot of the current in-memory credential.
    pub async fn credential(&self) -> Option<Credential> {
        self.pipeline.credential().await
    }

    /// The credential store this client persists to.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.pipeline.store()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::Config(format!("failed to serialize request body: {e}")))
    }

    /// Decode a 2xx response body into the caller's type.
    ///
    /// 204/205 have no body by spec and decode from JSON null; a body
    /// that fails to decode surfaces as an unclassified server error.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(Value::Null).map_err(|_| {
                ApiError::Server {
                    status: status.as_u16(),
                    message: format!(
                        "no-content response ({}) cannot populate the requested type",
                        status.as_u16()
                    ),
                }
            });
        }

        debug!(status = status.as_u16(), "decoding response body");
        response.json().await.map_err(|e| ApiError::Server {
            status: status.as_u16(),
            message: format!("failed to decode response body: {e}"),
        })
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl ApiClientBuilder {
    /// Set the client configuration.
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the API client.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if required pieces are missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self
            .store
            .ok_or_else(|| ApiError::Config("credential store not set".to_string()))?;

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let limiter = config.build_limiter()?;

        let pipeline =
            RequestPipeline::new(http, limiter, store, config.base_url.clone());

        Ok(ApiClient { pipeline: Arc::new(pipeline), config })
    }
}
