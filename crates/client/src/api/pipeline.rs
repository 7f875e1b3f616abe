//! Request pipeline
//!
//! Orchestrates the ordered stages every logical request passes through:
//!
//! 1. rate-limit admission (may suspend, never rejects)
//! 2. credential injection (bearer header + declared capabilities)
//! 3. dispatch
//! 4. classification (network / 429 / 401 / validation / server)
//! 5. single-flight refresh-and-retry on authentication expiry
//!
//! The retry bound is an explicit loop: a request is dispatched at most
//! twice, and only when the first attempt drew a 401 that a refresh might
//! cure. Concurrent 401s collapse into one refresh call — the refresh
//! token is single-use on the backend, so two racing refreshes would
//! invalidate each other. Every request that observes a pending refresh
//! awaits the same outcome and replays with the same new credential.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tenora_common::auth::{Credential, CredentialStore, RefreshResponse};
use tenora_common::resilience::SlidingWindowLimiter;

use super::errors::{ApiError, ErrorPayload};
use crate::http::HttpClient;

/// Header carrying the capabilities a request declares it needs.
///
/// Purely declarative: the server is authoritative and the client makes
/// no local authorization decision.
const CAPABILITIES_HEADER: &str = "X-Required-Capabilities";

/// How a request authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the current credential and refresh-and-retry on 401
    Bearer,
    /// No credential, no refresh — for login/register, which must not
    /// carry a stale bearer token
    None,
}

/// A refresh outcome shared by every request that observed it pending.
type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, ApiError>>>;

/// The ordered request pipeline shared by all verbs of one [`ApiClient`]
///
/// Owns the in-memory credential and the single-flight refresh gate;
/// constructed once per client, never via globals, so tests get full
/// isolation from fresh instances.
///
/// [`ApiClient`]: super::client::ApiClient
pub struct RequestPipeline {
    http: HttpClient,
    limiter: SlidingWindowLimiter,
    store: Arc<dyn CredentialStore>,
    base_url: String,
    credential: Arc<RwLock<Option<Credential>>>,
    refresh_in_flight: Arc<Mutex<Option<RefreshFuture>>>,
}

impl RequestPipeline {
    pub fn new(
        http: HttpClient,
        limiter: SlidingWindowLimiter,
        store: Arc<dyn CredentialStore>,
        base_url: String,
    ) -> Self {
        Self {
            http,
            limiter,
            store,
            base_url,
            credential: Arc::new(RwLock::new(None)),
            refresh_in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Execute one logical request through the full stage sequence.
    ///
    /// Returns the raw 2xx response for the facade to decode; every other
    /// outcome is a classified [`ApiError`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        capabilities: &[&str],
        auth: AuthMode,
    ) -> Result<Response, ApiError> {
        // Bounded retry: attempt 1 only ever happens after a successful
        // refresh cured a 401 on attempt 0.
        let mut attempt: u8 = 0;
        loop {
            self.limiter.acquire(path).await;

            let mut request =
                self.http.request(method.clone(), format!("{}{}", self.base_url, path));
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            if !capabilities.is_empty() {
                request = request.header(CAPABILITIES_HEADER, capabilities.join(","));
            }
            if auth == AuthMode::Bearer {
                if let Some(token) = self.current_access_token().await {
                    request = request.bearer_auth(token);
                }
            }

            // Transport failures are never retried here; idempotent
            // callers retry on their own terms.
            let response = self.http.send(request).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(self.handle_overload(path, response));
            }

            if status == StatusCode::UNAUTHORIZED && auth == AuthMode::Bearer {
                if attempt == 0 {
                    debug!(path, "request drew 401; entering refresh");
                    self.refresh_credential().await?;
                    attempt += 1;
                    continue;
                }

                // The post-refresh replay was rejected too: the session is
                // beyond saving client-side.
                warn!(path, "post-refresh retry rejected; clearing session");
                self.forget_credential().await;
                return Err(ApiError::AuthRequired(
                    "session expired; please log in again".to_string(),
                ));
            }

            let payload = ErrorPayload::read(response).await;
            return Err(ApiError::from_response_parts(status, payload));
        }
    }

    /// 429 handling: punish the class window and surface a typed error
    /// carrying the best available retry-after hint.
    fn handle_overload(&self, path: &str, response: Response) -> ApiError {
        self.limiter.penalize(path);

        // Prefer the server's own Retry-After over the configured
        // cool-down when it sends one.
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(std::time::Duration::from_secs)
            .or_else(|| self.limiter.cooldown_hint(path));

        ApiError::RateLimited {
            message: "rate limit exceeded; please try again shortly".to_string(),
            retry_after,
        }
    }

    /// The access token to inject, lazily loaded from the store on first
    /// use after startup.
    async fn current_access_token(&self) -> Option<String> {
        if let Some(credential) = self.credential.read().await.as_ref() {
            return Some(credential.access_token.clone());
        }

        let loaded = self.store.load().await?;
        debug!("restored credential from secure storage");

        let mut guard = self.credential.write().await;
        // Another request may have won the race; keep whichever credential
        // is already in place.
        let current = guard.get_or_insert(loaded);
        Some(current.access_token.clone())
    }

    /// Refresh the credential, collapsing concurrent calls into one
    /// backend request.
    ///
    /// The check-and-set on the gate happens under a synchronous lock, so
    /// exactly one caller creates the refresh future; everyone else
    /// clones it and awaits the same outcome. The refresh itself runs on
    /// a spawned task: once pending it completes or fails even if every
    /// awaiting request is cancelled.
    async fn refresh_credential(&self) -> Result<Credential, ApiError> {
        let future = {
            let mut slot = self.refresh_in_flight.lock();
            if let Some(pending) = slot.as_ref() {
                debug!("refresh already pending; awaiting shared outcome");
                pending.clone()
            } else {
                let pending = self.spawn_refresh();
                *slot = Some(pending.clone());
                pending
            }
        };

        future.await
    }

    fn spawn_refresh(&self) -> RefreshFuture {
        let http = self.http.clone();
        let store = Arc::clone(&self.store);
        let credential = Arc::clone(&self.credential);
        let gate = Arc::clone(&self.refresh_in_flight);
        let refresh_url = format!("{}/auth/refresh", self.base_url);

        let task = tokio::spawn(async move {
            let result = run_refresh(&http, &store, &credential, &refresh_url).await;
            // Reopen the gate before waiters observe the outcome so a
            // 401 arriving later starts a fresh refresh instead of
            // re-reading this one.
            *gate.lock() = None;
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(ApiError::AuthRequired(format!("refresh task aborted: {e}"))),
            }
        }
        .boxed()
        .shared()
    }

    /// Drop all authentication state, memory and store both.
    pub(crate) async fn forget_credential(&self) {
        *self.credential.write().await = None;
        self.store.clear().await;
    }

    /// Install a credential explicitly (login/register), mirroring it to
    /// the store.
    pub(crate) async fn set_credential(&self, credential: Credential) {
        *self.credential.write().await = Some(credential.clone());
        self.store.save(&credential).await;
    }

    /// Snapshot of the current in-memory credential.
    pub(crate) async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    pub(crate) fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }
}

/// The refresh operation proper, run on its own task.
///
/// Any failure — transport, rejection, malformed response — is
/// irrecoverable for the session: the credential is cleared everywhere
/// and every waiter sees `AuthRequired`.
async fn run_refresh(
    http: &HttpClient,
    store: &Arc<dyn CredentialStore>,
    credential: &Arc<RwLock<Option<Credential>>>,
    refresh_url: &str,
) -> Result<Credential, ApiError> {
    let refresh_token =
        { credential.read().await.as_ref().map(|c| c.refresh_token.clone()) };
    let refresh_token = match refresh_token {
        Some(token) => token,
        None => match store.load().await {
            Some(stored) => stored.refresh_token,
            None => {
                return fail_refresh(store, credential, "no refresh token available").await;
            }
        },
    };

    info!("access token rejected; refreshing session");

    let request = http
        .request(Method::POST, refresh_url)
        .json(&serde_json::json!({ "refreshToken": refresh_token }));

    let response = match http.send(request).await {
        Ok(response) => response,
        Err(e) => {
            return fail_refresh(store, credential, &format!("refresh request failed: {e}")).await;
        }
    };

    let status = response.status();
    if !status.is_success() {
        return fail_refresh(
            store,
            credential,
            &format!("refresh rejected with status {}", status.as_u16()),
        )
        .await;
    }

    let payload: RefreshResponse = match response.json().await {
        Ok(payload) => payload,
        Err(e) => {
            return fail_refresh(store, credential, &format!("malformed refresh response: {e}"))
                .await;
        }
    };

    let renewed: Credential = payload.into();
    *credential.write().await = Some(renewed.clone());
    store.save(&renewed).await;

    info!("session refreshed");
    Ok(renewed)
}

async fn fail_refresh(
    store: &Arc<dyn CredentialStore>,
    credential: &Arc<RwLock<Option<Credential>>>,
    reason: &str,
) -> Result<Credential, ApiError> {
    warn!(reason, "session refresh failed; clearing stored credentials");
    *credential.write().await = None;
    store.clear().await;
    Err(ApiError::AuthRequired("session expired; please log in again".to_string()))
}
