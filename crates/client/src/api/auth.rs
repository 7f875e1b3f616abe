//! Authentication flows
//!
//! Login, registration, logout, and profile retrieval over the API
//! client. Login and register run unauthenticated (no stale bearer token,
//! no refresh on 401 — a 401 there means bad credentials) and install the
//! returned credential through the explicit hooks, which is the only path
//! that bypasses the refresh machinery.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use tenora_common::auth::Credential;

use super::client::ApiClient;
use super::errors::ApiError;

/// Role assigned to a platform account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Tenant,
    Landlord,
    Contractor,
    Admin,
}

/// Account profile returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Credentials submitted to `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /auth/register`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Session payload returned by login and register
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: UserProfile,
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
}

/// Authentication service over an [`ApiClient`]
///
/// Owns no state of its own: tokens live in the client's pipeline and
/// store, the profile blob in the credential store.
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Authenticate with email and password.
    ///
    /// On success the returned credential is installed on the client and
    /// mirrored to the store, and the profile blob is cached for offline
    /// display.
    ///
    /// # Errors
    /// `AuthRequired` for rejected credentials, otherwise the usual
    /// pipeline classification.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let request = LoginRequest { email: email.to_string(), password: password.to_string() };
        let session: SessionResponse =
            self.client.post_unauthenticated("/auth/login", &request).await?;

        self.install_session(&session).await;
        info!(user = %session.user.id, "login successful");

        Ok(session.user)
    }

    /// Create an account and start a session for it.
    pub async fn register(&self, account: &NewAccount) -> Result<UserProfile, ApiError> {
        let session: SessionResponse =
            self.client.post_unauthenticated("/auth/register", account).await?;

        self.install_session(&session).await;
        info!(user = %session.user.id, "registration successful");

        Ok(session.user)
    }

    /// End the session.
    ///
    /// The server-side logout is best-effort: local authentication state
    /// is cleared even when the request fails, so the device is always
    /// logged out.
    pub async fn logout(&self) {
        let result: Result<Value, ApiError> =
            self.client.post("/auth/logout", &Value::Object(Default::default()), &[]).await;
        if let Err(e) = result {
            warn!(error = %e, "server-side logout failed; clearing local session anyway");
        }

        self.client.clear_credential().await;
        info!("logged out");
    }

    /// Fetch the authenticated account's profile from the backend and
    /// refresh the cached blob.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let profile: UserProfile = self.client.get("/auth/me", &[], &[]).await?;
        self.cache_profile(&profile).await;
        Ok(profile)
    }

    /// The cached profile from the last successful login/`me` call, for
    /// offline display.
    pub async fn cached_profile(&self) -> Option<UserProfile> {
        let blob = self.client.credential_store().load_profile().await?;
        serde_json::from_value(blob).ok()
    }

    /// Whether a credential is currently installed.
    pub async fn is_authenticated(&self) -> bool {
        if self.client.credential().await.is_some() {
            return true;
        }
        self.client.credential_store().load().await.is_some()
    }

    async fn install_session(&self, session: &SessionResponse) {
        let credential = Credential::new(
            session.access_token.clone(),
            session.refresh_token.clone(),
            session.expires_in,
        );
        self.client.set_credential(credential).await;
        self.cache_profile(&session.user).await;
    }

    async fn cache_profile(&self, profile: &UserProfile) {
        match serde_json::to_value(profile) {
            Ok(blob) => self.client.credential_store().save_profile(&blob).await,
            Err(e) => warn!(error = %e, "failed to serialize profile for caching"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tenora_common::testing::MemoryCredentialStore;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::config::ApiClientConfig;

    fn session_body(access: &str) -> serde_json::Value {
        serde_json::json!({
            "user": {
                "id": "user-123",
                "email": "tenant@example.com",
                "firstName": "Test",
                "lastName": "Tenant",
                "role": "TENANT",
            },
            "accessToken": access,
            "refreshToken": "refresh-1",
            "expiresIn": 3600,
        })
    }

    async fn service_for(server: &MockServer, store: MemoryCredentialStore) -> AuthService {
        let client = ApiClient::builder()
            .config(ApiClientConfig::with_base_url(server.uri()))
            .credential_store(Arc::new(store))
            .build()
            .unwrap();
        AuthService::new(client)
    }

    #[tokio::test]
    async fn login_installs_credential_and_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({
                "email": "tenant@example.com",
                "password": "password123",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("access-1")))
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::new();
        let service = service_for(&server, store.clone()).await;

        let user = service.login("tenant@example.com", "password123").await.unwrap();
        assert_eq!(user.email, "tenant@example.com");
        assert_eq!(user.role, UserRole::Tenant);

        let stored = store.stored().unwrap();
        assert_eq!(stored.access_token, "access-1");
        assert_eq!(stored.refresh_token, "refresh-1");
        assert!(service.is_authenticated().await);
        assert!(service.cached_profile().await.is_some());
    }

    #[tokio::test]
    async fn rejected_login_surfaces_auth_required_and_stores_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::new();
        let service = service_for(&server, store.clone()).await;

        let error = service.login("tenant@example.com", "wrong").await.unwrap_err();
        assert!(matches!(error, ApiError::AuthRequired(_)));
        assert_eq!(store.save_count(), 0);
        assert!(!service.is_authenticated().await);
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::with_credential(Credential::new(
            "access".to_string(),
            "refresh".to_string(),
            None,
        ));
        let service = service_for(&server, store.clone()).await;

        service.logout().await;

        assert!(store.stored().is_none());
        assert!(!service.is_authenticated().await);
    }

    #[tokio::test]
    async fn me_refreshes_the_cached_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-123",
                "email": "tenant@example.com",
                "firstName": "Renamed",
                "lastName": "Tenant",
                "role": "TENANT",
            })))
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::with_credential(Credential::new(
            "access".to_string(),
            "refresh".to_string(),
            None,
        ));
        let service = service_for(&server, store).await;

        let profile = service.me().await.unwrap();
        assert_eq!(profile.first_name, "Renamed");

        let cached = service.cached_profile().await.unwrap();
        assert_eq!(cached.first_name, "Renamed");
    }
}
