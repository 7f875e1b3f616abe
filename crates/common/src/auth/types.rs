//! Credential types
//!
//! Defines the in-memory credential held by the request pipeline and the
//! wire format returned by the backend's token endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential for API authentication
///
/// Owned by the request pipeline; replaced wholesale on refresh, deleted
/// on logout or irrecoverable refresh failure, and mirrored to the
/// credential store on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Access token attached to requests as `Authorization: Bearer ...`
    pub access_token: String,

    /// Refresh token consumed (once) by `POST /auth/refresh`
    pub refresh_token: String,

    /// Absolute expiration timestamp (UTC), when the backend reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a credential, computing `expires_at` from a lifetime in
    /// seconds when the backend supplied one.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: Option<i64>) -> Self {
        let expires_at = expires_in
            .filter(|&secs| secs > 0)
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Self { access_token, refresh_token, expires_at }
    }

    /// Check whether the access token is expired or will expire within the
    /// given threshold.
    ///
    /// Returns `false` when no expiry is known; the backend's 401 is
    /// authoritative either way.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + chrono::Duration::seconds(threshold_seconds) >= expires_at,
            None => false,
        }
    }

    /// Seconds until expiry, or `None` when no expiry is known.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }
}

/// Token payload returned by `POST /auth/refresh` (and embedded in
/// login/register responses)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
}

impl From<RefreshResponse> for Credential {
    fn from(response: RefreshResponse) -> Self {
        Self::new(response.access_token, response.refresh_token, response.expires_in)
    }
}
