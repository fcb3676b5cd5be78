//! Remote store adapter.
//!
//! The networked database itself is an external collaborator; this module
//! pins down the contract the sync engine depends on: an authenticated-user
//! lookup, fetch-by-id, and an idempotent upsert keyed by record id. The
//! remote side applies its own last-write-wins on `updated_at`, so pushing
//! the same record twice is harmless.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BodyMetricEntry, DailyMetricEntry, UserProfile};

/// Timeout applied to every remote request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the remote store, distinguishable at least as
/// authentication vs everything else.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Not authenticated with remote store")]
    NotAuthenticated,

    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Remote store rejected request: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::NotAuthenticated)
    }
}

/// Contract between the sync engine and the networked database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the authenticated user id, or `None` when signed out.
    async fn current_user(&self) -> Result<Option<String>, RemoteError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError>;

    async fn fetch_body_metrics(&self, id: Uuid) -> Result<Option<BodyMetricEntry>, RemoteError>;

    async fn fetch_daily_metrics(&self, id: Uuid) -> Result<Option<DailyMetricEntry>, RemoteError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError>;

    async fn upsert_body_metrics(&self, entry: &BodyMetricEntry) -> Result<(), RemoteError>;

    async fn upsert_daily_metrics(&self, entry: &DailyMetricEntry) -> Result<(), RemoteError>;
}

#[derive(Deserialize)]
struct MeResponse {
    user_id: String,
}

/// HTTP implementation of the remote store contract.
pub struct HttpRemoteStore {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, RemoteError> {
        let response = self
            .client
            .get(self.build_url(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let value = response
                .json()
                .await
                .map_err(|e| RemoteError::Rejected(e.to_string()))?;
            return Ok(Some(value));
        }

        match status.as_u16() {
            404 => Ok(None),
            401 | 403 => Err(RemoteError::NotAuthenticated),
            _ => Err(RemoteError::Rejected(format!(
                "Server returned status {}",
                status
            ))),
        }
    }

    async fn put_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.build_url(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(RemoteError::NotAuthenticated),
            _ => Err(RemoteError::Rejected(format!(
                "Server returned status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn current_user(&self) -> Result<Option<String>, RemoteError> {
        match self.get_json::<MeResponse>("/api/v1/me").await {
            Ok(me) => Ok(me.map(|m| m.user_id)),
            Err(RemoteError::NotAuthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        self.get_json(&format!("/api/v1/profiles/{}", user_id)).await
    }

    async fn fetch_body_metrics(&self, id: Uuid) -> Result<Option<BodyMetricEntry>, RemoteError> {
        self.get_json(&format!("/api/v1/body-metrics/{}", id)).await
    }

    async fn fetch_daily_metrics(&self, id: Uuid) -> Result<Option<DailyMetricEntry>, RemoteError> {
        self.get_json(&format!("/api/v1/daily-metrics/{}", id)).await
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        self.put_json(&format!("/api/v1/profiles/{}", profile.id), profile)
            .await
    }

    async fn upsert_body_metrics(&self, entry: &BodyMetricEntry) -> Result<(), RemoteError> {
        // The remote store persists kilograms regardless of what the user
        // entered; the local copy keeps its native unit.
        let normalized = entry.normalized_to_kg();
        self.put_json(&format!("/api/v1/body-metrics/{}", entry.id), &normalized)
            .await
    }

    async fn upsert_daily_metrics(&self, entry: &DailyMetricEntry) -> Result<(), RemoteError> {
        self.put_json(&format!("/api/v1/daily-metrics/{}", entry.id), entry)
            .await
    }
}

/// Quick reachability probe, used to fail fast before attempting a pass.
pub async fn check_server(url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    let health_url = format!("{}/health", url.trim_end_matches('/'));
    match client.get(&health_url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_strips_trailing_slash() {
        let store = HttpRemoteStore::new("https://api.example.com/", "key");
        assert_eq!(
            store.build_url("/api/v1/me"),
            "https://api.example.com/api/v1/me"
        );
    }

    #[test]
    fn test_build_url_bare_host() {
        let store = HttpRemoteStore::new("https://api.example.com", "key");
        assert_eq!(
            store.build_url("/api/v1/profiles/user-1"),
            "https://api.example.com/api/v1/profiles/user-1"
        );
    }

    #[test]
    fn test_remote_error_auth_distinction() {
        assert!(RemoteError::NotAuthenticated.is_auth());
        assert!(!RemoteError::Unreachable("timeout".to_string()).is_auth());
        assert!(!RemoteError::Rejected("500".to_string()).is_auth());
    }
}
