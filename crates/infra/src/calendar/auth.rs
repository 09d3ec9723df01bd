//! Access-token management for the calendar API.
//!
//! Exchanges the configured refresh token for short-lived access tokens and
//! caches them until shortly before expiry.

use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Deserialize;
use slotwise_domain::{CalendarConfig, Result, SlotwiseError};
use tokio::sync::Mutex;
use tracing::debug;

use crate::http::HttpClient;

const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Refresh this long before the provider-reported expiry.
const REFRESH_SKEW: Duration = Duration::from_secs(60);

/// Token manager exchanging a refresh token for cached access tokens.
pub struct AccessTokenManager {
    http: HttpClient,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl AccessTokenManager {
    pub fn new(config: &CalendarConfig, http: HttpClient) -> Self {
        Self::with_endpoint(config, http, DEFAULT_TOKEN_ENDPOINT)
    }

    /// Use a non-default token endpoint (tests point this at a mock server).
    pub fn with_endpoint(
        config: &CalendarConfig,
        http: HttpClient,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_endpoint: token_endpoint.into(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Retrieve the current access token, refreshing when missing or close
    /// to expiry.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let refreshed = self.refresh().await?;
        let access_token = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(access_token)
    }

    async fn refresh(&self) -> Result<CachedToken> {
        debug!("refreshing calendar access token");

        let response = self
            .http
            .send(self.http.request(Method::POST, &self.token_endpoint).form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ]))
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(SlotwiseError::PermissionDenied(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let token: TokenRefreshResponse = response.json().await.map_err(|e| {
            SlotwiseError::Provider(format!("failed to parse token response: {e}"))
        })?;

        let lifetime = Duration::from_secs(token.expires_in.max(0) as u64);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(REFRESH_SKEW),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config() -> CalendarConfig {
        CalendarConfig {
            calendar_id: "primary".into(),
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            refresh_token: "refresh-1".into(),
        }
    }

    fn manager(server: &MockServer) -> AccessTokenManager {
        AccessTokenManager::with_endpoint(
            &config(),
            HttpClient::new().unwrap(),
            format!("{}/token", server.uri()),
        )
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-abc",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server);
        assert_eq!(manager.access_token().await.unwrap(), "token-abc");
        assert_eq!(manager.access_token().await.unwrap(), "token-abc");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-short",
                // Shorter than the refresh skew: expires immediately
                "expires_in": 1
            })))
            .expect(2)
            .mount(&server)
            .await;

        let manager = manager(&server);
        manager.access_token().await.unwrap();
        manager.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn refresh_rejection_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let manager = manager(&server);
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, SlotwiseError::PermissionDenied(_)), "got {err:?}");
    }
}
