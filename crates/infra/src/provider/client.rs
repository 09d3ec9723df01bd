//! Client for the scheduling provider's REST API.
//!
//! Implements the `SchedulingProvider` port: scope resolution, paginated
//! scheduled-event and invitee listing for backfill, and webhook
//! subscription registration. Listing calls are reads and may retry;
//! registration is sent exactly once.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use slotwise_core::ports::SchedulingProvider;
use slotwise_domain::{
    EventPage, Invitee, InviteePage, InviteeState, ProviderScope, Result, ScheduledEvent,
    SchedulingConfig, SlotwiseError,
};
use tracing::debug;

use crate::errors::classify_provider_error;
use crate::http::HttpClient;

const DEFAULT_API_BASE: &str = "https://api.calendly.com";
/// Page size requested from the provider; it may return fewer.
const PAGE_SIZE: u32 = 100;

/// HTTP implementation of the scheduling provider port.
pub struct HttpSchedulingProvider {
    http: HttpClient,
    base_url: String,
    access_token: String,
}

impl HttpSchedulingProvider {
    pub fn new(config: &SchedulingConfig, http: HttpClient) -> Self {
        Self::with_base_url(config, http, DEFAULT_API_BASE)
    }

    /// Use a non-default API base (tests point this at a mock server).
    pub fn with_base_url(
        config: &SchedulingConfig,
        http: HttpClient,
        base_url: impl Into<String>,
    ) -> Self {
        Self { http, base_url: base_url.into(), access_token: config.access_token.clone() }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .send(self.http.request(Method::GET, url).bearer_auth(&self.access_token).query(query))
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_provider_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SlotwiseError::Provider(format!("failed to parse provider response: {e}")))
    }

    /// Invitee listings hang off the event URI itself; fall back to the
    /// configured base for bare event ids.
    fn invitees_url(&self, event_uri: &str) -> String {
        if event_uri.starts_with("http://") || event_uri.starts_with("https://") {
            format!("{event_uri}/invitees")
        } else {
            format!("{}/scheduled_events/{event_uri}/invitees", self.base_url)
        }
    }
}

#[async_trait]
impl SchedulingProvider for HttpSchedulingProvider {
    async fn current_scope(&self) -> Result<ProviderScope> {
        let me: UserResponse =
            self.get_json(&format!("{}/users/me", self.base_url), &[]).await?;

        debug!(user = %me.resource.uri, organization = ?me.resource.current_organization, "resolved provider scope");

        Ok(ProviderScope {
            user_uri: me.resource.uri,
            organization_uri: me.resource.current_organization,
        })
    }

    async fn scheduled_events(
        &self,
        scope: &ProviderScope,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        let scope_param = if scope.is_organization() { "organization" } else { "user" };
        let mut query: Vec<(&str, String)> = vec![
            (scope_param, scope.effective_uri().to_string()),
            ("count", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        let page: CollectionResponse<ApiScheduledEvent> =
            self.get_json(&format!("{}/scheduled_events", self.base_url), &query).await?;

        Ok(EventPage {
            events: page.collection.into_iter().map(ApiScheduledEvent::into_event).collect(),
            next_page_token: page.pagination.and_then(|p| p.next_page_token),
        })
    }

    async fn event_invitees(
        &self,
        event_uri: &str,
        page_token: Option<&str>,
    ) -> Result<InviteePage> {
        let mut query: Vec<(&str, String)> = vec![("count", PAGE_SIZE.to_string())];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        let page: CollectionResponse<ApiInvitee> =
            self.get_json(&self.invitees_url(event_uri), &query).await?;

        Ok(InviteePage {
            invitees: page.collection.into_iter().map(ApiInvitee::into_invitee).collect(),
            next_page_token: page.pagination.and_then(|p| p.next_page_token),
        })
    }

    async fn register_webhook(
        &self,
        callback_url: &str,
        scope: &ProviderScope,
    ) -> Result<String> {
        let scope_name = if scope.is_organization() { "organization" } else { "user" };
        let mut body = json!({
            "url": callback_url,
            "events": ["invitee.created", "invitee.canceled"],
            "scope": scope_name,
        });
        body[scope_name] = json!(scope.effective_uri());

        // Registration creates a subscription on the provider side; send it
        // exactly once.
        let response = self
            .http
            .send_once(
                self.http
                    .request(Method::POST, format!("{}/webhook_subscriptions", self.base_url))
                    .bearer_auth(&self.access_token)
                    .json(&body),
            )
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_provider_error(status, &body));
        }

        let created: WebhookResponse = response.json().await.map_err(|e| {
            SlotwiseError::Provider(format!("failed to parse webhook subscription: {e}"))
        })?;

        debug!(webhook_uri = %created.resource.uri, "registered webhook subscription");
        Ok(created.resource.uri)
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    resource: UserResource,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    uri: String,
    current_organization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse<T> {
    #[serde(default)]
    collection: Vec<T>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiScheduledEvent {
    uri: String,
    name: Option<String>,
    start_time: chrono::DateTime<chrono::Utc>,
    end_time: chrono::DateTime<chrono::Utc>,
}

impl ApiScheduledEvent {
    fn into_event(self) -> ScheduledEvent {
        ScheduledEvent {
            uri: self.uri,
            name: self.name,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiInvitee {
    uri: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    status: Option<String>,
}

impl ApiInvitee {
    fn into_invitee(self) -> Invitee {
        // Anything other than an explicit cancellation counts as active
        let state = match self.status.as_deref() {
            Some("canceled") => InviteeState::Canceled,
            _ => InviteeState::Active,
        };
        Invitee { uri: self.uri, name: self.name, email: self.email, state }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    resource: WebhookResource,
}

#[derive(Debug, Deserialize)]
struct WebhookResource {
    uri: String,
}
