//! Calendar gateway over the provider's REST API.
//!
//! Implements the `CalendarGateway` port: event listing for availability,
//! event creation with attendee invitation, cancellation, and attendee
//! status lookup. Non-success responses go through
//! `errors::classify_provider_error` before they reach any caller.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use slotwise_core::ports::CalendarGateway;
use slotwise_domain::{
    CalendarConfig, CalendarEvent, CreatedEvent, EventAttendee, EventDraft, Result, SlotwiseError,
};
use tracing::{debug, warn};

use super::auth::AccessTokenManager;
use crate::errors::classify_provider_error;
use crate::http::HttpClient;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// HTTP implementation of the calendar gateway.
pub struct HttpCalendarGateway {
    http: HttpClient,
    base_url: String,
    calendar_id: String,
    tokens: AccessTokenManager,
}

impl HttpCalendarGateway {
    pub fn new(config: &CalendarConfig, http: HttpClient) -> Self {
        let tokens = AccessTokenManager::new(config, http.clone());
        Self::with_parts(config, http, DEFAULT_API_BASE, tokens)
    }

    /// Use non-default endpoints (tests point these at a mock server).
    pub fn with_parts(
        config: &CalendarConfig,
        http: HttpClient,
        base_url: impl Into<String>,
        tokens: AccessTokenManager,
    ) -> Self {
        Self { http, base_url: base_url.into(), calendar_id: config.calendar_id.clone(), tokens }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    /// Read the body and classify a non-success response.
    async fn classify_response(response: reqwest::Response) -> SlotwiseError {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
        classify_provider_error(status, &body)
    }
}

#[async_trait]
impl CalendarGateway for HttpCalendarGateway {
    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let access_token = self.tokens.access_token().await?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        // Follow the pagination cursor until exhausted
        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .send(
                    self.http
                        .request(Method::GET, self.events_url())
                        .bearer_auth(&access_token)
                        .query(&query),
                )
                .await?;

            if !response.status().is_success() {
                return Err(Self::classify_response(response).await);
            }

            let page: ApiEventsResponse = response
                .json()
                .await
                .map_err(|e| SlotwiseError::Provider(format!("failed to parse events: {e}")))?;

            for item in page.items {
                match item.into_event() {
                    Ok(event) => events.push(event),
                    Err(e) => warn!(error = %e, "skipping unparseable calendar event"),
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = events.len(), "listed calendar events");
        Ok(events)
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<CreatedEvent> {
        let access_token = self.tokens.access_token().await?;

        let body = json!({
            "summary": draft.summary,
            "description": draft.description,
            "start": { "dateTime": draft.start.to_rfc3339() },
            "end": { "dateTime": draft.end.to_rfc3339() },
            "attendees": [
                { "email": draft.attendee_email, "displayName": draft.attendee_name }
            ],
        });

        // Creation dispatches the invitation email; not idempotent, so the
        // request is sent exactly once.
        let response = self
            .http
            .send_once(
                self.http
                    .request(Method::POST, self.events_url())
                    .bearer_auth(&access_token)
                    .query(&[("sendUpdates", "all")])
                    .json(&body),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_response(response).await);
        }

        let created: ApiCreatedEvent = response
            .json()
            .await
            .map_err(|e| SlotwiseError::Provider(format!("failed to parse created event: {e}")))?;

        Ok(CreatedEvent { id: created.id, link: created.html_link })
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .http
            .send_once(
                self.http
                    .request(Method::DELETE, self.event_url(event_id))
                    .bearer_auth(&access_token)
                    .query(&[("sendUpdates", "all")]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_response(response).await);
        }
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<CalendarEvent> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .http
            .send(
                self.http
                    .request(Method::GET, self.event_url(event_id))
                    .bearer_auth(&access_token),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_response(response).await);
        }

        let item: ApiEvent = response
            .json()
            .await
            .map_err(|e| SlotwiseError::Provider(format!("failed to parse event: {e}")))?;
        item.into_event()
    }
}

#[derive(Debug, Deserialize)]
struct ApiEventsResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    summary: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
    #[serde(default)]
    attendees: Vec<ApiAttendee>,
}

#[derive(Debug, Deserialize)]
struct ApiEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    /// All-day events carry a bare date instead of an instant.
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAttendee {
    email: String,
    #[serde(rename = "responseStatus")]
    response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCreatedEvent {
    id: String,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

impl ApiEvent {
    fn into_event(self) -> Result<CalendarEvent> {
        let start = self.start.to_instant("start")?;
        let end = self.end.to_instant("end")?;
        Ok(CalendarEvent {
            id: self.id,
            summary: self.summary,
            start,
            end,
            link: self.html_link,
            attendees: self
                .attendees
                .into_iter()
                .map(|a| EventAttendee { email: a.email, response_status: a.response_status })
                .collect(),
        })
    }
}

impl ApiEventTime {
    fn to_instant(&self, field: &str) -> Result<DateTime<Utc>> {
        if let Some(ref value) = self.date_time {
            return DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    SlotwiseError::Provider(format!("invalid {field} timestamp '{value}': {e}"))
                });
        }
        if let Some(ref value) = self.date {
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                SlotwiseError::Provider(format!("invalid {field} date '{value}': {e}"))
            })?;
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
                SlotwiseError::Provider(format!("invalid {field} date '{value}'"))
            })?;
            return Ok(midnight.and_utc());
        }
        Err(SlotwiseError::Provider(format!("event {field} has neither dateTime nor date")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
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

    async fn gateway(server: &MockServer) -> HttpCalendarGateway {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-abc",
                "expires_in": 3600
            })))
            .mount(server)
            .await;

        let http = HttpClient::builder()
            .base_backoff(std::time::Duration::from_millis(5))
            .build()
            .unwrap();
        let tokens = AccessTokenManager::with_endpoint(
            &config(),
            http.clone(),
            format!("{}/token", server.uri()),
        );
        HttpCalendarGateway::with_parts(&config(), http, server.uri(), tokens)
    }

    fn hour(h: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn list_events_follows_pagination() {
        let server = MockServer::start().await;
        let gw = gateway(&server).await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "ev-2", "summary": "Second",
                     "start": {"dateTime": "2026-03-02T12:00:00Z"},
                     "end": {"dateTime": "2026-03-02T13:00:00Z"}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "ev-1", "summary": "First",
                     "start": {"dateTime": "2026-03-02T09:00:00Z"},
                     "end": {"dateTime": "2026-03-02T10:00:00Z"}}
                ],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;

        let events = gw.list_events(hour(0), hour(23)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "ev-1");
        assert_eq!(events[1].id, "ev-2");
    }

    #[tokio::test]
    async fn create_event_sends_attendee_and_requests_invitation() {
        let server = MockServer::start().await;
        let gw = gateway(&server).await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(query_param("sendUpdates", "all"))
            .and(body_partial_json(json!({
                "summary": "Booking: Ada Lovelace",
                "attendees": [{"email": "ada@example.com"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ev-new",
                "htmlLink": "https://calendar.example.com/ev-new"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let draft = EventDraft {
            summary: "Booking: Ada Lovelace".into(),
            description: None,
            start: hour(9),
            end: hour(10),
            attendee_name: "Ada Lovelace".into(),
            attendee_email: "ada@example.com".into(),
        };

        let created = gw.create_event(&draft).await.unwrap();
        assert_eq!(created.id, "ev-new");
        assert_eq!(created.link.as_deref(), Some("https://calendar.example.com/ev-new"));
    }

    #[tokio::test]
    async fn deleting_missing_event_is_booking_not_found() {
        let server = MockServer::start().await;
        let gw = gateway(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/ev-gone"))
            .respond_with(ResponseTemplate::new(410).set_body_string("Resource has been deleted"))
            .mount(&server)
            .await;

        let err = gw.delete_event("ev-gone").await.unwrap_err();
        assert!(matches!(err, SlotwiseError::BookingNotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn get_event_reads_attendee_status_verbatim() {
        let server = MockServer::start().await;
        let gw = gateway(&server).await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/ev-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ev-1",
                "summary": "Booking: Ada",
                "start": {"dateTime": "2026-03-02T09:00:00Z"},
                "end": {"dateTime": "2026-03-02T10:00:00Z"},
                "htmlLink": "https://calendar.example.com/ev-1",
                "attendees": [
                    {"email": "ada@example.com", "responseStatus": "tentative"},
                    {"email": "second@example.com", "responseStatus": "accepted"}
                ]
            })))
            .mount(&server)
            .await;

        let event = gw.get_event("ev-1").await.unwrap();
        assert_eq!(event.attendees[0].response_status.as_deref(), Some("tentative"));
    }

    #[test]
    fn all_day_events_parse_from_bare_dates() {
        let time = ApiEventTime { date_time: None, date: Some("2026-03-02".into()) };
        assert_eq!(time.to_instant("start").unwrap(), hour(0));
    }
}
