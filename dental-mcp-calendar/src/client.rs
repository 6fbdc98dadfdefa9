//! Google Calendar REST client.
//!
//! Only the four event calls the appointment tools need are implemented:
//! list, get, insert and update. Event fields the tools do not touch are kept
//! in [`Event::extra`] so an update writes them back unchanged.

use chrono::{DateTime, FixedOffset, NaiveDate};
use dental_mcp_common::auth::AuthProvider;
use dental_mcp_common::config::CalendarConfig;
use dental_mcp_common::error::Error;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Start or end of an event. Timed events carry `date_time`, all-day events `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// A timed boundary in the given IANA zone.
    pub fn timed(at: DateTime<FixedOffset>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(at),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }
}

/// Event attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single reminder override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// `email` or `popup`
    pub method: String,
    /// Minutes before the event start
    pub minutes: u32,
}

/// Reminder settings of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

/// Calendar event resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    /// Fields not modelled above (etag, htmlLink, organizer, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Start and end instants, if this is a timed event.
    pub fn timed_span(&self) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let start = self.start.as_ref()?.date_time?;
        let end = self.end.as_ref()?.date_time?;
        Some((start, end))
    }

    /// First and last (exclusive) day, if this is an all-day event.
    pub fn all_day_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start.as_ref()?.date?;
        let end = self.end.as_ref()?.date?;
        Some((start, end))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Thin client over the Calendar v3 events collection.
pub struct CalendarClient {
    http: reqwest::Client,
    auth: AuthProvider,
    base_url: String,
    calendar_id: String,
}

impl CalendarClient {
    /// Create a client for the configured calendar.
    pub fn new(config: &CalendarConfig, auth: AuthProvider) -> Self {
        Self::with_client(reqwest::Client::new(), config, auth)
    }

    /// Create a client with an explicit HTTP client.
    pub fn with_client(http: reqwest::Client, config: &CalendarConfig, auth: AuthProvider) -> Self {
        Self {
            http,
            auth,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// List single (expanded) events overlapping `[time_min, time_max)`, ordered by start.
    ///
    /// Follows `nextPageToken` until every page has been read.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_events(
        &self,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<Event>, Error> {
        let url = self.events_url();
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: EventsPage = self
                .send(&url, self.http.get(&url).query(&query))
                .await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = events.len(), "Listed events");
        Ok(events)
    }

    /// Fetch one event.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_event(&self, event_id: &str) -> Result<Event, Error> {
        let url = self.event_url(event_id);
        self.send(&url, self.http.get(&url)).await
    }

    /// Create an event and return it as stored.
    #[instrument(level = "debug", skip_all)]
    pub async fn insert_event(&self, event: &Event) -> Result<Event, Error> {
        let url = self.events_url();
        self.send(&url, self.http.post(&url).json(event)).await
    }

    /// Replace an event and return it as stored.
    #[instrument(level = "debug", skip(self, event))]
    pub async fn update_event(&self, event_id: &str, event: &Event) -> Result<Event, Error> {
        let url = self.event_url(event_id);
        self.send(&url, self.http.put(&url).json(event)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let token = self.auth.get_token().await?;

        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| Error::api(url, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Calendar API request failed");
            return Err(Error::api(url, status.as_u16(), body));
        }

        response.json().await.map_err(|e| {
            Error::api(url, status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }
}
