//! ABOUTME: Ticketmaster Discovery API client for upcoming music events

use crate::http::{fetch_json, normalize_base};
use ly_core::Result;
use ly_db::NewConcert;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://app.ticketmaster.com/discovery/v2";

#[derive(Debug, Default, Deserialize)]
struct Venue {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct EventEmbedded {
    #[serde(default)]
    venues: Vec<Venue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventStart {
    local_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventDates {
    #[serde(default)]
    start: EventStart,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    name: String,
    url: Option<String>,
    #[serde(default)]
    dates: EventDates,
    #[serde(rename = "_embedded", default)]
    embedded: EventEmbedded,
}

#[derive(Debug, Default, Deserialize)]
struct EventsEmbedded {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    // Absent entirely when a search has no results
    #[serde(rename = "_embedded", default)]
    embedded: EventsEmbedded,
}

#[derive(Debug, Clone)]
pub struct TicketmasterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TicketmasterClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base(base_url);
        self
    }

    #[instrument(skip(self))]
    pub async fn music_events(&self, city: &str, classification: &str) -> Result<Vec<NewConcert>> {
        let request = self
            .client
            .get(format!("{}/events.json", self.base_url))
            .query(&[
                ("classificationName", classification),
                ("city", city),
                ("apikey", self.api_key.as_str()),
            ]);
        let response: EventsResponse = fetch_json(request, "Ticketmaster").await?;

        Ok(response
            .embedded
            .events
            .into_iter()
            .map(|e| NewConcert {
                name: e.name,
                venue: e
                    .embedded
                    .venues
                    .into_iter()
                    .next()
                    .map(|v| v.name)
                    .unwrap_or_default(),
                date: e.dates.start.local_date,
                url: e.url,
            })
            .collect())
    }
}
