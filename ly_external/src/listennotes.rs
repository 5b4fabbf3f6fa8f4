//! ABOUTME: ListenNotes client for the best-podcasts listing

use crate::http::{fetch_json, normalize_base};
use ly_core::Result;
use ly_db::NewPodcast;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://listen-api.listennotes.com/api/v2";

#[derive(Debug, Deserialize)]
struct ListenNotesPodcast {
    #[serde(default)]
    title: String,
    #[serde(default)]
    publisher: String,
    listennotes_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BestPodcastsResponse {
    #[serde(default)]
    podcasts: Vec<ListenNotesPodcast>,
}

#[derive(Debug, Clone)]
pub struct ListenNotesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ListenNotesClient {
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
    pub async fn best_podcasts(&self) -> Result<Vec<NewPodcast>> {
        let request = self
            .client
            .get(format!("{}/best_podcasts", self.base_url))
            .header("X-ListenAPI-Key", &self.api_key);
        let response: BestPodcastsResponse = fetch_json(request, "ListenNotes").await?;

        Ok(response
            .podcasts
            .into_iter()
            .map(|p| NewPodcast {
                title: p.title,
                publisher: p.publisher,
                url: p.listennotes_url,
            })
            .collect())
    }
}
