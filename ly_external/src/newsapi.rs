//! ABOUTME: NewsAPI client for category top headlines

use crate::http::{fetch_json, normalize_base};
use ly_core::Result;
use ly_db::NewNewsItem;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://newsapi.org/v2";

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: String,
    source: Option<Source>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
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
    pub async fn top_headlines(&self, category: &str, language: &str) -> Result<Vec<NewNewsItem>> {
        let request = self
            .client
            .get(format!("{}/top-headlines", self.base_url))
            .query(&[
                ("category", category),
                ("language", language),
                ("apiKey", self.api_key.as_str()),
            ]);
        let response: HeadlinesResponse = fetch_json(request, "NewsAPI").await?;

        Ok(response
            .articles
            .into_iter()
            .map(|a| NewNewsItem {
                title: a.title,
                source: a.source.and_then(|s| s.name).unwrap_or_default(),
                url: a.url,
            })
            .collect())
    }
}
