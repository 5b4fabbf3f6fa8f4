//! ABOUTME: Third-party music and content provider clients
//! ABOUTME: Builds configured clients and the services that combine them with storage

use ly_config::ExternalConfig;
use ly_core::Result;
use std::time::Duration;
use tracing::info;

pub mod catalog;
pub mod deezer;
mod http;
pub mod listennotes;
pub mod newsapi;
pub mod refresher;
pub mod spotify;
pub mod ticketmaster;
pub mod youtube;

pub use catalog::{MusicCatalog, Platform};
pub use deezer::DeezerClient;
pub use http::build_client;
pub use listennotes::ListenNotesClient;
pub use newsapi::NewsApiClient;
pub use refresher::{ContentRefresher, RefreshReport};
pub use spotify::SpotifyClient;
pub use ticketmaster::TicketmasterClient;
pub use youtube::YouTubeClient;

/// Every provider client, present only when its credentials are configured
///
/// Deezer needs no key and is always available.
#[derive(Debug, Clone)]
pub struct Providers {
    pub spotify: Option<SpotifyClient>,
    pub youtube: Option<YouTubeClient>,
    pub deezer: DeezerClient,
    pub listennotes: Option<ListenNotesClient>,
    pub newsapi: Option<NewsApiClient>,
    pub ticketmaster: Option<TicketmasterClient>,
    pub spotify_market: String,
    pub youtube_region: String,
}

fn key(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

impl Providers {
    pub fn from_config(config: &ExternalConfig) -> Result<Self> {
        let client = build_client(Duration::from_secs(config.request_timeout_secs))?;

        let spotify = config.is_spotify_configured().then(|| {
            SpotifyClient::new(
                client.clone(),
                key(&config.spotify_client_id),
                key(&config.spotify_client_secret),
            )
            .with_base_urls(
                config
                    .spotify_accounts_url
                    .as_deref()
                    .unwrap_or(spotify::DEFAULT_ACCOUNTS_URL),
                config
                    .spotify_api_url
                    .as_deref()
                    .unwrap_or(spotify::DEFAULT_API_URL),
            )
        });

        let youtube = config.is_youtube_configured().then(|| {
            YouTubeClient::new(client.clone(), key(&config.youtube_api_key)).with_base_url(
                config
                    .youtube_api_url
                    .as_deref()
                    .unwrap_or(youtube::DEFAULT_API_URL),
            )
        });

        let deezer = DeezerClient::new(client.clone()).with_base_url(
            config
                .deezer_api_url
                .as_deref()
                .unwrap_or(deezer::DEFAULT_API_URL),
        );

        let listennotes = config.is_listennotes_configured().then(|| {
            ListenNotesClient::new(client.clone(), key(&config.listennotes_api_key))
                .with_base_url(
                    config
                        .listennotes_api_url
                        .as_deref()
                        .unwrap_or(listennotes::DEFAULT_API_URL),
                )
        });

        let newsapi = config.is_newsapi_configured().then(|| {
            NewsApiClient::new(client.clone(), key(&config.newsapi_api_key)).with_base_url(
                config
                    .newsapi_api_url
                    .as_deref()
                    .unwrap_or(newsapi::DEFAULT_API_URL),
            )
        });

        let ticketmaster = config.is_ticketmaster_configured().then(|| {
            TicketmasterClient::new(client.clone(), key(&config.ticketmaster_api_key))
                .with_base_url(
                    config
                        .ticketmaster_api_url
                        .as_deref()
                        .unwrap_or(ticketmaster::DEFAULT_API_URL),
                )
        });

        info!(
            spotify = spotify.is_some(),
            youtube = youtube.is_some(),
            listennotes = listennotes.is_some(),
            newsapi = newsapi.is_some(),
            ticketmaster = ticketmaster.is_some(),
            "Provider clients configured"
        );

        Ok(Self {
            spotify,
            youtube,
            deezer,
            listennotes,
            newsapi,
            ticketmaster,
            spotify_market: config.spotify_market.clone(),
            youtube_region: config.youtube_region.clone(),
        })
    }
}
