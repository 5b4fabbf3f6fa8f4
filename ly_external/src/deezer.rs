//! ABOUTME: Deezer search client for 30-second preview tracks
//! ABOUTME: No API key is required

use crate::http::{fetch_json, normalize_base};
use ly_core::{Error, Result};
use ly_db::NewPreviewSong;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.deezer.com";

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeezerAlbum {
    #[serde(default)]
    title: String,
    cover_medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    #[serde(default)]
    title: String,
    preview: Option<String>,
    artist: Option<Named>,
    album: Option<DeezerAlbum>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<DeezerTrack>,
    // Deezer reports some failures with a 200 and an error object
    error: Option<DeezerError>,
}

impl From<DeezerTrack> for NewPreviewSong {
    fn from(track: DeezerTrack) -> Self {
        let (album, cover) = match track.album {
            Some(a) => (a.title, a.cover_medium),
            None => (String::new(), None),
        };
        Self {
            title: track.title,
            artist: track.artist.map(|a| a.name).unwrap_or_default(),
            album,
            preview_url: track.preview.filter(|p| !p.is_empty()),
            cover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeezerClient {
    client: Client,
    base_url: String,
}

impl DeezerClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base(base_url);
        self
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<NewPreviewSong>> {
        let request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)]);
        let response: SearchResponse = fetch_json(request, "Deezer").await?;

        if let Some(error) = response.error {
            return Err(Error::External(format!("Deezer error: {}", error.message)));
        }

        debug!("Deezer returned {} tracks", response.data.len());
        Ok(response.data.into_iter().map(Into::into).collect())
    }
}
