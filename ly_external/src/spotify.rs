//! ABOUTME: Spotify Web API client using the client-credentials flow
//! ABOUTME: Maps Spotify tracks into catalogue songs

use crate::http::{fetch_json, normalize_base};
use ly_core::Result;
use ly_db::NewSong;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Seconds shaved off a token's lifetime so it is refreshed before expiry
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Track object as returned by search, tracks and playlist endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: i64,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
}

impl SpotifyTrack {
    pub fn into_song(self) -> NewSong {
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let (album, year, image_url) = match self.album {
            Some(album) => {
                let year = album
                    .release_date
                    .as_deref()
                    .and_then(|d| d.split('-').next())
                    .and_then(|y| y.parse().ok());
                let image = album.images.into_iter().next().map(|i| i.url);
                (album.name, year, image)
            }
            None => (String::new(), None, None),
        };

        NewSong {
            title: self.name,
            artist,
            album,
            duration: Some((self.duration_ms / 1000) as i64),
            year,
            spotify_id: self.id,
            preview_url: self.preview_url,
            image_url,
            popularity: self.popularity,
            explicit: self.explicit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<SpotifyTrack>>,
}

/// Featured playlist summary
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FeaturedResponse {
    playlists: Option<Paging<Option<SpotifyPlaylist>>>,
}

#[derive(Debug, Deserialize)]
struct NewReleasesResponse {
    albums: Option<Paging<SpotifyAlbum>>,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

/// Spotify API client
///
/// Cloning is cheap and clones share the cached access token.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    accounts_url: String,
    api_url: String,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl SpotifyClient {
    pub fn new(client: Client, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Point both the accounts and API endpoints somewhere else
    pub fn with_base_urls(mut self, accounts_url: &str, api_url: &str) -> Self {
        self.accounts_url = normalize_base(accounts_url);
        self.api_url = normalize_base(api_url);
        self
    }

    /// Return a cached token or request a new one
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let request = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")]);

        let response: TokenResponse = fetch_json(request, "Spotify accounts").await?;
        let lifetime = response.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        info!("Obtained Spotify access token valid for {}s", lifetime);
        Ok(response.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let token = self.access_token().await?;
        let request = self
            .client
            .get(format!("{}{}", self.api_url, endpoint))
            .bearer_auth(token)
            .query(params);
        fetch_json(request, "Spotify").await
    }

    #[instrument(skip(self))]
    pub async fn search_tracks(&self, query: &str, limit: u32, market: &str) -> Result<Vec<NewSong>> {
        let params = [
            ("q", query.to_string()),
            ("type", "track".to_string()),
            ("limit", limit.clamp(1, 50).to_string()),
            ("market", market.to_string()),
        ];
        let response: SearchResponse = self.get("/search", &params).await?;

        let songs: Vec<_> = response
            .tracks
            .map(|p| p.items)
            .unwrap_or_default()
            .into_iter()
            .map(SpotifyTrack::into_song)
            .collect();
        debug!("Spotify search returned {} tracks", songs.len());
        Ok(songs)
    }

    #[instrument(skip(self))]
    pub async fn get_track(&self, track_id: &str) -> Result<NewSong> {
        let track: SpotifyTrack = self.get(&format!("/tracks/{}", track_id), &[]).await?;
        Ok(track.into_song())
    }

    #[instrument(skip(self))]
    pub async fn featured_playlists(&self, limit: u32, market: &str) -> Result<Vec<SpotifyPlaylist>> {
        let params = [
            ("limit", limit.clamp(1, 50).to_string()),
            ("market", market.to_string()),
        ];
        let response: FeaturedResponse = self.get("/browse/featured-playlists", &params).await?;
        Ok(response
            .playlists
            .map(|p| p.items.into_iter().flatten().collect())
            .unwrap_or_default())
    }

    /// Tracks of recently released albums, at most `limit` in total
    #[instrument(skip(self))]
    pub async fn new_releases(&self, limit: u32, market: &str) -> Result<Vec<NewSong>> {
        let params = [
            ("limit", limit.clamp(1, 50).to_string()),
            ("market", market.to_string()),
        ];
        let response: NewReleasesResponse = self.get("/browse/new-releases", &params).await?;

        let mut songs = Vec::new();
        for album in response.albums.map(|p| p.items).unwrap_or_default() {
            if songs.len() >= limit as usize {
                break;
            }
            if let Some(album_id) = album.id {
                songs.extend(self.album_tracks(&album_id, 50).await?);
            }
        }
        songs.truncate(limit as usize);
        Ok(songs)
    }

    /// Full track details for every track on an album
    #[instrument(skip(self))]
    pub async fn album_tracks(&self, album_id: &str, limit: u32) -> Result<Vec<NewSong>> {
        let params = [("limit", limit.clamp(1, 50).to_string())];
        let page: Paging<TrackRef> = self
            .get(&format!("/albums/{}/tracks", album_id), &params)
            .await?;

        // Album listings omit album art and popularity, so fetch each track
        let mut songs = Vec::with_capacity(page.items.len());
        for id in page.items.into_iter().filter_map(|t| t.id) {
            songs.push(self.get_track(&id).await?);
        }
        Ok(songs)
    }

    #[instrument(skip(self))]
    pub async fn playlist_tracks(&self, playlist_id: &str, limit: u32) -> Result<Vec<NewSong>> {
        let params = [("limit", limit.clamp(1, 100).to_string())];
        let page: Paging<PlaylistItem> = self
            .get(&format!("/playlists/{}/tracks", playlist_id), &params)
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(SpotifyTrack::into_song)
            .collect())
    }

    /// Featured playlist tracks followed by new releases, deduplicated
    ///
    /// Either half failing is logged and the other half is still returned.
    #[instrument(skip(self))]
    pub async fn trending_tracks(&self, limit: u32, market: &str) -> Result<Vec<NewSong>> {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        match self.featured_playlists(5, market).await {
            Ok(playlists) => {
                for playlist in playlists {
                    match self.playlist_tracks(&playlist.id, 10).await {
                        Ok(tracks) => candidates.extend(tracks),
                        Err(e) => warn!("Skipping featured playlist {}: {}", playlist.id, e),
                    }
                }
            }
            Err(e) => failures.push(e),
        }

        match self.new_releases(10, market).await {
            Ok(tracks) => candidates.extend(tracks),
            Err(e) => failures.push(e),
        }

        if candidates.is_empty() {
            if let Some(e) = failures.into_iter().next() {
                return Err(e);
            }
            return Ok(Vec::new());
        }
        for e in failures {
            warn!("Partial Spotify trending result: {}", e);
        }

        Ok(dedupe_by_spotify_id(candidates, limit as usize))
    }
}

fn dedupe_by_spotify_id(songs: Vec<NewSong>, limit: usize) -> Vec<NewSong> {
    let mut seen = HashSet::new();
    songs
        .into_iter()
        .filter(|s| match &s.spotify_id {
            Some(id) => seen.insert(id.clone()),
            None => false,
        })
        .take(limit)
        .collect()
}
