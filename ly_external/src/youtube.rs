//! ABOUTME: YouTube Data API client for music videos
//! ABOUTME: Maps video snippets and statistics into catalogue songs

use crate::http::{fetch_json, normalize_base};
use ly_core::Result;
use ly_db::NewSong;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube's "Music" video category
const MUSIC_CATEGORY_ID: &str = "10";

/// Search results wrap the id in an object; `videos` returns it bare
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum VideoId {
    Bare(String),
    Wrapped {
        #[serde(rename = "videoId")]
        video_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    id: Option<VideoId>,
    #[serde(default)]
    snippet: Snippet,
    statistics: Option<Statistics>,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

/// Parse an ISO-8601 duration such as `PT1H4M13S` into seconds
pub fn parse_duration(value: &str) -> Option<i64> {
    let rest = value.strip_prefix('P')?;
    let mut total: i64 = 0;
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'D') => 86_400,
                    (false, 'W') => 604_800,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                total = total.checked_add(n.checked_mul(scale)?)?;
            }
        }
    }

    number.is_empty().then_some(total)
}

impl Video {
    fn into_song(self, include_stats: bool) -> Option<NewSong> {
        let youtube_id = match self.id? {
            VideoId::Bare(id) => id,
            VideoId::Wrapped { video_id } => video_id?,
        };
        let snippet = self.snippet;

        let full_title = snippet.title.replace(" - Topic", "");
        let (artist, title) = match full_title.split_once(" - ") {
            Some((artist, rest)) => {
                // "A - B - C" keeps only the segment after the artist
                let title = rest.split(" - ").next().unwrap_or(rest);
                (artist.trim().to_string(), title.trim().to_string())
            }
            None if snippet.channel_title.is_empty() => {
                ("Unknown Artist".to_string(), full_title.clone())
            }
            None => (snippet.channel_title.clone(), full_title.clone()),
        };

        let album = snippet
            .description
            .lines()
            .find(|line| line.contains("Album:"))
            .map(|line| line.replace("Album:", "").trim().to_string())
            .unwrap_or_default();

        let year = snippet
            .published_at
            .as_deref()
            .and_then(|p| p.split('-').next())
            .and_then(|y| y.parse().ok());

        let image_url = snippet.thumbnails.get("high").and_then(|t| t.url.clone());

        let mut song = NewSong {
            title,
            artist,
            album,
            year,
            youtube_id: Some(youtube_id),
            image_url,
            ..Default::default()
        };

        if include_stats {
            song.duration = self
                .content_details
                .and_then(|d| d.duration)
                .and_then(|d| parse_duration(&d));
            if let Some(stats) = self.statistics {
                let views: i64 = stats
                    .view_count
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                song.popularity = views / 1000;
                song.like_count = stats
                    .like_count
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
        }

        Some(song)
    }
}

/// YouTube Data API v3 client
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
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

    async fn list(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<Video>> {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .query(params)
            .query(&[("key", self.api_key.as_str())]);
        let response: ListResponse = fetch_json(request, "YouTube").await?;
        Ok(response.items)
    }

    /// Search music-category videos; the query gets " music" appended
    #[instrument(skip(self))]
    pub async fn search_music_videos(&self, query: &str, max_results: u32) -> Result<Vec<NewSong>> {
        let params = [
            ("part", "snippet".to_string()),
            ("q", format!("{} music", query)),
            ("type", "video".to_string()),
            ("maxResults", max_results.clamp(1, 50).to_string()),
            ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
            ("order", "relevance".to_string()),
        ];
        let videos = self.list("/search", &params).await?;
        let songs: Vec<_> = videos.into_iter().filter_map(|v| v.into_song(false)).collect();
        debug!("YouTube search returned {} videos", songs.len());
        Ok(songs)
    }

    /// Snippet, statistics and duration for one video
    #[instrument(skip(self))]
    pub async fn video_details(&self, video_id: &str) -> Result<Option<NewSong>> {
        let params = [
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("id", video_id.to_string()),
        ];
        let videos = self.list("/videos", &params).await?;
        Ok(videos.into_iter().next().and_then(|v| v.into_song(true)))
    }

    #[instrument(skip(self))]
    pub async fn trending_music_videos(&self, max_results: u32, region: &str) -> Result<Vec<NewSong>> {
        let params = [
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("chart", "mostPopular".to_string()),
            ("regionCode", region.to_string()),
            ("maxResults", max_results.clamp(1, 50).to_string()),
            ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
        ];
        let videos = self.list("/videos", &params).await?;
        Ok(videos.into_iter().filter_map(|v| v.into_song(true)).collect())
    }

    pub async fn search_by_artist(&self, artist: &str, max_results: u32) -> Result<Vec<NewSong>> {
        self.search_music_videos(&format!("{} official music video", artist), max_results)
            .await
    }

    /// Videos found by searching for a video's own title and artist
    #[instrument(skip(self))]
    pub async fn related_videos(&self, video_id: &str, max_results: u32) -> Result<Vec<NewSong>> {
        match self.video_details(video_id).await? {
            Some(details) => {
                self.search_music_videos(
                    &format!("{} {}", details.title, details.artist),
                    max_results,
                )
                .await
            }
            None => Ok(Vec::new()),
        }
    }
}
