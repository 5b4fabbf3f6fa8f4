//! ABOUTME: Song search and trending that top up local results from providers
//! ABOUTME: Provider failures are logged and counted, never surfaced to callers

use crate::Providers;
use ly_core::{Error, Result};
use ly_db::{Db, NewSong, Song, SongRepository};
use ly_obs::Metrics;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which providers a search may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    All,
    Spotify,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::All => "all",
            Platform::Spotify => "spotify",
            Platform::Youtube => "youtube",
        }
    }

    fn includes_spotify(self) -> bool {
        matches!(self, Platform::All | Platform::Spotify)
    }

    fn includes_youtube(self) -> bool {
        matches!(self, Platform::All | Platform::Youtube)
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Platform::All),
            "spotify" => Ok(Platform::Spotify),
            "youtube" => Ok(Platform::Youtube),
            other => Err(Error::Validation(format!(
                "Unknown platform '{}', expected all, spotify or youtube",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MusicCatalog {
    providers: Providers,
    metrics: Option<Arc<Metrics>>,
}

impl MusicCatalog {
    pub fn new(providers: Providers) -> Self {
        Self {
            providers,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn provider_failed(&self, provider: &str, error: &Error) {
        warn!("{} lookup failed, continuing without it: {}", provider, error);
        if let Some(metrics) = &self.metrics {
            metrics.inc_external_failures(provider);
        }
    }

    /// Persist provider songs and append them until `limit` is reached
    async fn merge(
        &self,
        repo: &SongRepository<'_>,
        results: &mut Vec<Song>,
        found: Vec<NewSong>,
        limit: usize,
    ) -> Result<()> {
        for candidate in found {
            let stored = repo.save_if_new(candidate).await?;
            if results.len() < limit && !results.iter().any(|s| s.id == stored.id) {
                results.push(stored);
            }
        }
        Ok(())
    }

    /// Local matches first, then provider results for whatever is missing
    pub async fn search(
        &self,
        db: &Db,
        query: &str,
        limit: usize,
        platform: Platform,
    ) -> Result<Vec<Song>> {
        let repo = SongRepository::new(db.pool());
        let mut results = repo.search(query, limit as i64).await?;
        debug!("{} local matches for '{}'", results.len(), query);

        if results.len() >= limit {
            return Ok(results);
        }
        let remaining = (limit - results.len()) as u32;

        if platform.includes_spotify() {
            if let Some(spotify) = &self.providers.spotify {
                match spotify
                    .search_tracks(query, remaining, &self.providers.spotify_market)
                    .await
                {
                    Ok(found) => self.merge(&repo, &mut results, found, limit).await?,
                    Err(e) => self.provider_failed("spotify", &e),
                }
            }
        }

        if platform.includes_youtube() {
            if let Some(youtube) = &self.providers.youtube {
                match youtube.search_music_videos(query, remaining).await {
                    Ok(found) => self.merge(&repo, &mut results, found, limit).await?,
                    Err(e) => self.provider_failed("youtube", &e),
                }
            }
        }

        Ok(results)
    }

    /// Local trending songs topped up with provider charts
    pub async fn trending(&self, db: &Db, limit: usize, platform: Platform) -> Result<Vec<Song>> {
        let repo = SongRepository::new(db.pool());
        let mut results = repo.trending(limit as i64).await?;

        if results.len() >= limit {
            return Ok(results);
        }
        let remaining = (limit - results.len()) as u32;

        if platform.includes_spotify() {
            if let Some(spotify) = &self.providers.spotify {
                match spotify
                    .trending_tracks(remaining, &self.providers.spotify_market)
                    .await
                {
                    Ok(found) => self.merge(&repo, &mut results, found, limit).await?,
                    Err(e) => self.provider_failed("spotify", &e),
                }
            }
        }

        if platform.includes_youtube() {
            if let Some(youtube) = &self.providers.youtube {
                match youtube
                    .trending_music_videos(remaining, &self.providers.youtube_region)
                    .await
                {
                    Ok(found) => self.merge(&repo, &mut results, found, limit).await?,
                    Err(e) => self.provider_failed("youtube", &e),
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ly_config::ExternalConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_db() -> Db {
        Db::new(&test_support::temp_db_path("catalog")).await.unwrap()
    }

    fn youtube_catalog(server: &MockServer) -> MusicCatalog {
        let config = ExternalConfig {
            youtube_api_key: Some("k".to_string()),
            youtube_api_url: Some(server.uri()),
            ..Default::default()
        };
        MusicCatalog::new(Providers::from_config(&config).unwrap())
    }

    fn search_item(id: &str, title: &str) -> serde_json::Value {
        json!({"id": {"videoId": id}, "snippet": {"title": title, "channelTitle": "Chan"}})
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("".parse::<Platform>().unwrap(), Platform::All);
        assert_eq!("Spotify".parse::<Platform>().unwrap(), Platform::Spotify);
        assert_eq!("youtube".parse::<Platform>().unwrap(), Platform::Youtube);
        assert!("napster".parse::<Platform>().is_err());
    }

    #[tokio::test]
    async fn test_search_tops_up_and_persists() {
        let db = test_db().await;
        SongRepository::new(db.pool())
            .create(NewSong {
                title: "Local Blue".to_string(),
                popularity: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [search_item("y1", "Blue One"), search_item("y2", "Blue Two"), search_item("y3", "Blue Three")]
            })))
            .mount(&server)
            .await;

        let catalog = youtube_catalog(&server);
        let results = catalog.search(&db, "blue", 3, Platform::All).await.unwrap();
        let titles: Vec<_> = results.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Local Blue", "Blue One", "Blue Two"]);
        assert!(results.iter().all(|s| !s.id.is_empty()));

        // All provider results are stored even past the limit
        let stored = db.stats().await.unwrap().table_counts["songs"];
        assert_eq!(stored, 4);

        // A second search finds the stored songs locally
        let again = catalog.search(&db, "blue", 3, Platform::All).await.unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(db.stats().await.unwrap().table_counts["songs"], 4);
    }

    #[tokio::test]
    async fn test_platform_filter_skips_provider() {
        let db = test_db().await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let results = youtube_catalog(&server)
            .search(&db, "anything", 5, Platform::Spotify)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_local() {
        let db = test_db().await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let metrics = Arc::new(Metrics::new());
        let catalog = youtube_catalog(&server).with_metrics(metrics.clone());
        let results = catalog.trending(&db, 5, Platform::All).await.unwrap();
        assert!(results.is_empty());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("lyrica_external_api_failures_total{provider=\"youtube\"} 1"));
    }
}
