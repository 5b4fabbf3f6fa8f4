//! ABOUTME: Repository for cached provider content shown on the discover page
//! ABOUTME: Preview songs, podcasts, news and concerts, inserted in batches

use ly_core::{time::now_iso8601, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreviewSong {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub preview_url: Option<String>,
    pub cover: Option<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPreviewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub preview_url: Option<String>,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: i64,
    pub title: String,
    pub publisher: String,
    pub url: Option<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPodcast {
    pub title: String,
    pub publisher: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub url: Option<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNewsItem {
    pub title: String,
    pub source: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Concert {
    pub id: i64,
    pub name: String,
    pub venue: String,
    pub date: Option<String>,
    pub url: Option<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewConcert {
    pub name: String,
    pub venue: String,
    pub date: Option<String>,
    pub url: Option<String>,
}

pub struct ContentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert preview songs in one transaction; returns the number stored
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_preview_songs(&self, items: &[NewPreviewSong]) -> Result<usize> {
        let now = now_iso8601();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        for item in items {
            sqlx::query(
                "INSERT INTO preview_songs (title, artist, album, preview_url, cover, fetched_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&item.title)
            .bind(&item.artist)
            .bind(&item.album)
            .bind(&item.preview_url)
            .bind(&item.cover)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to insert preview song: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit preview songs: {}", e)))?;

        debug!("Stored {} preview songs", items.len());
        Ok(items.len())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_podcasts(&self, items: &[NewPodcast]) -> Result<usize> {
        let now = now_iso8601();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        for item in items {
            sqlx::query("INSERT INTO podcasts (title, publisher, url, fetched_at) VALUES (?1, ?2, ?3, ?4)")
                .bind(&item.title)
                .bind(&item.publisher)
                .bind(&item.url)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("Failed to insert podcast: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit podcasts: {}", e)))?;

        debug!("Stored {} podcasts", items.len());
        Ok(items.len())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_news(&self, items: &[NewNewsItem]) -> Result<usize> {
        let now = now_iso8601();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        for item in items {
            sqlx::query("INSERT INTO news (title, source, url, fetched_at) VALUES (?1, ?2, ?3, ?4)")
                .bind(&item.title)
                .bind(&item.source)
                .bind(&item.url)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("Failed to insert news item: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit news: {}", e)))?;

        debug!("Stored {} news items", items.len());
        Ok(items.len())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_concerts(&self, items: &[NewConcert]) -> Result<usize> {
        let now = now_iso8601();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        for item in items {
            sqlx::query(
                "INSERT INTO concerts (name, venue, date, url, fetched_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&item.name)
            .bind(&item.venue)
            .bind(&item.date)
            .bind(&item.url)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to insert concert: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit concerts: {}", e)))?;

        debug!("Stored {} concerts", items.len());
        Ok(items.len())
    }

    /// Most recently fetched preview songs
    #[instrument(skip(self))]
    pub async fn latest_preview_songs(&self, limit: i64) -> Result<Vec<PreviewSong>> {
        sqlx::query_as::<_, PreviewSong>(
            "SELECT id, title, artist, album, preview_url, cover, fetched_at FROM preview_songs ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load preview songs: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn latest_podcasts(&self, limit: i64) -> Result<Vec<Podcast>> {
        sqlx::query_as::<_, Podcast>(
            "SELECT id, title, publisher, url, fetched_at FROM podcasts ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load podcasts: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn latest_news(&self, limit: i64) -> Result<Vec<NewsItem>> {
        sqlx::query_as::<_, NewsItem>(
            "SELECT id, title, source, url, fetched_at FROM news ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load news: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn latest_concerts(&self, limit: i64) -> Result<Vec<Concert>> {
        sqlx::query_as::<_, Concert>(
            "SELECT id, name, venue, date, url, fetched_at FROM concerts ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load concerts: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db::create_test_db;

    #[tokio::test]
    async fn test_latest_returns_newest_first() {
        let db = create_test_db().await;
        let repo = ContentRepository::new(db.pool());

        let podcasts: Vec<_> = (0..7)
            .map(|i| NewPodcast {
                title: format!("Episode {}", i),
                publisher: "Pod Co".to_string(),
                url: Some(format!("https://listen.example/{}", i)),
            })
            .collect();
        assert_eq!(repo.insert_podcasts(&podcasts).await.unwrap(), 7);

        let latest = repo.latest_podcasts(5).await.unwrap();
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].title, "Episode 6");
        assert_eq!(latest[4].title, "Episode 2");
    }

    #[tokio::test]
    async fn test_each_content_table_round_trips() {
        let db = create_test_db().await;
        let repo = ContentRepository::new(db.pool());

        repo.insert_preview_songs(&[NewPreviewSong {
            title: "Preview".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            preview_url: Some("https://cdn.example/p.mp3".to_string()),
            cover: None,
        }])
        .await
        .unwrap();
        repo.insert_news(&[NewNewsItem {
            title: "Headline".to_string(),
            source: "Wire".to_string(),
            url: None,
        }])
        .await
        .unwrap();
        repo.insert_concerts(&[NewConcert {
            name: "Live".to_string(),
            venue: "Arena".to_string(),
            date: Some("2026-01-31".to_string()),
            url: None,
        }])
        .await
        .unwrap();

        assert_eq!(repo.latest_preview_songs(5).await.unwrap()[0].album, "Album");
        assert_eq!(repo.latest_news(5).await.unwrap()[0].source, "Wire");
        let concerts = repo.latest_concerts(5).await.unwrap();
        assert_eq!(concerts[0].venue, "Arena");
        assert_eq!(concerts[0].date.as_deref(), Some("2026-01-31"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let db = create_test_db().await;
        let repo = ContentRepository::new(db.pool());
        assert_eq!(repo.insert_concerts(&[]).await.unwrap(), 0);
        assert!(repo.latest_concerts(5).await.unwrap().is_empty());
    }
}
