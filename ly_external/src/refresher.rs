//! ABOUTME: Periodic fetch of discover-page content from third-party providers
//! ABOUTME: Each source is independent; a failing source stores nothing for that pass

use crate::Providers;
use ly_config::ContentConfig;
use ly_core::Result;
use ly_db::{ContentRepository, Db};
use ly_obs::Metrics;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Items stored per source by one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub songs: usize,
    pub podcasts: usize,
    pub news: usize,
    pub concerts: usize,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.songs + self.podcasts + self.news + self.concerts
    }
}

pub struct ContentRefresher {
    db: Db,
    providers: Providers,
    config: ContentConfig,
    metrics: Option<Arc<Metrics>>,
}

impl ContentRefresher {
    pub fn new(db: Db, providers: Providers, config: ContentConfig) -> Self {
        Self {
            db,
            providers,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn limit<T>(&self, mut items: Vec<T>) -> Vec<T> {
        items.truncate(self.config.items_per_source as usize);
        items
    }

    /// Run one fetch-and-store step, turning any failure into a zero count
    async fn store<F>(&self, source: &str, step: F) -> usize
    where
        F: Future<Output = Result<usize>>,
    {
        match step.await {
            Ok(stored) => {
                debug!("Stored {} {} items", stored, source);
                if let Some(metrics) = &self.metrics {
                    metrics.add_items_stored(source, stored as u64);
                }
                stored
            }
            Err(e) => {
                warn!("Content refresh for {} failed: {}", source, e);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_external_failures(source);
                }
                0
            }
        }
    }

    async fn refresh_songs(&self) -> Result<usize> {
        let found = self.providers.deezer.search(&self.config.deezer_query).await?;
        ContentRepository::new(self.db.pool())
            .insert_preview_songs(&self.limit(found))
            .await
    }

    async fn refresh_podcasts(&self) -> Result<usize> {
        let Some(client) = &self.providers.listennotes else {
            return Ok(0);
        };
        let found = client.best_podcasts().await?;
        ContentRepository::new(self.db.pool())
            .insert_podcasts(&self.limit(found))
            .await
    }

    async fn refresh_news(&self) -> Result<usize> {
        let Some(client) = &self.providers.newsapi else {
            return Ok(0);
        };
        let found = client
            .top_headlines(&self.config.news_category, &self.config.news_language)
            .await?;
        ContentRepository::new(self.db.pool())
            .insert_news(&self.limit(found))
            .await
    }

    async fn refresh_concerts(&self) -> Result<usize> {
        let Some(client) = &self.providers.ticketmaster else {
            return Ok(0);
        };
        let found = client
            .music_events(
                &self.config.concert_city,
                &self.config.concert_classification,
            )
            .await?;
        ContentRepository::new(self.db.pool())
            .insert_concerts(&self.limit(found))
            .await
    }

    pub async fn refresh_once(&self) -> RefreshReport {
        let report = RefreshReport {
            songs: self.store("deezer", self.refresh_songs()).await,
            podcasts: self.store("listennotes", self.refresh_podcasts()).await,
            news: self.store("newsapi", self.refresh_news()).await,
            concerts: self.store("ticketmaster", self.refresh_concerts()).await,
        };

        if let Some(metrics) = &self.metrics {
            metrics.inc_refresh_runs();
        }
        info!(
            songs = report.songs,
            podcasts = report.podcasts,
            news = report.news,
            concerts = report.concerts,
            "Content refresh complete"
        );
        report
    }

    /// Refresh, then sleep for the configured interval, until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.config.refresh_interval_secs);
        info!(
            "Content refresher started, interval {}s",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.refresh_once() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Content refresher stopped");
    }
}
