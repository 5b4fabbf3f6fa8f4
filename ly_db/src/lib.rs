//! ABOUTME: Database layer with SQLite, migrations, and repositories
//! ABOUTME: Handles all data persistence and database operations

use ly_core::{Error, Result};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Row, Sqlite, SqlitePool,
};
use tracing::{debug, info, instrument};

/// Tables reported by [`Db::stats`]
///
/// Table names cannot be bound as parameters, so only names from this list
/// are ever formatted into SQL.
const ALLOWED_TABLES: &[&str] = &[
    "users",
    "songs",
    "playlists",
    "liked_songs",
    "listening_history",
    "song_activity",
    "recently_played",
    "liked_titles",
    "preview_songs",
    "podcasts",
    "news",
    "concerts",
];

/// Checks that a table name contains only safe SQL identifier characters
///
/// It must be non-empty, start with a letter or underscore, and otherwise
/// contain only ASCII alphanumerics and underscores.
fn is_safe_sql_identifier(table: &str) -> bool {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Map a write failure, turning unique-constraint violations into `Conflict`
pub(crate) fn write_error(context: &str, conflict: &str, e: sqlx::Error) -> Error {
    let unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        Error::Conflict(conflict.to_string())
    } else {
        Error::Database(format!("{}: {}", context, e))
    }
}

/// Database connection pool and operations
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if needed) the database with default pool settings
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::connect(db_path, 10, true).await
    }

    /// Open the database and run migrations
    #[instrument(skip(db_path))]
    pub async fn connect(db_path: &str, pool_size: u32, wal: bool) -> Result<Self> {
        info!("Initializing database at: {}", db_path);

        let database_url = format!("sqlite://{}", db_path);
        if !Sqlite::database_exists(&database_url)
            .await
            .unwrap_or(false)
        {
            info!("Creating database: {}", database_url);
            Sqlite::create_database(&database_url)
                .await
                .map_err(|e| Error::Database(format!("Failed to create database: {}", e)))?;
        }

        let journal_mode = if wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .journal_mode(journal_mode)
            .create_if_missing(true)
            .foreign_keys(true)
            .pragma("synchronous", "NORMAL")
            .pragma("temp_store", "memory")
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1))
            .min_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| Error::Database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        info!("Database initialized successfully");
        Ok(db)
    }

    /// Run database migrations
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {}", e)))?;

        debug!("Database health check passed");
        Ok(())
    }

    /// Row counts for every known table
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DatabaseStats> {
        debug!("Gathering database statistics");

        let mut table_counts = std::collections::HashMap::new();

        for &table in ALLOWED_TABLES {
            if !is_safe_sql_identifier(table) {
                return Err(Error::Database(format!(
                    "ALLOWED_TABLES contains invalid SQL identifier: '{}'",
                    table
                )));
            }

            let query = format!("SELECT COUNT(*) as count FROM {}", table);
            let row = sqlx::query(&query)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(format!("Failed to get count for {}: {}", table, e))
                })?;

            let count: i64 = row.get("count");
            table_counts.insert(table.to_string(), count);
        }

        Ok(DatabaseStats { table_counts })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseStats {
    pub table_counts: std::collections::HashMap<String, i64>,
}

pub mod repositories;

pub use repositories::{
    activity::{LikedTitle, RecentPlay, SongActivityRepository, SongTally},
    content::{
        Concert, ContentRepository, NewConcert, NewNewsItem, NewPodcast, NewPreviewSong,
        NewsItem, Podcast, PreviewSong,
    },
    playlists::{Playlist, PlaylistRepository},
    songs::{LikeOutcome, NewSong, Song, SongRepository},
    users::{
        CreateUserRequest, HistoryEntry, ProfileUpdate, User, UserRepository, UserStats,
        HISTORY_LIMIT,
    },
};
