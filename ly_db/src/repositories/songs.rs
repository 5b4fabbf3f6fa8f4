//! ABOUTME: Song repository for the catalogue and its play/like counters
//! ABOUTME: Counter updates are single atomic statements

use ly_core::{time::now_iso8601, Error, Id, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, instrument};

const SONG_COLUMNS: &str = "id, title, artist, album, duration, genre, year, spotify_id, \
     youtube_id, lastfm_id, preview_url, image_url, popularity, explicit, play_count, \
     like_count, created_at, updated_at";

/// Song entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Length in seconds
    pub duration: Option<i64>,
    pub genre: Option<String>,
    pub year: Option<i64>,
    pub spotify_id: Option<String>,
    pub youtube_id: Option<String>,
    #[serde(skip_serializing)]
    pub lastfm_id: Option<String>,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub popularity: i64,
    pub explicit: bool,
    pub play_count: i64,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Song fields as produced by a provider mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Option<i64>,
    pub genre: Option<String>,
    pub year: Option<i64>,
    pub spotify_id: Option<String>,
    pub youtube_id: Option<String>,
    pub lastfm_id: Option<String>,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub popularity: i64,
    pub explicit: bool,
    /// Seed value; YouTube reports likes directly
    pub like_count: i64,
}

/// Result of a like or unlike call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    /// Whether the call changed the user's like state
    pub changed: bool,
    pub like_count: i64,
}

/// Escape `%`, `_` and the escape char itself for a LIKE pattern
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Song repository
pub struct SongRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SongRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    fn insert_sql(on_conflict: &str) -> String {
        format!(
            r#"
            INSERT INTO songs (id, title, artist, album, duration, genre, year, spotify_id,
                               youtube_id, lastfm_id, preview_url, image_url, popularity,
                               explicit, like_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            {}
            RETURNING {}
            "#,
            on_conflict, SONG_COLUMNS
        )
    }

    fn bind_new<'q>(
        sql: &'q str,
        song: NewSong,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, Song, sqlx::sqlite::SqliteArguments<'q>> {
        sqlx::query_as::<_, Song>(sql)
            .bind(Id::new().to_string())
            .bind(song.title)
            .bind(song.artist)
            .bind(song.album)
            .bind(song.duration)
            .bind(song.genre)
            .bind(song.year)
            .bind(song.spotify_id)
            .bind(song.youtube_id)
            .bind(song.lastfm_id)
            .bind(song.preview_url)
            .bind(song.image_url)
            .bind(song.popularity)
            .bind(song.explicit)
            .bind(song.like_count.max(0))
            .bind(now_iso8601())
    }

    /// Insert a song unconditionally
    #[instrument(skip(self, song), fields(title = %song.title))]
    pub async fn create(&self, song: NewSong) -> Result<Song> {
        let sql = Self::insert_sql("");
        let song = Self::bind_new(&sql, song)
            .fetch_one(self.pool)
            .await
            .map_err(|e| crate::write_error("Failed to create song", "Song already exists", e))?;

        debug!("Created song: {}", song.id);
        Ok(song)
    }

    /// Store a provider song unless one with the same Spotify or YouTube id exists
    ///
    /// Returns the stored row either way.
    #[instrument(skip(self, song), fields(title = %song.title))]
    pub async fn save_if_new(&self, song: NewSong) -> Result<Song> {
        if let Some(existing) = self.find_existing(&song).await? {
            return Ok(existing);
        }

        let sql = Self::insert_sql("ON CONFLICT DO NOTHING");
        let lookup = song.clone();
        let inserted = Self::bind_new(&sql, song)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to save song: {}", e)))?;

        match inserted {
            Some(song) => {
                debug!("Saved new song: {}", song.id);
                Ok(song)
            }
            // Lost a race with a concurrent insert of the same track
            None => self
                .find_existing(&lookup)
                .await?
                .ok_or_else(|| Error::Database("Song vanished after conflict".to_string())),
        }
    }

    async fn find_existing(&self, song: &NewSong) -> Result<Option<Song>> {
        if let Some(spotify_id) = song.spotify_id.as_deref() {
            if let Some(found) = self.find_by_spotify_id(spotify_id).await? {
                return Ok(Some(found));
            }
        }
        if let Some(youtube_id) = song.youtube_id.as_deref() {
            if let Some(found) = self.find_by_youtube_id(youtube_id).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Song>> {
        let sql = format!("SELECT {} FROM songs WHERE {} = ?1", SONG_COLUMNS, column);
        sqlx::query_as::<_, Song>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find song by {}: {}", column, e)))
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Song>> {
        self.find_one("id", id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_spotify_id(&self, spotify_id: &str) -> Result<Option<Song>> {
        self.find_one("spotify_id", spotify_id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_youtube_id(&self, youtube_id: &str) -> Result<Option<Song>> {
        self.find_one("youtube_id", youtube_id).await
    }

    /// Case-insensitive substring search over title, artist and album
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Song>> {
        let sql = format!(
            r#"
            SELECT {} FROM songs
            WHERE title LIKE ?1 ESCAPE '\' OR artist LIKE ?1 ESCAPE '\' OR album LIKE ?1 ESCAPE '\'
            ORDER BY popularity DESC, id
            LIMIT ?2
            "#,
            SONG_COLUMNS
        );

        let songs = sqlx::query_as::<_, Song>(&sql)
            .bind(like_pattern(query.trim()))
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to search songs: {}", e)))?;

        debug!("Search matched {} songs", songs.len());
        Ok(songs)
    }

    /// Songs ordered by `play_count * 0.3 + popularity * 0.7`
    #[instrument(skip(self))]
    pub async fn trending(&self, limit: i64) -> Result<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs ORDER BY (play_count * 0.3 + popularity * 0.7) DESC, id LIMIT ?1",
            SONG_COLUMNS
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load trending songs: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn by_genre(&self, genre: &str, limit: i64) -> Result<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs WHERE genre = ?1 COLLATE NOCASE ORDER BY popularity DESC, id LIMIT ?2",
            SONG_COLUMNS
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(genre)
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load songs by genre: {}", e)))
    }

    /// Atomically bump the play counter and return the new value
    #[instrument(skip(self))]
    pub async fn increment_play_count(&self, id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "UPDATE songs SET play_count = play_count + 1, updated_at = ?1 WHERE id = ?2 RETURNING play_count",
        )
        .bind(now_iso8601())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to increment play count: {}", e)))?
        .ok_or_else(|| Error::NotFound("Song not found".to_string()))
    }

    /// Like a song; repeated likes by the same user leave the counter alone
    #[instrument(skip(self))]
    pub async fn like(&self, user_id: &str, song_id: &str) -> Result<LikeOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: i64 = sqlx::query_scalar("SELECT like_count FROM songs WHERE id = ?1")
            .bind(song_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to load song: {}", e)))?
            .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;

        let now = now_iso8601();
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO liked_songs (user_id, song_id, liked_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(song_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to record like: {}", e)))?
        .rows_affected()
            > 0;

        let like_count = if inserted {
            sqlx::query_scalar(
                "UPDATE songs SET like_count = like_count + 1, updated_at = ?1 WHERE id = ?2 RETURNING like_count",
            )
            .bind(&now)
            .bind(song_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to increment like count: {}", e)))?
        } else {
            current
        };

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit like: {}", e)))?;

        Ok(LikeOutcome {
            changed: inserted,
            like_count,
        })
    }

    /// Remove a like; the counter never drops below zero
    #[instrument(skip(self))]
    pub async fn unlike(&self, user_id: &str, song_id: &str) -> Result<LikeOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: i64 = sqlx::query_scalar("SELECT like_count FROM songs WHERE id = ?1")
            .bind(song_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to load song: {}", e)))?
            .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;

        let removed = sqlx::query("DELETE FROM liked_songs WHERE user_id = ?1 AND song_id = ?2")
            .bind(user_id)
            .bind(song_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to remove like: {}", e)))?
            .rows_affected()
            > 0;

        let like_count = if removed {
            sqlx::query_scalar(
                "UPDATE songs SET like_count = MAX(like_count - 1, 0), updated_at = ?1 WHERE id = ?2 RETURNING like_count",
            )
            .bind(now_iso8601())
            .bind(song_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to decrement like count: {}", e)))?
        } else {
            current
        };

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit unlike: {}", e)))?;

        Ok(LikeOutcome {
            changed: removed,
            like_count,
        })
    }
}
