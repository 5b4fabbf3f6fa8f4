//! ABOUTME: Song activity repository: global play tally, recent plays, liked titles
//! ABOUTME: Keys are free-form so anonymous callers can record under the guest id

use ly_core::{time::now_iso8601, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, instrument};

/// Global play tally for one song
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SongTally {
    pub song_id: String,
    pub song_title: String,
    pub play_count: i64,
    pub last_played: String,
}

/// One entry in a user's recently played log
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecentPlay {
    pub song_id: String,
    pub song_title: String,
    pub played_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LikedTitle {
    pub song_title: String,
    pub liked_at: String,
}

pub struct SongActivityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SongActivityRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Count a play in the global tally and append it to the user's recent log
    #[instrument(skip(self))]
    pub async fn log_play(&self, user_id: &str, song_id: &str, song_title: &str) -> Result<SongTally> {
        let now = now_iso8601();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let tally = sqlx::query_as::<_, SongTally>(
            r#"
            INSERT INTO song_activity (song_id, song_title, play_count, last_played)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(song_id) DO UPDATE
                SET play_count = play_count + 1, last_played = excluded.last_played
            RETURNING song_id, song_title, play_count, last_played
            "#,
        )
        .bind(song_id)
        .bind(song_title)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to update play tally: {}", e)))?;

        sqlx::query(
            "INSERT INTO recently_played (user_id, song_id, song_title, played_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(song_id)
        .bind(song_title)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to record recent play: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit play: {}", e)))?;

        debug!("Song {} now has {} plays", tally.song_id, tally.play_count);
        Ok(tally)
    }

    /// Most played songs
    #[instrument(skip(self))]
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<SongTally>> {
        sqlx::query_as::<_, SongTally>(
            r#"
            SELECT song_id, song_title, play_count, last_played
            FROM song_activity
            ORDER BY play_count DESC, last_played DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load leaderboard: {}", e)))
    }

    /// A user's plays, newest first
    #[instrument(skip(self))]
    pub async fn recent_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<RecentPlay>> {
        sqlx::query_as::<_, RecentPlay>(
            r#"
            SELECT song_id, song_title, played_at
            FROM recently_played
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load recent plays: {}", e)))
    }

    /// Drop every recent entry with this title; true when something was removed
    #[instrument(skip(self))]
    pub async fn delete_from_recent(&self, user_id: &str, song_title: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recently_played WHERE user_id = ?1 AND song_title = ?2")
            .bind(user_id)
            .bind(song_title)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete recent play: {}", e)))?;

        debug!("Removed {} recent entries", result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    /// Mark a title as liked; true when it was not liked before
    #[instrument(skip(self))]
    pub async fn add_to_liked(&self, user_id: &str, song_title: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO liked_titles (user_id, song_title, liked_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(song_title)
        .bind(now_iso8601())
        .execute(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to like title: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn remove_from_liked(&self, user_id: &str, song_title: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM liked_titles WHERE user_id = ?1 AND song_title = ?2")
            .bind(user_id)
            .bind(song_title)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to unlike title: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Liked titles, most recently liked first
    #[instrument(skip(self))]
    pub async fn liked_by_user(&self, user_id: &str) -> Result<Vec<LikedTitle>> {
        sqlx::query_as::<_, LikedTitle>(
            "SELECT song_title, liked_at FROM liked_titles WHERE user_id = ?1 ORDER BY rowid DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load liked titles: {}", e)))
    }
}
