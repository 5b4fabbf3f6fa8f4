//! ABOUTME: Playlist repository with per-owner scoping
//! ABOUTME: Songs in a playlist form an ordered set

use ly_core::{time::now_iso8601, Error, Id, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, FromRow)]
struct PlaylistRow {
    id: String,
    user_id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

/// Playlist with its songs in insertion order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub songs: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Playlist {
    fn from_row(row: PlaylistRow, songs: Vec<String>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            songs,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn not_found() -> Error {
    Error::NotFound("Playlist not found".to_string())
}

/// Playlist repository
pub struct PlaylistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PlaylistRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an empty playlist
    #[instrument(skip(self))]
    pub async fn create(&self, user_id: &str, name: &str) -> Result<Playlist> {
        let id = Id::new().to_string();
        let now = now_iso8601();

        let row = sqlx::query_as::<_, PlaylistRow>(
            r#"
            INSERT INTO playlists (id, user_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            RETURNING id, user_id, name, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create playlist: {}", e)))?;

        debug!("Created playlist: {}", id);
        Ok(Playlist::from_row(row, Vec::new()))
    }

    /// All playlists owned by a user, oldest first
    #[instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let rows = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, user_id, name, created_at, updated_at FROM playlists WHERE user_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list playlists: {}", e)))?;

        let entries: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT ps.playlist_id, ps.song_id
            FROM playlist_songs ps
            JOIN playlists p ON p.id = ps.playlist_id
            WHERE p.user_id = ?1
            ORDER BY ps.playlist_id, ps.position
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list playlist songs: {}", e)))?;

        let mut songs: HashMap<String, Vec<String>> = HashMap::new();
        for (playlist_id, song_id) in entries {
            songs.entry(playlist_id).or_default().push(song_id);
        }

        debug!("Found {} playlists", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| {
                let list = songs.remove(&row.id).unwrap_or_default();
                Playlist::from_row(row, list)
            })
            .collect())
    }

    /// Find a playlist visible to `user_id`
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, user_id: &str, id: &str) -> Result<Option<Playlist>> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, user_id, name, created_at, updated_at FROM playlists WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to find playlist: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let songs = sqlx::query_scalar(
            "SELECT song_id FROM playlist_songs WHERE playlist_id = ?1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load playlist songs: {}", e)))?;

        Ok(Some(Playlist::from_row(row, songs)))
    }

    async fn begin_owned(&self, user_id: &str, id: &str) -> Result<Transaction<'static, Sqlite>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let owned: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM playlists WHERE id = ?1 AND user_id = ?2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("Failed to check playlist owner: {}", e)))?;

        if owned.is_none() {
            return Err(not_found());
        }
        Ok(tx)
    }

    async fn touch(tx: &mut Transaction<'static, Sqlite>, id: &str) -> Result<()> {
        sqlx::query("UPDATE playlists SET updated_at = ?1 WHERE id = ?2")
            .bind(now_iso8601())
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to touch playlist: {}", e)))?;
        Ok(())
    }

    /// Append a song; returns false when it was already present
    #[instrument(skip(self))]
    pub async fn add_song(&self, user_id: &str, id: &str, song_id: &str) -> Result<bool> {
        let mut tx = self.begin_owned(user_id, id).await?;

        let added = sqlx::query(
            r#"
            INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, position, added_at)
            VALUES (?1, ?2,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_songs WHERE playlist_id = ?1),
                    ?3)
            "#,
        )
        .bind(id)
        .bind(song_id)
        .bind(now_iso8601())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to add song to playlist: {}", e)))?
        .rows_affected()
            > 0;

        if added {
            Self::touch(&mut tx, id).await?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit playlist change: {}", e)))?;

        debug!("Add song {} to playlist {}: {}", song_id, id, added);
        Ok(added)
    }

    /// Remove a song; returns false when it was not in the playlist
    #[instrument(skip(self))]
    pub async fn remove_song(&self, user_id: &str, id: &str, song_id: &str) -> Result<bool> {
        let mut tx = self.begin_owned(user_id, id).await?;

        let removed = sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2")
            .bind(id)
            .bind(song_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to remove song from playlist: {}", e)))?
            .rows_affected()
            > 0;

        if removed {
            Self::touch(&mut tx, id).await?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit playlist change: {}", e)))?;

        Ok(removed)
    }

    /// Delete a playlist and its entries
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete playlist: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        debug!("Deleted playlist: {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, user_id: &str, id: &str, new_name: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE playlists SET name = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(new_name)
        .bind(now_iso8601())
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to rename playlist: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db::{create_test_db, seed_user};

    #[tokio::test]
    async fn test_create_and_list() {
        let db = create_test_db().await;
        let repo = PlaylistRepository::new(db.pool());
        let user = seed_user(&db, "owner").await;

        let a = repo.create(&user.id, "Road Trip").await.unwrap();
        let b = repo.create(&user.id, "Focus").await.unwrap();
        assert!(a.songs.is_empty());

        repo.add_song(&user.id, &b.id, "s1").await.unwrap();

        let lists = repo.list_by_user(&user.id).await.unwrap();
        assert_eq!(lists.len(), 2);
        let focus = lists.iter().find(|p| p.id == b.id).unwrap();
        assert_eq!(focus.songs, vec!["s1".to_string()]);
        let road = lists.iter().find(|p| p.id == a.id).unwrap();
        assert!(road.songs.is_empty());
    }

    #[tokio::test]
    async fn test_add_song_has_set_semantics_and_keeps_order() {
        let db = create_test_db().await;
        let repo = PlaylistRepository::new(db.pool());
        let user = seed_user(&db, "setter").await;
        let playlist = repo.create(&user.id, "Mix").await.unwrap();

        assert!(repo.add_song(&user.id, &playlist.id, "b").await.unwrap());
        assert!(repo.add_song(&user.id, &playlist.id, "a").await.unwrap());
        assert!(!repo.add_song(&user.id, &playlist.id, "b").await.unwrap());

        let found = repo
            .find_by_id(&user.id, &playlist.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.songs, vec!["b".to_string(), "a".to_string()]);

        assert!(repo.remove_song(&user.id, &playlist.id, "b").await.unwrap());
        assert!(!repo.remove_song(&user.id, &playlist.id, "b").await.unwrap());
        let found = repo
            .find_by_id(&user.id, &playlist.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.songs, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_other_users_playlist_is_not_found() {
        let db = create_test_db().await;
        let repo = PlaylistRepository::new(db.pool());
        let owner = seed_user(&db, "mine").await;
        let intruder = seed_user(&db, "theirs").await;
        let playlist = repo.create(&owner.id, "Private").await.unwrap();

        assert!(repo
            .find_by_id(&intruder.id, &playlist.id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            repo.add_song(&intruder.id, &playlist.id, "x").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            repo.rename(&intruder.id, &playlist.id, "Hijacked").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&intruder.id, &playlist.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(repo.list_by_user(&intruder.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let db = create_test_db().await;
        let repo = PlaylistRepository::new(db.pool());
        let user = seed_user(&db, "renamer").await;
        let playlist = repo.create(&user.id, "Old").await.unwrap();
        repo.add_song(&user.id, &playlist.id, "s").await.unwrap();

        repo.rename(&user.id, &playlist.id, "New").await.unwrap();
        let found = repo
            .find_by_id(&user.id, &playlist.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "New");

        repo.delete(&user.id, &playlist.id).await.unwrap();
        assert!(repo
            .find_by_id(&user.id, &playlist.id)
            .await
            .unwrap()
            .is_none());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playlist_songs")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
