//! ABOUTME: User repository for accounts, preferences and listening history
//! ABOUTME: Email and username uniqueness violations surface as conflicts

use crate::write_error;
use ly_core::{time::now_iso8601, Error, Id, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, SqlitePool};
use tracing::{debug, instrument};

/// Listening history entries kept per user; older rows are trimmed
pub const HISTORY_LIMIT: i64 = 1000;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     date_of_birth, gender, profile_picture, is_premium, is_active, preferences, \
     created_at, updated_at, last_login";

const DUPLICATE_USER: &str = "Email or username already registered";

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub gender: String,
    pub profile_picture: String,
    pub is_premium: bool,
    pub is_active: bool,
    pub preferences: Json<Value>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

/// Request to create a new user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub gender: String,
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
    }
}

/// One listening history row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    pub song_id: String,
    pub played_at: String,
}

/// Per-user counts shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct UserStats {
    pub playlist_count: i64,
    pub liked_count: i64,
    pub history_count: i64,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with default preferences
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Id::new().to_string();
        let now = now_iso8601();

        debug!("Creating user with id: {}", id);

        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name,
                               date_of_birth, gender, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(request.username)
            .bind(request.email)
            .bind(request.password_hash)
            .bind(request.first_name)
            .bind(request.last_name)
            .bind(request.date_of_birth.filter(|d| !d.is_empty()))
            .bind(request.gender)
            .bind(&now)
            .fetch_one(self.pool)
            .await
            .map_err(|e| write_error("Failed to create user", DUPLICATE_USER, e))?;

        debug!("Successfully created user: {}", user.id);
        Ok(user)
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find user by {}: {}", column, e)))
    }

    /// Find a user by ID
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        debug!("Finding user by id: {}", id);
        self.find_one("id", id).await
    }

    /// Find a user by email (case-insensitive)
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        debug!("Finding user by email");
        self.find_one("email", email.trim()).await
    }

    /// Find a user by username
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        debug!("Finding user by username: {}", username);
        self.find_one("username", username).await
    }

    /// Apply a partial profile update
    ///
    /// An empty `date_of_birth` clears the stored value.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<User> {
        if update.is_empty() {
            return Err(Error::Validation("No fields to update".to_string()));
        }

        debug!("Updating profile for user: {}", id);

        let clear_dob = update.date_of_birth.as_deref() == Some("");
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = COALESCE(?1, first_name),
                last_name = COALESCE(?2, last_name),
                username = COALESCE(?3, username),
                date_of_birth = CASE WHEN ?4 THEN NULL ELSE COALESCE(?5, date_of_birth) END,
                gender = COALESCE(?6, gender),
                updated_at = ?7
            WHERE id = ?8
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(update.first_name)
            .bind(update.last_name)
            .bind(update.username)
            .bind(clear_dob)
            .bind(update.date_of_birth.filter(|d| !d.is_empty()))
            .bind(update.gender)
            .bind(now_iso8601())
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| write_error("Failed to update profile", "Username already taken", e))?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Replace the stored password hash
    #[instrument(skip(self, password_hash))]
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(now_iso8601())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update password: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Record a successful login
    #[instrument(skip(self))]
    pub async fn touch_last_login(&self, id: &str) -> Result<String> {
        let now = now_iso8601();
        sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
            .bind(&now)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update last login: {}", e)))?;
        Ok(now)
    }

    /// Shallow-merge `changes` into the stored preferences object
    #[instrument(skip(self, changes))]
    pub async fn update_preferences(&self, id: &str, changes: Map<String, Value>) -> Result<Value> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Json<Value> =
            sqlx::query_scalar("SELECT preferences FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("Failed to load preferences: {}", e)))?
                .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let mut merged = match current.0 {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(changes);
        let merged = Value::Object(merged);

        sqlx::query("UPDATE users SET preferences = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(Json(&merged))
            .bind(now_iso8601())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to update preferences: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit preferences: {}", e)))?;

        debug!("Updated preferences for user: {}", id);
        Ok(merged)
    }

    /// Song ids the user has liked, oldest first
    #[instrument(skip(self))]
    pub async fn list_liked_song_ids(&self, id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT song_id FROM liked_songs WHERE user_id = ?1 ORDER BY liked_at, rowid")
            .bind(id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list liked songs: {}", e)))
    }

    /// Playlist ids owned by the user, oldest first
    #[instrument(skip(self))]
    pub async fn list_playlist_ids(&self, id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT id FROM playlists WHERE user_id = ?1 ORDER BY created_at, rowid")
            .bind(id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to list playlists: {}", e)))
    }

    /// Most recent listening history first
    #[instrument(skip(self))]
    pub async fn listening_history(&self, id: &str, limit: i64) -> Result<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(
            "SELECT song_id, played_at FROM listening_history WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load listening history: {}", e)))
    }

    /// Append to listening history, trimming to [`HISTORY_LIMIT`] entries
    #[instrument(skip(self))]
    pub async fn add_to_history(&self, id: &str, song_id: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("INSERT INTO listening_history (user_id, song_id, played_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(song_id)
            .bind(now_iso8601())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to append listening history: {}", e)))?;

        let trimmed = sqlx::query(
            r#"
            DELETE FROM listening_history
            WHERE user_id = ?1
              AND id NOT IN (
                  SELECT id FROM listening_history WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2
              )
            "#,
        )
        .bind(id)
        .bind(HISTORY_LIMIT)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to trim listening history: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit listening history: {}", e)))?;

        if trimmed.rows_affected() > 0 {
            debug!("Trimmed {} old history entries", trimmed.rows_affected());
        }
        Ok(())
    }

    /// Playlist, liked and history counts for one user
    #[instrument(skip(self))]
    pub async fn stats(&self, id: &str) -> Result<UserStats> {
        sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM playlists WHERE user_id = ?1) AS playlist_count,
                (SELECT COUNT(*) FROM liked_songs WHERE user_id = ?1) AS liked_count,
                (SELECT COUNT(*) FROM listening_history WHERE user_id = ?1) AS history_count
            "#,
        )
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to load user stats: {}", e)))
    }
}
