//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles all application settings from environment variables and files

use config::{Config as ConfigBuilder, Environment};
use ly_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    pub environment: String,
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub security: SecurityConfig,
    #[validate(nested)]
    pub external: ExternalConfig,
    #[validate(nested)]
    pub content: ContentConfig,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    #[validate(range(min = 1, max = 65535))]
    pub obs_port: u16,
    /// Directory listed by `/api/songs`
    pub songs_dir: String,
    /// JSON body size limit in bytes
    #[validate(range(min = 1024, max = 104857600))] // 1KB to 100MB
    pub json_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            obs_port: 9000,
            songs_dir: "./static/songs".to_string(),
            json_limit: 1048576,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(range(min = 1, max = 100))]
    pub pool_size: u32,
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "lyrica.db".to_string(),
            pool_size: 10,
            sqlite_wal: true,
        }
    }
}

/// Security configuration with secret redaction
#[derive(Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SecurityConfig {
    #[validate(length(min = 32))]
    pub jwt_secret: String,
    /// Lifetime of issued access tokens
    #[validate(range(min = 60, max = 31536000))]
    pub token_ttl_secs: u64,
    /// Whether to use secure cookies (requires HTTPS)
    pub secure_cookies: bool,
}

fn insecure_jwt_secret() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("INSECURE-RANDOM-{}-CHANGE-IN-PRODUCTION", timestamp)
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: insecure_jwt_secret(),
            token_ttl_secs: 86400,
            secure_cookies: false,
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Third-party provider credentials and endpoints
///
/// Every key is optional. A provider without its key is treated as disabled.
/// The `*_url` overrides exist so clients can be pointed at a mock server.
#[derive(Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ExternalConfig {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    #[validate(length(equal = 2))]
    pub spotify_market: String,
    pub youtube_api_key: Option<String>,
    #[validate(length(equal = 2))]
    pub youtube_region: String,
    pub lastfm_api_key: Option<String>,
    pub listennotes_api_key: Option<String>,
    pub newsapi_api_key: Option<String>,
    pub ticketmaster_api_key: Option<String>,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    #[validate(url)]
    pub spotify_accounts_url: Option<String>,
    #[validate(url)]
    pub spotify_api_url: Option<String>,
    #[validate(url)]
    pub youtube_api_url: Option<String>,
    #[validate(url)]
    pub deezer_api_url: Option<String>,
    #[validate(url)]
    pub listennotes_api_url: Option<String>,
    #[validate(url)]
    pub newsapi_api_url: Option<String>,
    #[validate(url)]
    pub ticketmaster_api_url: Option<String>,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_market: "US".to_string(),
            youtube_api_key: None,
            youtube_region: "US".to_string(),
            lastfm_api_key: None,
            listennotes_api_key: None,
            newsapi_api_key: None,
            ticketmaster_api_key: None,
            request_timeout_secs: 15,
            spotify_accounts_url: None,
            spotify_api_url: None,
            youtube_api_url: None,
            deezer_api_url: None,
            listennotes_api_url: None,
            newsapi_api_url: None,
            ticketmaster_api_url: None,
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl ExternalConfig {
    pub fn is_spotify_configured(&self) -> bool {
        present(&self.spotify_client_id) && present(&self.spotify_client_secret)
    }

    pub fn is_youtube_configured(&self) -> bool {
        present(&self.youtube_api_key)
    }

    pub fn is_lastfm_configured(&self) -> bool {
        present(&self.lastfm_api_key)
    }

    pub fn is_listennotes_configured(&self) -> bool {
        present(&self.listennotes_api_key)
    }

    pub fn is_newsapi_configured(&self) -> bool {
        present(&self.newsapi_api_key)
    }

    pub fn is_ticketmaster_configured(&self) -> bool {
        present(&self.ticketmaster_api_key)
    }
}

impl fmt::Debug for ExternalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalConfig")
            .field("spotify_client_id", &redact(&self.spotify_client_id))
            .field("spotify_client_secret", &redact(&self.spotify_client_secret))
            .field("spotify_market", &self.spotify_market)
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("youtube_region", &self.youtube_region)
            .field("lastfm_api_key", &redact(&self.lastfm_api_key))
            .field("listennotes_api_key", &redact(&self.listennotes_api_key))
            .field("newsapi_api_key", &redact(&self.newsapi_api_key))
            .field("ticketmaster_api_key", &redact(&self.ticketmaster_api_key))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Background content refresh settings
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ContentConfig {
    pub enabled: bool,
    #[validate(range(min = 60, max = 604800))]
    pub refresh_interval_secs: u64,
    #[validate(range(min = 1, max = 100))]
    pub items_per_source: u32,
    #[validate(length(min = 1))]
    pub deezer_query: String,
    #[validate(length(min = 1))]
    pub news_category: String,
    #[validate(length(equal = 2))]
    pub news_language: String,
    #[validate(length(min = 1))]
    pub concert_city: String,
    #[validate(length(min = 1))]
    pub concert_classification: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: 3600,
            items_per_source: 10,
            deezer_query: "pop".to_string(),
            news_category: "entertainment".to_string(),
            news_language: "en".to_string(),
            concert_city: "Delhi".to_string(),
            concert_classification: "music".to_string(),
        }
    }
}

/// Multi-word keys that the `_` separator would split apart, paired with the
/// bare variable names older deployments exported.
const ENV_OVERRIDES: &[(&str, &str, Option<&str>)] = &[
    ("server.obs_port", "LYRICA_SERVER_OBS_PORT", None),
    ("server.songs_dir", "LYRICA_SERVER_SONGS_DIR", None),
    ("server.json_limit", "LYRICA_SERVER_JSON_LIMIT", None),
    ("database.pool_size", "LYRICA_DATABASE_POOL_SIZE", None),
    ("database.sqlite_wal", "LYRICA_DATABASE_SQLITE_WAL", None),
    ("security.jwt_secret", "LYRICA_SECURITY_JWT_SECRET", Some("SECRET_KEY")),
    ("security.token_ttl_secs", "LYRICA_SECURITY_TOKEN_TTL_SECS", None),
    ("security.secure_cookies", "LYRICA_SECURITY_SECURE_COOKIES", None),
    (
        "external.spotify_client_id",
        "LYRICA_EXTERNAL_SPOTIFY_CLIENT_ID",
        Some("SPOTIFY_CLIENT_ID"),
    ),
    (
        "external.spotify_client_secret",
        "LYRICA_EXTERNAL_SPOTIFY_CLIENT_SECRET",
        Some("SPOTIFY_CLIENT_SECRET"),
    ),
    ("external.spotify_market", "LYRICA_EXTERNAL_SPOTIFY_MARKET", None),
    (
        "external.youtube_api_key",
        "LYRICA_EXTERNAL_YOUTUBE_API_KEY",
        Some("YOUTUBE_API_KEY"),
    ),
    ("external.youtube_region", "LYRICA_EXTERNAL_YOUTUBE_REGION", None),
    (
        "external.lastfm_api_key",
        "LYRICA_EXTERNAL_LASTFM_API_KEY",
        Some("LASTFM_API_KEY"),
    ),
    (
        "external.listennotes_api_key",
        "LYRICA_EXTERNAL_LISTENNOTES_API_KEY",
        Some("LISTENNOTES_API_KEY"),
    ),
    (
        "external.newsapi_api_key",
        "LYRICA_EXTERNAL_NEWSAPI_API_KEY",
        Some("NEWSAPI_API_KEY"),
    ),
    (
        "external.ticketmaster_api_key",
        "LYRICA_EXTERNAL_TICKETMASTER_API_KEY",
        Some("TICKETMASTER_API_KEY"),
    ),
    (
        "external.request_timeout_secs",
        "LYRICA_EXTERNAL_REQUEST_TIMEOUT_SECS",
        None,
    ),
    (
        "external.spotify_accounts_url",
        "LYRICA_EXTERNAL_SPOTIFY_ACCOUNTS_URL",
        None,
    ),
    ("external.spotify_api_url", "LYRICA_EXTERNAL_SPOTIFY_API_URL", None),
    ("external.youtube_api_url", "LYRICA_EXTERNAL_YOUTUBE_API_URL", None),
    ("external.deezer_api_url", "LYRICA_EXTERNAL_DEEZER_API_URL", None),
    (
        "external.listennotes_api_url",
        "LYRICA_EXTERNAL_LISTENNOTES_API_URL",
        None,
    ),
    ("external.newsapi_api_url", "LYRICA_EXTERNAL_NEWSAPI_API_URL", None),
    (
        "external.ticketmaster_api_url",
        "LYRICA_EXTERNAL_TICKETMASTER_API_URL",
        None,
    ),
    (
        "content.refresh_interval_secs",
        "LYRICA_CONTENT_REFRESH_INTERVAL_SECS",
        None,
    ),
    (
        "content.items_per_source",
        "LYRICA_CONTENT_ITEMS_PER_SOURCE",
        None,
    ),
    ("content.deezer_query", "LYRICA_CONTENT_DEEZER_QUERY", None),
    ("content.news_category", "LYRICA_CONTENT_NEWS_CATEGORY", None),
    ("content.news_language", "LYRICA_CONTENT_NEWS_LANGUAGE", None),
    ("content.concert_city", "LYRICA_CONTENT_CONCERT_CITY", None),
    (
        "content.concert_classification",
        "LYRICA_CONTENT_CONCERT_CLASSIFICATION",
        None,
    ),
];

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables and optional .env file
    pub fn load() -> Result<Self> {
        // A missing .env is normal outside development
        let _ = dotenvy::dotenv();
        Self::load_from_env()
    }

    /// Load configuration from the process environment only
    pub fn load_from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.obs_port", 9000)?
            .set_default("server.songs_dir", "./static/songs")?
            .set_default("server.json_limit", 1048576)?
            .set_default("database.path", "lyrica.db")?
            .set_default("database.pool_size", 10)?
            .set_default("database.sqlite_wal", true)?
            .set_default("security.jwt_secret", insecure_jwt_secret())?
            .set_default("security.token_ttl_secs", 86400)?
            .set_default("security.secure_cookies", false)?
            .set_default("external.spotify_market", "US")?
            .set_default("external.youtube_region", "US")?
            .set_default("external.request_timeout_secs", 15)?
            .set_default("content.enabled", true)?
            .set_default("content.refresh_interval_secs", 3600)?
            .set_default("content.items_per_source", 10)?
            .set_default("content.deezer_query", "pop")?
            .set_default("content.news_category", "entertainment")?
            .set_default("content.news_language", "en")?
            .set_default("content.concert_city", "Delhi")?
            .set_default("content.concert_classification", "music")?;

        // Prefixed names win over the legacy bare names
        for (key, prefixed, legacy) in ENV_OVERRIDES {
            let value = env_value(prefixed).or_else(|| legacy.and_then(env_value));
            if let Some(value) = value {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("LYRICA")
                .try_parsing(true)
                .separator("_"),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }
}
