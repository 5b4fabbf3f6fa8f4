//! ABOUTME: Top-level endpoints: status, route table, dashboard, discover and files
//! ABOUTME: Also serves the generated OpenAPI document

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::AuthUser,
    routes::auth::current_user,
    ApiDoc, AppState,
};
use actix_web::{get, web, HttpResponse};
use ly_db::{ContentRepository, PlaylistRepository, UserRepository};
use serde_json::json;
use std::io::ErrorKind;
use utoipa::OpenApi;

/// Items per section on the discover page
pub const DISCOVER_LIMIT: i64 = 5;

/// Every route the application serves, as (methods, path, endpoint)
pub const ROUTE_TABLE: &[(&str, &str, &str)] = &[
    ("GET", "/", "index"),
    ("GET", "/routes", "list_routes"),
    ("GET", "/dashboard", "dashboard"),
    ("GET", "/playlists", "user_playlists"),
    ("GET", "/discover", "discover"),
    ("GET", "/api/songs", "song_files"),
    ("GET", "/api-docs/openapi.json", "openapi"),
    ("POST", "/auth/register", "auth.register"),
    ("POST", "/auth/login", "auth.login"),
    ("POST", "/auth/logout", "auth.logout"),
    ("GET", "/auth/profile", "auth.get_profile"),
    ("POST", "/auth/profile", "auth.update_profile"),
    ("POST", "/auth/change_password", "auth.change_password"),
    ("PUT", "/auth/preferences", "auth.update_preferences"),
    ("GET", "/api/music/search", "music.search"),
    ("GET", "/api/music/trending", "music.trending"),
    ("GET", "/api/music/song/{id}", "music.song_details"),
    ("GET", "/api/music/genres", "music.genres"),
    ("GET", "/api/music/genre/{genre}", "music.genre_songs"),
    ("GET", "/api/music/preview/{id}", "music.preview"),
    ("POST", "/api/music/like/{id}", "music.like"),
    ("POST", "/api/music/unlike/{id}", "music.unlike"),
    ("POST", "/api/music/play/{id}", "music.play"),
    ("GET", "/api/music/status", "music.status"),
    ("POST", "/playlist/create", "playlists.create_playlist"),
    ("GET", "/playlist/all", "playlists.list_playlists"),
    ("POST", "/playlist/add_song", "playlists.add_song"),
    ("POST", "/playlist/remove_song", "playlists.remove_song"),
    ("POST", "/playlist/delete", "playlists.delete_playlist"),
    ("POST", "/playlist/rename", "playlists.rename_playlist"),
    ("POST", "/song/play", "activity.log_play"),
    ("GET", "/songs/leaderboard", "activity.leaderboard"),
    ("GET", "/songs/recent", "activity.recent"),
    ("DELETE", "/song/recent/delete", "activity.delete_recent"),
    ("POST", "/song/like", "activity.like_title"),
    ("GET", "/songs/liked", "activity.liked_titles"),
];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(list_routes)
        .service(dashboard)
        .service(user_playlists)
        .service(discover)
        .service(song_files)
        .service(openapi);
}

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "Lyrica API is running",
        "version": "1.0",
    }))
}

#[get("/routes")]
pub async fn list_routes() -> HttpResponse {
    let routes: Vec<_> = ROUTE_TABLE
        .iter()
        .map(|(method, path, endpoint)| {
            json!({ "endpoint": endpoint, "methods": [method], "path": path })
        })
        .collect();
    HttpResponse::Ok().json(json!({ "routes": routes }))
}

#[get("/dashboard")]
pub async fn dashboard(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let user = current_user(&state, &auth).await?;
    let stats = UserRepository::new(state.db.pool()).stats(&user.id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "stats": {
            "playlists": stats.playlist_count,
            "liked_songs": stats.liked_count,
            "listening_history": stats.history_count,
        }
    })))
}

#[get("/playlists")]
pub async fn user_playlists(
    state: web::Data<AppState>,
    auth: AuthUser,
) -> ApiResult<HttpResponse> {
    let playlists = PlaylistRepository::new(state.db.pool())
        .list_by_user(&auth.id)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "playlists": playlists })))
}

/// Latest cached provider content
#[get("/discover")]
pub async fn discover(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let repo = ContentRepository::new(state.db.pool());

    Ok(HttpResponse::Ok().json(json!({
        "podcasts": repo.latest_podcasts(DISCOVER_LIMIT).await?,
        "news": repo.latest_news(DISCOVER_LIMIT).await?,
        "concerts": repo.latest_concerts(DISCOVER_LIMIT).await?,
        "songs": repo.latest_preview_songs(DISCOVER_LIMIT).await?,
    })))
}

/// MP3 files available in the songs directory
#[get("/api/songs")]
pub async fn song_files(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let mut entries = match tokio::fs::read_dir(&state.server.songs_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::not_found("Songs directory not found"));
        }
        Err(e) => return Err(ly_core::Error::Io(e).into()),
    };

    let mut songs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ly_core::Error::Io)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".mp3") {
            songs.push(name);
        }
    }
    songs.sort();

    Ok(HttpResponse::Ok().json(json!({ "songs": songs })))
}

#[get("/api-docs/openapi.json")]
pub async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
