//! ABOUTME: Music catalog endpoints under /api/music
//! ABOUTME: Search and trending blend local songs with configured providers

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::AuthUser,
    models::{ErrorResponse, ListQuery, SearchQuery},
    routes::auth::current_user,
    AppState,
};
use actix_web::{get, post, web, HttpResponse};
use ly_core::Id;
use ly_db::{Song, SongRepository, UserRepository};
use ly_external::Platform;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;

pub const GENRES: [&str; 24] = [
    "Pop",
    "Rock",
    "Hip Hop",
    "R&B",
    "Country",
    "Electronic",
    "Jazz",
    "Classical",
    "Folk",
    "Reggae",
    "Blues",
    "Metal",
    "Punk",
    "Alternative",
    "Indie",
    "Funk",
    "Soul",
    "Gospel",
    "Latin",
    "World",
    "Ambient",
    "Dance",
    "House",
    "Techno",
];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/music")
            .service(search)
            .service(trending)
            .service(song_details)
            .service(genres)
            .service(genre_songs)
            .service(preview)
            .service(like)
            .service(unlike)
            .service(play)
            .service(status),
    );
}

fn clamp_limit(limit: Option<u32>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize
}

fn parse_platform(raw: Option<&str>) -> ApiResult<Platform> {
    Ok(raw.unwrap_or("all").parse::<Platform>()?)
}

async fn load_song(state: &AppState, raw_id: &str) -> ApiResult<Song> {
    let id = Id::parse_for("Song", raw_id)?;
    SongRepository::new(state.db.pool())
        .find_by_id(&id.to_string())
        .await?
        .ok_or_else(|| ApiError::not_found("Song not found"))
}

#[utoipa::path(
    get,
    path = "/api/music/search",
    tag = "music",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching songs, local results first", body = serde_json::Value),
        (status = 400, description = "Missing query or unknown platform", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    )
)]
#[get("/search")]
pub async fn search(
    state: web::Data<AppState>,
    _auth: AuthUser,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::bad_request("Query parameter 'q' is required"));
    }
    let limit = clamp_limit(query.limit);
    let platform = parse_platform(query.platform.as_deref())?;

    let results = state.catalog.search(&state.db, q, limit, platform).await?;
    debug!("Search '{}' returned {} songs", q, results.len());

    Ok(HttpResponse::Ok().json(json!({
        "query": q,
        "platform": platform.as_str(),
        "results": results,
    })))
}

#[utoipa::path(
    get,
    path = "/api/music/trending",
    tag = "music",
    params(ListQuery),
    responses(
        (status = 200, description = "Trending songs", body = serde_json::Value),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    )
)]
#[get("/trending")]
pub async fn trending(
    state: web::Data<AppState>,
    _auth: AuthUser,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let limit = clamp_limit(query.limit);
    let platform = parse_platform(query.platform.as_deref())?;

    let songs = state.catalog.trending(&state.db, limit, platform).await?;
    Ok(HttpResponse::Ok().json(json!({
        "platform": platform.as_str(),
        "trending": songs,
    })))
}

/// Viewing a song counts as a play
#[utoipa::path(
    get,
    path = "/api/music/song/{id}",
    tag = "music",
    params(("id" = String, Path, description = "Song id")),
    responses(
        (status = 200, description = "Song details", body = serde_json::Value),
        (status = 404, description = "Song not found", body = ErrorResponse),
    )
)]
#[get("/song/{id}")]
pub async fn song_details(
    state: web::Data<AppState>,
    _auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let mut song = load_song(&state, &path).await?;
    song.play_count = SongRepository::new(state.db.pool())
        .increment_play_count(&song.id)
        .await?;
    Ok(HttpResponse::Ok().json(song))
}

#[get("/genres")]
pub async fn genres(_auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "genres": GENRES }))
}

#[get("/genre/{genre}")]
pub async fn genre_songs(
    state: web::Data<AppState>,
    _auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let genre = path.into_inner();
    let songs = SongRepository::new(state.db.pool())
        .by_genre(&genre, clamp_limit(query.limit) as i64)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "genre": genre, "songs": songs })))
}

#[get("/preview/{id}")]
pub async fn preview(
    state: web::Data<AppState>,
    _auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let song = load_song(&state, &path).await?;
    let preview_url = song
        .preview_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::not_found("No preview available"))?;

    Ok(HttpResponse::Ok().json(json!({
        "song_id": song.id,
        "preview_url": preview_url,
        "title": song.title,
        "artist": song.artist,
    })))
}

#[utoipa::path(
    post,
    path = "/api/music/like/{id}",
    tag = "music",
    params(("id" = String, Path, description = "Song id")),
    responses(
        (status = 200, description = "Like recorded", body = serde_json::Value),
        (status = 404, description = "Song not found", body = ErrorResponse),
    )
)]
#[post("/like/{id}")]
pub async fn like(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = current_user(&state, &auth).await?;
    let song = load_song(&state, &path).await?;
    let outcome = SongRepository::new(state.db.pool())
        .like(&user.id, &song.id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Song liked successfully",
        "song_id": song.id,
        "like_count": outcome.like_count,
    })))
}

#[post("/unlike/{id}")]
pub async fn unlike(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = current_user(&state, &auth).await?;
    let song = load_song(&state, &path).await?;
    let outcome = SongRepository::new(state.db.pool())
        .unlike(&user.id, &song.id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Song unliked successfully",
        "song_id": song.id,
        "like_count": outcome.like_count,
    })))
}

#[utoipa::path(
    post,
    path = "/api/music/play/{id}",
    tag = "music",
    params(("id" = String, Path, description = "Song id")),
    responses(
        (status = 200, description = "Play recorded", body = serde_json::Value),
        (status = 404, description = "Song not found", body = ErrorResponse),
    )
)]
#[post("/play/{id}")]
pub async fn play(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = current_user(&state, &auth).await?;
    let song = load_song(&state, &path).await?;

    UserRepository::new(state.db.pool())
        .add_to_history(&user.id, &song.id)
        .await?;
    let play_count = SongRepository::new(state.db.pool())
        .increment_play_count(&song.id)
        .await?;
    state.metrics.inc_song_plays();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Song play recorded",
        "song_id": song.id,
        "play_count": play_count,
    })))
}

#[utoipa::path(
    get,
    path = "/api/music/status",
    tag = "music",
    responses((status = 200, description = "Provider configuration and endpoint map", body = serde_json::Value))
)]
#[get("/status")]
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let external = &state.external;
    HttpResponse::Ok().json(json!({
        "status": "Music API is running",
        "version": "1.0",
        "configured_services": {
            "spotify": external.is_spotify_configured(),
            "youtube": external.is_youtube_configured(),
            "lastfm": external.is_lastfm_configured(),
        },
        "endpoints": {
            "search": "/api/music/search?q=query&limit=20&platform=all",
            "trending": "/api/music/trending?limit=20&platform=all",
            "song_details": "/api/music/song/<song_id>",
            "genres": "/api/music/genres",
            "genre_songs": "/api/music/genre/<genre>",
            "preview": "/api/music/preview/<song_id>",
            "like": "/api/music/like/<song_id>",
            "unlike": "/api/music/unlike/<song_id>",
            "play": "/api/music/play/<song_id>",
        }
    }))
}
