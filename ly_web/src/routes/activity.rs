//! ABOUTME: Song activity endpoints: play log, leaderboard, recent and liked titles
//! ABOUTME: Anonymous callers share the guest owner id

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::{user_or_guest, AuthUser},
    models::{LikeTitleRequest, LogPlayRequest, SongTitleRequest},
    AppState,
};
use actix_web::{delete, get, post, web, HttpResponse};
use ly_db::SongActivityRepository;
use serde_json::json;
use validator::Validate;

pub const LEADERBOARD_LIMIT: i64 = 10;
pub const RECENT_LIMIT: i64 = 10;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(log_play)
        .service(leaderboard)
        .service(recent)
        .service(delete_recent)
        .service(like_title)
        .service(liked_titles);
}

#[post("/song/play")]
pub async fn log_play(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
    payload: web::Json<LogPlayRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let title = required_title(&payload.song_title)?;
    let tally = SongActivityRepository::new(state.db.pool())
        .log_play(user_or_guest(&caller), payload.song_id.trim(), title)
        .await?;
    state.metrics.inc_song_plays();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Song play logged",
        "play_count": tally.play_count,
    })))
}

#[get("/songs/leaderboard")]
pub async fn leaderboard(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let top = SongActivityRepository::new(state.db.pool())
        .leaderboard(LEADERBOARD_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(top))
}

#[get("/songs/recent")]
pub async fn recent(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
) -> ApiResult<HttpResponse> {
    let plays = SongActivityRepository::new(state.db.pool())
        .recent_by_user(user_or_guest(&caller), RECENT_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(plays))
}

fn required_title(title: &str) -> ApiResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("song_title is required"));
    }
    Ok(title)
}

#[delete("/song/recent/delete")]
pub async fn delete_recent(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
    payload: web::Json<SongTitleRequest>,
) -> ApiResult<HttpResponse> {
    let title = required_title(&payload.song_title)?;
    let deleted = SongActivityRepository::new(state.db.pool())
        .delete_from_recent(user_or_guest(&caller), title)
        .await?;

    if !deleted {
        return Err(ApiError::not_found(format!("No record found for '{}'", title)));
    }
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Removed '{}' from recently played", title),
    })))
}

/// Like or unlike by title depending on `liked`
#[post("/song/like")]
pub async fn like_title(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
    payload: web::Json<LikeTitleRequest>,
) -> ApiResult<HttpResponse> {
    let title = required_title(&payload.song_title)?;
    let repo = SongActivityRepository::new(state.db.pool());
    let owner = user_or_guest(&caller);

    let message = if payload.liked {
        repo.add_to_liked(owner, title).await?;
        format!("'{}' added to liked songs", title)
    } else {
        repo.remove_from_liked(owner, title).await?;
        format!("'{}' removed from liked songs", title)
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message, "liked": payload.liked })))
}

#[get("/songs/liked")]
pub async fn liked_titles(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
) -> ApiResult<HttpResponse> {
    let liked = SongActivityRepository::new(state.db.pool())
        .liked_by_user(user_or_guest(&caller))
        .await?;
    Ok(HttpResponse::Ok().json(liked))
}
