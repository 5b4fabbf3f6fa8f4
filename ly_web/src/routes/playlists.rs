//! ABOUTME: Playlist management endpoints for the signed-in user
//! ABOUTME: Every operation is scoped to playlists the caller owns

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::AuthUser,
    models::{
        CreatePlaylistRequest, PlaylistIdRequest, PlaylistSongRequest, RenamePlaylistRequest,
    },
    routes::auth::current_user,
    AppState,
};
use actix_web::{get, post, web, HttpResponse};
use ly_db::PlaylistRepository;
use serde_json::json;
use tracing::info;
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_playlist)
        .service(list_playlists)
        .service(add_song)
        .service(remove_song)
        .service(delete_playlist)
        .service(rename_playlist);
}

#[post("/playlist/create")]
pub async fn create_playlist(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<CreatePlaylistRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let user = current_user(&state, &auth).await?;
    let playlist = PlaylistRepository::new(state.db.pool())
        .create(&user.id, payload.name.trim())
        .await?;

    info!("User {} created playlist {}", user.id, playlist.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Playlist created",
        "playlist_id": playlist.id,
    })))
}

#[get("/playlist/all")]
pub async fn list_playlists(
    state: web::Data<AppState>,
    auth: AuthUser,
) -> ApiResult<HttpResponse> {
    let playlists = PlaylistRepository::new(state.db.pool())
        .list_by_user(&auth.id)
        .await?;
    Ok(HttpResponse::Ok().json(playlists))
}

#[post("/playlist/add_song")]
pub async fn add_song(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<PlaylistSongRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let added = PlaylistRepository::new(state.db.pool())
        .add_song(&auth.id, &payload.playlist_id, &payload.song_id)
        .await?;

    let message = if added {
        "Song added successfully"
    } else {
        "Song already in playlist"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[post("/playlist/remove_song")]
pub async fn remove_song(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<PlaylistSongRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let removed = PlaylistRepository::new(state.db.pool())
        .remove_song(&auth.id, &payload.playlist_id, &payload.song_id)
        .await?;

    if !removed {
        return Err(ApiError::not_found("Song not in playlist"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Song removed" })))
}

#[post("/playlist/delete")]
pub async fn delete_playlist(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<PlaylistIdRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    PlaylistRepository::new(state.db.pool())
        .delete(&auth.id, &payload.playlist_id)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Playlist deleted" })))
}

#[post("/playlist/rename")]
pub async fn rename_playlist(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<RenamePlaylistRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    PlaylistRepository::new(state.db.pool())
        .rename(&auth.id, &payload.playlist_id, payload.new_name.trim())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Playlist renamed" })))
}
