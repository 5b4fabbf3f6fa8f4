//! ABOUTME: Service tests for the REST API
//! ABOUTME: Drives every endpoint group through actix test services

use super::*;
use crate::auth::{JwtAuth, PasswordAuth};
use actix_web::{cookie::Cookie, http::StatusCode, test};
use ly_db::{CreateUserRequest, NewSong, Song, SongRepository, User, UserRepository};
use ly_external::Providers;
use serde_json::{json, Value};

const PASSWORD: &str = "Str0ng!Pass";

async fn state_with(external: ExternalConfig) -> AppState {
    let db = Db::new(&test_support::temp_db_path("web"))
        .await
        .expect("Failed to create test database");

    let mut config = Config::default();
    config.security.jwt_secret = "test_secret_key_32_characters_minimum".to_string();
    config.external = external;

    let metrics = Arc::new(Metrics::new());
    let providers = Providers::from_config(&config.external).expect("providers");
    let catalog = MusicCatalog::new(providers).with_metrics(metrics.clone());
    AppState::new(db, &config, catalog, metrics)
}

async fn test_state() -> AppState {
    state_with(ExternalConfig::default()).await
}

async fn seed_user(state: &AppState, username: &str) -> User {
    UserRepository::new(state.db.pool())
        .create(CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: PasswordAuth::hash_password(PASSWORD).unwrap(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            date_of_birth: None,
            gender: String::new(),
        })
        .await
        .expect("Failed to create test user")
}

fn bearer(state: &AppState, user: &User) -> (&'static str, String) {
    let token = JwtAuth::create_token(&user.id, &user.username, &state.security.jwt_secret, 3600)
        .expect("Failed to create token");
    ("authorization", format!("Bearer {}", token))
}

async fn seed_song(state: &AppState, title: &str, popularity: i64) -> Song {
    SongRepository::new(state.db.pool())
        .create(NewSong {
            title: title.to_string(),
            artist: "Test Artist".to_string(),
            genre: Some("Rock".to_string()),
            popularity,
            ..Default::default()
        })
        .await
        .expect("Failed to create song")
}

fn registration(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": PASSWORD,
        "password2": PASSWORD,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "date_of_birth": "1990-12-10",
        "gender": "female"
    })
}

#[actix_web::test]
async fn test_index_and_unknown_route() {
    let app = test::init_service(create_app(test_state().await)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "Lyrica API is running");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/nope").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "not_found", "message": "Endpoint not found"}));
}

#[actix_web::test]
async fn test_register_flow() {
    let app = test::init_service(create_app(test_state().await)).await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(registration("ada_l"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "ada_l");
    assert!(body["user"].get("password_hash").is_none());

    // Same email in a different case is still a duplicate
    let mut duplicate = registration("ada_two");
    duplicate["email"] = json!("ADA_L@example.com");
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(duplicate)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_register_validation_details() {
    let app = test::init_service(create_app(test_state().await)).await;

    let mut bad = registration("x");
    bad["password"] = json!("weakpass");
    bad["password2"] = json!("different");
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(bad)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_failed");
    let details = &body["details"];
    assert!(details["username"].is_array());
    assert!(details["password"][0].as_str().unwrap().contains("uppercase"));
    assert_eq!(details["password2"][0], "Passwords must match");
}

#[actix_web::test]
async fn test_register_rejected_when_signed_in() {
    let state = test_state().await;
    let user = seed_user(&state, "already").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .insert_header(header)
        .set_json(registration("another"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_malformed_json_body() {
    let app = test::init_service(create_app(test_state().await)).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_json");
    assert_eq!(body["message"], "JSON data required");
}

#[actix_web::test]
async fn test_login_issues_token_and_cookie() {
    let state = test_state().await;
    seed_user(&state, "listener").await;
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "listener@example.com", "password": PASSWORD, "remember_me": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "auth_token")
        .expect("auth cookie");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(
        cookie.max_age().map(|d| d.whole_seconds()),
        Some(JwtAuth::REMEMBER_ME_SECS as i64)
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], JwtAuth::REMEMBER_ME_SECS);
    assert!(body["user"]["last_login"].is_string());
    let token = body["access_token"].as_str().unwrap().to_string();

    // The cookie alone authenticates
    let req = test::TestRequest::get()
        .uri("/auth/profile")
        .cookie(Cookie::new("auth_token", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_login_failures() {
    let state = test_state().await;
    let user = seed_user(&state, "sleepy").await;
    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
        .bind(&user.id)
        .execute(state.db.pool())
        .await
        .unwrap();
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "sleepy@example.com", "password": "Wrong!Pass1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid email or password");

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "sleepy@example.com", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "nobody@example.com", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let state = test_state().await;
    let user = seed_user(&state, "leaving").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post().uri("/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(header)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "auth_token")
        .expect("removal cookie");
    assert_eq!(cookie.value(), "");
}

#[actix_web::test]
async fn test_profile_contents_and_update() {
    let state = test_state().await;
    let user = seed_user(&state, "profiled").await;
    seed_user(&state, "taken_name").await;
    let song = seed_song(&state, "History Song", 1).await;
    UserRepository::new(state.db.pool())
        .add_to_history(&user.id, &song.id)
        .await
        .unwrap();
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get()
        .uri("/auth/profile")
        .insert_header(header.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let profile = &body["user"];
    assert_eq!(profile["username"], "profiled");
    assert_eq!(profile["preferences"]["theme"], "dark");
    assert_eq!(profile["listening_history"][0]["song_id"], song.id.as_str());
    assert!(profile["playlists"].as_array().unwrap().is_empty());
    assert!(profile.get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/auth/profile")
        .insert_header(header.clone())
        .set_json(json!({"first_name": "Renamed", "gender": "other"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["first_name"], "Renamed");
    assert_eq!(body["user"]["last_name"], "User");

    let req = test::TestRequest::post()
        .uri("/auth/profile")
        .insert_header(header.clone())
        .set_json(json!({"username": "taken_name"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/auth/profile")
        .insert_header(header)
        .set_json(json!({"username": "bad name"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_change_password() {
    let state = test_state().await;
    let user = seed_user(&state, "rotator").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let attempts = [
        (json!({"current_password": PASSWORD}), "All password fields required"),
        (
            json!({"current_password": PASSWORD, "new_password": "N3w!Secret", "new_password2": "N3w!Other"}),
            "New passwords do not match",
        ),
        (
            json!({"current_password": "Wr0ng!Pass", "new_password": "N3w!Secret", "new_password2": "N3w!Secret"}),
            "Current password is incorrect",
        ),
    ];
    for (payload, message) in attempts {
        let req = test::TestRequest::post()
            .uri("/auth/change_password")
            .insert_header(header.clone())
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], message);
    }

    let req = test::TestRequest::post()
        .uri("/auth/change_password")
        .insert_header(header.clone())
        .set_json(json!({"current_password": PASSWORD, "new_password": "weakweak", "new_password2": "weakweak"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/auth/change_password")
        .insert_header(header)
        .set_json(json!({"current_password": PASSWORD, "new_password": "N3w!Secret", "new_password2": "N3w!Secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "rotator@example.com", "password": "N3w!Secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_preferences_merge() {
    let state = test_state().await;
    let user = seed_user(&state, "prefs").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::put()
        .uri("/auth/preferences")
        .insert_header(header.clone())
        .set_json(json!({"theme": "light", "volume": 7}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["preferences"]["theme"], "light");
    assert_eq!(body["preferences"]["volume"], 7);
    assert_eq!(body["preferences"]["autoplay"], true);

    let req = test::TestRequest::put()
        .uri("/auth/preferences")
        .insert_header(header)
        .set_json(json!(["not", "an", "object"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_music_requires_auth_except_status() {
    let app = test::init_service(create_app(test_state().await)).await;

    let req = test::TestRequest::get().uri("/api/music/genres").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/music/genres")
        .insert_header(("authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/music/status").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "Music API is running");
    assert_eq!(body["configured_services"]["spotify"], false);
    assert_eq!(body["configured_services"]["youtube"], false);
}

#[actix_web::test]
async fn test_music_search_and_genres() {
    let state = test_state().await;
    let user = seed_user(&state, "searcher").await;
    seed_song(&state, "Thunder Road", 80).await;
    seed_song(&state, "Thunderstruck", 90).await;
    seed_song(&state, "Quiet", 10).await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get()
        .uri("/api/music/search?q=%20")
        .insert_header(header.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/music/search?q=thunder&platform=napster")
        .insert_header(header.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/music/search?q=thunder&limit=500")
        .insert_header(header.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["query"], "thunder");
    assert_eq!(body["platform"], "all");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/music/trending?limit=2")
        .insert_header(header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["trending"][0]["title"], "Thunderstruck");
    assert_eq!(body["trending"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/music/genres")
        .insert_header(header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["genres"].as_array().unwrap().len(), 24);

    let req = test::TestRequest::get()
        .uri("/api/music/genre/rock")
        .insert_header(header)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["genre"], "rock");
    assert_eq!(body["songs"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_search_tops_up_from_youtube() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": {"videoId": "vid1"}, "snippet": {"title": "Remote Hit", "channelTitle": "Chan"}}]
        })))
        .mount(&server)
        .await;

    let state = state_with(ExternalConfig {
        youtube_api_key: Some("yt-key".to_string()),
        youtube_api_url: Some(server.uri()),
        ..Default::default()
    })
    .await;
    let user = seed_user(&state, "remote").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get()
        .uri("/api/music/search?q=hit&limit=5")
        .insert_header(header)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["youtube_id"], "vid1");
    assert!(results[0]["id"].as_str().is_some());
}

#[actix_web::test]
async fn test_song_details_like_and_play() {
    let state = test_state().await;
    let user = seed_user(&state, "fan").await;
    let song = seed_song(&state, "Anthem", 50).await;
    let header = bearer(&state, &user);
    let metrics = state.metrics.clone();
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/music/song/{}", song.id))
        .insert_header(header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["play_count"], 1);

    let req = test::TestRequest::get()
        .uri("/api/music/song/not-a-ulid")
        .insert_header(header.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Song not found");

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/music/like/{}", song.id))
            .insert_header(header.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["like_count"], 1);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/music/unlike/{}", song.id))
        .insert_header(header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["song_id"], song.id.as_str());
    assert_eq!(body["like_count"], 0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/music/play/{}", song.id))
        .insert_header(header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["play_count"], 2);
    assert!(metrics.encode().unwrap().contains("lyrica_song_plays_total 1"));

    let req = test::TestRequest::get()
        .uri(&format!("/api/music/preview/{}", song.id))
        .insert_header(header)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No preview available");
}

#[actix_web::test]
async fn test_playlist_lifecycle() {
    let state = test_state().await;
    let owner = seed_user(&state, "owner").await;
    let other = seed_user(&state, "other").await;
    let owner_header = bearer(&state, &owner);
    let other_header = bearer(&state, &other);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/playlist/create")
        .insert_header(owner_header.clone())
        .set_json(json!({"name": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/playlist/create")
        .insert_header(owner_header.clone())
        .set_json(json!({"name": "Road Trip"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Playlist created");
    let playlist_id = body["playlist_id"].as_str().unwrap().to_string();

    for song in ["a.mp3", "b.mp3", "a.mp3"] {
        let req = test::TestRequest::post()
            .uri("/playlist/add_song")
            .insert_header(owner_header.clone())
            .set_json(json!({"playlist_id": playlist_id, "song_id": song}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Another user cannot touch it
    let req = test::TestRequest::post()
        .uri("/playlist/rename")
        .insert_header(other_header)
        .set_json(json!({"playlist_id": playlist_id, "new_name": "Mine now"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/playlist/remove_song")
        .insert_header(owner_header.clone())
        .set_json(json!({"playlist_id": playlist_id, "song_id": "a.mp3"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/playlist/rename")
        .insert_header(owner_header.clone())
        .set_json(json!({"playlist_id": playlist_id, "new_name": "Night Drive"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/playlist/all")
        .insert_header(owner_header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["name"], "Night Drive");
    assert_eq!(body[0]["songs"], json!(["b.mp3"]));

    let req = test::TestRequest::get()
        .uri("/playlists")
        .insert_header(owner_header.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["playlists"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/playlist/delete")
        .insert_header(owner_header.clone())
        .set_json(json!({"playlist_id": playlist_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/playlist/delete")
        .insert_header(owner_header)
        .set_json(json!({"playlist_id": playlist_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_guest_song_activity() {
    let app = test::init_service(create_app(test_state().await)).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/song/play")
            .set_json(json!({"song_id": "fade.mp3", "song_title": "Fade"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get().uri("/songs/leaderboard").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["song_title"], "Fade");
    assert_eq!(body[0]["play_count"], 2);

    let req = test::TestRequest::get().uri("/songs/recent").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let req = test::TestRequest::delete()
        .uri("/song/recent/delete")
        .set_json(json!({"song_title": "Fade"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri("/song/recent/delete")
        .set_json(json!({"song_title": "Fade"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/song/like")
        .set_json(json!({"song_title": "Fade"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/songs/liked").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["song_title"], "Fade");

    let req = test::TestRequest::post()
        .uri("/song/like")
        .set_json(json!({"song_title": "Fade", "liked": false}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/songs/liked").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri("/song/like")
        .set_json(json!({"liked": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_signed_in_activity_is_private() {
    let state = test_state().await;
    let user = seed_user(&state, "private").await;
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/song/play")
        .insert_header(header.clone())
        .set_json(json!({"song_id": "s1", "song_title": "Mine"}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/songs/recent")
        .insert_header(header)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["song_title"], "Mine");

    let req = test::TestRequest::get().uri("/songs/recent").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_padded_titles_are_trimmed_on_play() {
    let app = test::init_service(create_app(test_state().await)).await;

    let req = test::TestRequest::post()
        .uri("/song/play")
        .set_json(json!({"song_id": " fade.mp3 ", "song_title": "Fade  "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/songs/leaderboard").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["song_id"], "fade.mp3");
    assert_eq!(body[0]["song_title"], "Fade");

    let req = test::TestRequest::delete()
        .uri("/song/recent/delete")
        .set_json(json!({"song_title": "Fade "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/song/play")
        .set_json(json!({"song_id": "blank", "song_title": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_token_for_removed_user_is_unauthorized() {
    let state = test_state().await;
    let song = seed_song(&state, "Orphaned", 5).await;
    let token = JwtAuth::create_token(
        &ly_core::Id::new().to_string(),
        "ghost",
        &state.security.jwt_secret,
        3600,
    )
    .expect("Failed to create token");
    let header = ("authorization", format!("Bearer {}", token));
    let app = test::init_service(create_app(state)).await;

    for action in ["like", "unlike", "play"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/music/{}/{}", action, song.id))
            .insert_header(header.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", action);
    }

    let req = test::TestRequest::post()
        .uri("/playlist/create")
        .insert_header(header)
        .set_json(json!({"name": "Nowhere"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_dashboard_stats() {
    let state = test_state().await;
    let user = seed_user(&state, "dash").await;
    let song = seed_song(&state, "Counted", 1).await;
    SongRepository::new(state.db.pool())
        .like(&user.id, &song.id)
        .await
        .unwrap();
    let header = bearer(&state, &user);
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .insert_header(header)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["username"], "dash");
    assert_eq!(body["stats"]["liked_songs"], 1);
    assert_eq!(body["stats"]["playlists"], 0);
}

#[actix_web::test]
async fn test_discover_lists_cached_content() {
    let state = test_state().await;
    let items: Vec<_> = (0..7)
        .map(|i| ly_db::NewPodcast {
            title: format!("Pod {}", i),
            publisher: "Pub".to_string(),
            url: None,
        })
        .collect();
    ly_db::ContentRepository::new(state.db.pool())
        .insert_podcasts(&items)
        .await
        .unwrap();
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get().uri("/discover").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let podcasts = body["podcasts"].as_array().unwrap();
    assert_eq!(podcasts.len(), 5);
    assert_eq!(podcasts[0]["title"], "Pod 6");
    assert!(body["news"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_song_files_listing() {
    let mut state = test_state().await;
    let dir = test_support::temp_dir_path().join(test_support::unique_name("songs"));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("b.mp3"), b"").unwrap();
    std::fs::write(dir.join("a.mp3"), b"").unwrap();
    std::fs::write(dir.join("notes.txt"), b"").unwrap();
    state.server.songs_dir = dir.to_string_lossy().into_owned();

    let mut missing = state.clone();
    missing.server.songs_dir = dir.join("absent").to_string_lossy().into_owned();

    let app = test::init_service(create_app(state)).await;
    let req = test::TestRequest::get().uri("/api/songs").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["songs"], json!(["a.mp3", "b.mp3"]));

    let app = test::init_service(create_app(missing)).await;
    let req = test::TestRequest::get().uri("/api/songs").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_route_table_and_openapi() {
    let state = test_state().await;
    let metrics = state.metrics.clone();
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get().uri("/routes").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let routes = body["routes"].as_array().unwrap();
    assert!(routes
        .iter()
        .any(|r| r["path"] == "/auth/register" && r["methods"] == json!(["POST"])));

    let req = test::TestRequest::get().uri("/api-docs/openapi.json").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["paths"]["/auth/login"].is_object());
    assert!(body["paths"]["/api/music/search"].is_object());

    let encoded = metrics.encode().unwrap();
    assert!(encoded.contains("lyrica_http_requests_total 2"));
}
