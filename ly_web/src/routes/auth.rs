//! ABOUTME: Account endpoints: registration, login, logout, profile and password
//! ABOUTME: Issues JWTs both in the response body and as an HTTP-only cookie

use crate::{
    auth::{JwtAuth, PasswordAuth},
    error::{ApiError, ApiResult},
    middleware::auth::{AuthUser, AUTH_COOKIE},
    models::{
        validate_password_strength, ChangePasswordRequest, ErrorResponse, LoginRequest,
        LoginResponse, ProfileUpdateRequest, RegisterRequest, RegisterResponse,
        UserSummary,
    },
    AppState,
};
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    get, post, put, web, HttpResponse,
};
use ly_db::{CreateUserRequest, ProfileUpdate, User, UserRepository, HISTORY_LIMIT};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(logout)
            .service(get_profile)
            .service(update_profile)
            .service(change_password)
            .service(update_preferences),
    );
}

fn auth_cookie(token: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .max_age(Duration::seconds(max_age_secs as i64))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()
}

/// Load the account behind a token; a deleted account counts as signed out
pub(crate) async fn current_user(state: &AppState, auth: &AuthUser) -> ApiResult<User> {
    UserRepository::new(state.db.pool())
        .find_by_id(&auth.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation failed or already signed in", body = ErrorResponse),
        (status = 409, description = "Email or username taken", body = ErrorResponse),
    )
)]
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    if caller.is_some() {
        return Err(ApiError::bad_request("User already logged in"));
    }

    let request = payload.into_inner();
    let mut errors = request.validate().err().unwrap_or_else(ValidationErrors::new);
    if request.password != request.password2 {
        errors.add(
            "password2",
            ValidationError::new("must_match").with_message("Passwords must match".into()),
        );
    }
    if !errors.errors().is_empty() {
        warn!("Registration validation failed for {}", request.username);
        return Err(errors.into());
    }

    let password_hash = PasswordAuth::hash_password(&request.password)?;
    let user = UserRepository::new(state.db.pool())
        .create(CreateUserRequest {
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            date_of_birth: request.date_of_birth,
            gender: request.gender.unwrap_or_default(),
        })
        .await?;

    info!("Registered user {}", user.id);
    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "Registration successful! You can now log in.".to_string(),
        success: true,
        user: UserSummary::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse),
    )
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    caller: Option<AuthUser>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    if caller.is_some() {
        return Err(ApiError::bad_request("User already logged in"));
    }
    payload.validate()?;
    debug!("Login attempt for email: {}", payload.email);

    let repo = UserRepository::new(state.db.pool());
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let mut user = repo.find_by_email(&payload.email).await?.ok_or_else(invalid)?;
    if !PasswordAuth::verify_password(&payload.password, &user.password_hash)? {
        warn!("Invalid password for user: {}", user.id);
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::forbidden("Account deactivated"));
    }

    let ttl = if payload.remember_me {
        JwtAuth::REMEMBER_ME_SECS
    } else {
        state.security.token_ttl_secs
    };
    let token = JwtAuth::create_token(&user.id, &user.username, &state.security.jwt_secret, ttl)?;
    user.last_login = Some(repo.touch_last_login(&user.id).await?);

    let cookie = auth_cookie(token.clone(), ttl, state.security.secure_cookies);
    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        message: "Login successful".to_string(),
        success: true,
        user,
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: ttl,
    }))
}

/// Tokens are stateless; logging out drops the cookie
#[post("/logout")]
pub async fn logout(auth: AuthUser) -> ApiResult<HttpResponse> {
    debug!("Logout for user: {}", auth.id);
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({"message": "Logout successful"})))
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Profile with playlists, likes and history", body = serde_json::Value),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    )
)]
#[get("/profile")]
pub async fn get_profile(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let user = current_user(&state, &auth).await?;
    let repo = UserRepository::new(state.db.pool());

    let playlists = repo.list_playlist_ids(&user.id).await?;
    let liked = repo.list_liked_song_ids(&user.id).await?;
    let history = repo.listening_history(&user.id, HISTORY_LIMIT).await?;

    let mut profile = serde_json::to_value(&user).map_err(ly_core::Error::from)?;
    if let Value::Object(fields) = &mut profile {
        fields.insert("playlists".to_string(), json!(playlists));
        fields.insert("liked_songs".to_string(), json!(liked));
        fields.insert("listening_history".to_string(), json!(history));
    }

    Ok(HttpResponse::Ok().json(json!({ "user": profile })))
}

#[post("/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<ProfileUpdateRequest>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let request = payload.into_inner();

    let user = UserRepository::new(state.db.pool())
        .update_profile(
            &auth.id,
            ProfileUpdate {
                first_name: request.first_name,
                last_name: request.last_name,
                username: request.username,
                date_of_birth: request.date_of_birth,
                gender: request.gender,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

#[post("/change_password")]
pub async fn change_password(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<ChangePasswordRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    if request.current_password.is_empty()
        || request.new_password.is_empty()
        || request.new_password2.is_empty()
    {
        return Err(ApiError::bad_request("All password fields required"));
    }
    if request.new_password != request.new_password2 {
        return Err(ApiError::bad_request("New passwords do not match"));
    }

    let mut errors = ValidationErrors::new();
    if request.new_password.chars().count() < 8 {
        errors.add(
            "new_password",
            ValidationError::new("length")
                .with_message("Password must be at least 8 characters long".into()),
        );
    } else if let Err(e) = validate_password_strength(&request.new_password) {
        errors.add("new_password", e);
    }
    if !errors.errors().is_empty() {
        return Err(errors.into());
    }

    let user = current_user(&state, &auth).await?;
    if !PasswordAuth::verify_password(&request.current_password, &user.password_hash)? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let password_hash = PasswordAuth::hash_password(&request.new_password)?;
    UserRepository::new(state.db.pool())
        .update_password(&user.id, &password_hash)
        .await?;

    info!("Password changed for user {}", user.id);
    Ok(HttpResponse::Ok().json(json!({"message": "Password changed successfully"})))
}

/// Shallow-merge the body into the stored preferences
#[put("/preferences")]
pub async fn update_preferences(
    state: web::Data<AppState>,
    auth: AuthUser,
    payload: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    let Value::Object(changes) = payload.into_inner() else {
        return Err(ApiError::bad_request("Preferences must be a JSON object"));
    };

    let preferences = UserRepository::new(state.db.pool())
        .update_preferences(&auth.id, changes)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Preferences updated successfully",
        "preferences": preferences,
    })))
}
