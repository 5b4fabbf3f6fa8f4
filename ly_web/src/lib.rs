//! ABOUTME: Web API layer with authentication and routing
//! ABOUTME: Provides REST endpoints and OpenAPI documentation

use actix_web::{web, App, HttpResponse, HttpServer};
use ly_config::{Config, ExternalConfig, SecurityConfig, ServerConfig};
use ly_core::Result;
use ly_db::Db;
use ly_external::MusicCatalog;
use ly_obs::Metrics;
use std::sync::Arc;
use utoipa::OpenApi;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use error::ApiError;
use routes::{activity, auth as auth_routes, misc, music, playlists};

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Db,
    pub security: SecurityConfig,
    pub server: ServerConfig,
    pub external: ExternalConfig,
    pub catalog: MusicCatalog,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(db: Db, config: &Config, catalog: MusicCatalog, metrics: Arc<Metrics>) -> Self {
        Self {
            db,
            security: config.security.clone(),
            server: config.server.clone(),
            external: config.external.clone(),
            catalog,
            metrics,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        auth_routes::register,
        auth_routes::login,
        auth_routes::get_profile,
        music::search,
        music::trending,
        music::song_details,
        music::like,
        music::play,
        music::status,
    ),
    components(
        schemas(
            models::RegisterRequest,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::UserSummary,
            models::ErrorResponse,
        ),
    ),
    tags(
        (name = "auth", description = "Account endpoints"),
        (name = "music", description = "Music catalog endpoints"),
    )
)]
pub struct ApiDoc;

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(models::ErrorResponse::new(
        "not_found",
        "Endpoint not found",
    ))
}

/// Create the main web application service factory
pub fn create_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default()
        .limit(state.server.json_limit)
        .error_handler(|err, _req| {
            tracing::debug!("Rejected JSON body: {}", err);
            ApiError::invalid_json().into()
        });
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("Invalid query string: {}", err)).into()
    });

    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config)
        .app_data(query_config)
        .wrap(middleware::auth::Authenticate)
        .wrap(middleware::metrics::RequestMetrics)
        .wrap(actix_web::middleware::Logger::default())
        .configure(auth_routes::configure)
        .configure(music::configure)
        .configure(playlists::configure)
        .configure(activity::configure)
        .configure(misc::configure)
        .default_service(web::route().to(not_found))
}

/// Start the web server
pub async fn start_server(bind_addr: &str, state: AppState) -> Result<()> {
    tracing::info!("Starting web server on {}", bind_addr);

    HttpServer::new(move || create_app(state.clone()))
        .bind(bind_addr)
        .map_err(|e| ly_core::Error::Config(format!("Failed to bind web server: {}", e)))?
        .run()
        .await
        .map_err(|e| ly_core::Error::Config(format!("Web server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests;
