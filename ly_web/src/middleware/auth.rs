//! ABOUTME: Authentication middleware that resolves the caller from a JWT
//! ABOUTME: Never rejects; handlers decide through the AuthUser extractor

use crate::{auth::JwtAuth, error::ApiError, models::Claims, AppState};
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::{debug, warn};

pub const AUTH_COOKIE: &str = "auth_token";

/// Attaches an [`AuthUser`] to requests carrying a valid token
pub struct Authenticate;

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
}

/// Bearer header first, then the auth cookie
fn request_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer.or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if let Some(token) = request_token(&req).filter(|t| !t.is_empty()) {
                if let Some(state) = req.app_data::<web::Data<AppState>>() {
                    match JwtAuth::verify_token(&token, &state.security.jwt_secret) {
                        Ok(claims) => {
                            debug!("Authenticated request for user: {}", claims.sub);
                            req.extensions_mut().insert(AuthUser::from(claims));
                        }
                        Err(e) => warn!("Ignoring invalid token: {}", e),
                    }
                }
            }

            service.call(req).await
        })
    }
}

/// Authenticated caller
///
/// Used as an extractor it rejects anonymous requests with 401. Wrap it in
/// `Option` for endpoints that also serve guests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            get_http_auth_user(req)
                .ok_or_else(|| ApiError::unauthorized("Authentication required")),
        )
    }
}

/// Authenticated user of a request, if any
pub fn get_http_auth_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}

/// Owner key for activity records: the user id, or the shared guest id
pub fn user_or_guest(user: &Option<AuthUser>) -> &str {
    user.as_ref()
        .map(|u| u.id.as_str())
        .unwrap_or(ly_core::GUEST_USER_ID)
}
