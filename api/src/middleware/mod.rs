//! Request-level authentication: verifies the bearer JWT, then verifies
//! that the `__Secure-Fgp` cookie on this request matches the fingerprint
//! the token was issued with, then loads the user and makes it available
//! to handlers via the `AuthenticatedUser` extractor.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::Auth;
use crate::errors::AppError;
use crate::state::AppState;
use clipcraft_shared::User;

pub const FINGERPRINT_COOKIE: &str = "__Secure-Fgp";

/// Paths reachable without a bearer token.
fn is_public(path: &str) -> bool {
    matches!(
        path,
        "/api/v1/auth/register" | "/api/v1/auth/login" | "/healthz"
    )
}

pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;
        Ok(AuthenticatedUser(user))
    }
}

fn read_cookie(parts: &Parts, name: &str) -> Option<String> {
    let header = parts.headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let pair = pair.trim();
        let (k, v) = pair.split_once('=')?;
        if k == name { Some(v.to_string()) } else { None }
    })
}

pub async fn jwt_auth_middleware(
    State(app_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    if is_public(parts.uri.path()) {
        let req = Request::from_parts(parts, body);
        return Ok(next.run(req).await);
    }

    let token = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .ok_or(AppError::Unauthenticated)?;

    let claims = app_state.auth.decode_token(&token).map_err(|e| {
        log::warn!("jwt validation failed: {e}");
        AppError::Unauthenticated
    })?;

    let raw_fingerprint = read_cookie(&parts, FINGERPRINT_COOKIE).ok_or(AppError::Unauthenticated)?;
    if !Auth::fingerprint_matches(&raw_fingerprint, &claims.fgp_hash) {
        log::warn!("fingerprint mismatch for subject {}", claims.sub);
        return Err(AppError::Unauthenticated);
    }

    let user = app_state
        .db
        .get_user_by_username(&claims.sub)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::Unauthenticated)?;

    parts.extensions.insert(user);

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}
