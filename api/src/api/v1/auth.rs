//! POST /api/v1/auth/register, /login. Login mints a bearer token plus the
//! hardened fingerprint cookie that middleware later checks against it.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use chrono::Utc;
use cookie::{Cookie, SameSite};

use crate::errors::AppError;
use crate::middleware::FINGERPRINT_COOKIE;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use crate::state::AppState;
use crate::validation::naming::validate_username;
use clipcraft_shared::{Role, User};

fn fingerprint_cookie(raw_fingerprint: &str) -> String {
    Cookie::build((FINGERPRINT_COOKIE, raw_fingerprint.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
        .to_string()
}

pub async fn register(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = validate_username(&req.username).map_err(AppError::Validation)?;

    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = app_state.auth.hash_password(&req.password)?;

    let user = User {
        username,
        rev: None,
        password_hash,
        role: Role::User,
        email: req.email.clone(),
        verified: false,
    };

    let created = app_state.db.create_user(user, None).await.map_err(|e| match e {
        crate::db::RepoError::Duplicate(msg) => AppError::Conflict(msg),
        crate::db::RepoError::VersionConflict => AppError::Conflict("version conflict".to_string()),
        crate::db::RepoError::Other(e) => AppError::from(e),
    })?;

    log::info!("registered user {}", created.username);

    Ok(axum::http::StatusCode::CREATED)
}

pub async fn login(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.to_lowercase();
    let user = app_state
        .db
        .get_user_by_username(&username)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !app_state.auth.verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthenticated);
    }

    let credential = app_state.auth.issue_login_credential(&user.username)?;

    log::info!("user {} logged in at {}", user.username, Utc::now());

    let response = (
        [(SET_COOKIE, fingerprint_cookie(&credential.raw_fingerprint))],
        Json(LoginResponse {
            token: credential.token,
            username: user.username,
        }),
    );
    Ok(response)
}
