use std::collections::HashMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use clipcraft_shared::ProblemDetails;
use thiserror::Error;

/// Every error surfaced from a handler or a service called by one. Maps 1:1
/// onto the HTTP error table: validation -> 400, auth -> 401, ownership ->
/// 403, missing entity -> 404, illegal transition -> 409, oversized upload
/// -> 413, storage/internal -> 500. Never exposes paths, stack traces, or
/// ffmpeg stderr in the response body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("validation failed")]
    FieldValidation(HashMap<String, Vec<String>>),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("illegal transition: {0}")]
    Conflict(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::FieldValidation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_)
            | AppError::ConfigError(_)
            | AppError::Bcrypt(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message actually shown to the client. Internal-detail variants
    /// are logged in full by `into_response` and reduced to a generic
    /// message here so paths/stack traces never leak.
    fn public_detail(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::FieldValidation(_) => "one or more fields failed validation".to_string(),
            AppError::Unauthenticated => "authentication required".to_string(),
            AppError::Forbidden => "you do not have access to this resource".to_string(),
            AppError::NotFound(_) => "resource not found".to_string(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::PayloadTooLarge => "upload exceeds the configured size limit".to_string(),
            AppError::Jwt(_) => "authentication required".to_string(),
            AppError::Storage(_)
            | AppError::ConfigError(_)
            | AppError::Bcrypt(_)
            | AppError::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {self:?}");
        } else {
            log::warn!("request error: {self}");
        }

        let errors = match &self {
            AppError::FieldValidation(map) => Some(map.clone()),
            _ => None,
        };

        let body = ProblemDetails {
            kind: format!("about:blank#{}", status.as_u16()),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: self.public_detail(),
            instance: String::new(),
            timestamp: Utc::now(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}
