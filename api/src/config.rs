use std::env;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dotenvy::dotenv;

use crate::errors::AppError;

fn decode_min32(input: &str) -> Result<Vec<u8>, String> {
    let bytes = BASE64.decode(input.trim()).map_err(|e| e.to_string())?;
    if bytes.len() < 32 {
        return Err(format!(
            "decoded key is {} bytes, need at least 32",
            bytes.len()
        ));
    }
    Ok(bytes)
}

/// All runtime configuration, loaded once at startup from the environment
/// (`.env` is loaded first, if present, same as the teacher's convention).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    pub database_connection_string: String,
    pub database_name: String,
    pub database_user: String,
    pub database_password: String,

    pub storage_originals_path: String,
    pub storage_processed_path: String,
    pub storage_temp_path: String,
    pub upload_max_size_bytes: u64,

    pub ffmpeg_timeout_secs: u64,

    pub jwt_secret: Vec<u8>,
    pub jwt_expiration_ms: i64,
    pub jwt_issuer: String,

    pub sse_emitter_timeout_ms: u64,
    pub sse_heartbeat_interval_ms: u64,

    pub cors_allowed_origins: Vec<String>,
    pub frontend_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let jwt_secret_base64 = env::var("JWT_SECRET_KEY_BASE64")
            .unwrap_or_else(|_| "ZGV2ZWxvcG1lbnQtb25seS1zZWNyZXQta2V5LWNoYW5nZS1tZS0hIQ==".to_string());
        let jwt_secret = decode_min32(&jwt_secret_base64)
            .map_err(|e| AppError::ConfigError(format!("JWT_SECRET_KEY_BASE64: {e}")))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            database_connection_string: env::var("DB_CONNECTION_STRING")
                .unwrap_or_else(|_| "http://localhost:8529".to_string()),
            database_name: env::var("DB_NAME").unwrap_or_else(|_| "clipcraft".to_string()),
            database_user: env::var("DB_USER").unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DB_PASSWORD").unwrap_or_default(),

            storage_originals_path: env::var("VIDEO_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/originals".to_string()),
            storage_processed_path: env::var("VIDEO_STORAGE_PROCESSED_PATH")
                .unwrap_or_else(|_| "./data/processed".to_string()),
            storage_temp_path: env::var("VIDEO_STORAGE_TEMP_PATH")
                .unwrap_or_else(|_| "./data/temp".to_string()),
            upload_max_size_bytes: env::var("VIDEO_UPLOAD_MAX_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(40)
                * 1024
                * 1024,

            ffmpeg_timeout_secs: env::var("FFMPEG_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),

            jwt_secret,
            jwt_expiration_ms: env::var("JWT_EXPIRATION_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7 * 24 * 60 * 60 * 1000),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "clipcraft".to_string()),

            sse_emitter_timeout_ms: env::var("SSE_EMITTER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),
            sse_heartbeat_interval_ms: env::var("SSE_HEARTBEAT_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15_000),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            frontend_base_url: env::var("APP_FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}
