pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
#[cfg(test)]
pub mod test;
pub mod validation;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::db::arangodb::ArangoDb;
use crate::services::mailer::LoggingMailer;
use crate::state::AppState;

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    };

    let v1 = Router::new()
        .route("/auth/register", post(api::v1::auth::register))
        .route("/auth/login", post(api::v1::auth::login))
        .route("/videos", get(api::v1::videos::list_videos).post(api::v1::videos::upload_video))
        .route(
            "/videos/{public_id}",
            get(api::v1::videos::get_video)
                .put(api::v1::videos::update_description)
                .delete(api::v1::videos::delete_video),
        )
        .route("/videos/{public_id}/process", post(api::v1::videos::process_video))
        .route("/videos/{public_id}/download", get(api::v1::videos::download_video))
        .route(
            "/videos/{public_id}/download/original",
            get(api::v1::videos::download_original_video),
        );

    Router::new()
        .route("/healthz", get(health_check))
        .nest("/api/v1", v1)
        .route("/api/sse/subscribe", get(api::v1::sse::subscribe))
        .layer(from_fn_with_state(state.clone(), middleware::jwt_auth_middleware))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    info!("starting clipcraft-api on {}:{}", config.host, config.port);

    let db = ArangoDb::connect(
        &config.database_connection_string,
        &config.database_user,
        &config.database_password,
        &config.database_name,
    )
    .await?;

    let state = AppState::new(config.clone(), Arc::new(db), Arc::new(LoggingMailer));
    let app = create_app(state);

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_address).await?;
    info!("listening on {bind_address}");
    axum::serve(listener, app).await?;

    Ok(())
}
