//! Video upload, listing, editing, processing, download, and deletion.

use std::sync::Arc;

use axum::body::Bytes as AxumBytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::db::RepoError;
use crate::errors::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::{ListVideosQuery, UpdateDescriptionRequest};
use crate::state::AppState;
use crate::validation::description::validate_description;
use crate::validation::upload::{sanitize_filename, validate_upload};
use clipcraft_shared::{EditOptions, User, Video, VideoResponse, VideoStatus};

fn repo_err(e: RepoError) -> AppError {
    match e {
        RepoError::Duplicate(msg) => AppError::Conflict(msg),
        RepoError::VersionConflict => AppError::Conflict("video was modified concurrently".to_string()),
        RepoError::Other(e) => AppError::from(e),
    }
}

async fn owned_video(state: &AppState, user: &User, public_id: &str) -> Result<Video, AppError> {
    let video = state
        .db
        .get_video_by_public_id(public_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {public_id}")))?;
    if video.owner_username != user.username {
        return Err(AppError::Forbidden);
    }
    Ok(video)
}

pub async fn upload_video(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file_bytes: Option<Bytes> = None;
    let mut content_type: Option<String> = None;
    let mut filename = "upload.mp4".to_string();
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                content_type = field.content_type().map(|s| s.to_string());
                filename = field.file_name().map(sanitize_filename).unwrap_or(filename);
                file_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?,
                );
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    validate_upload(&bytes, content_type.as_deref(), &filename, state.config.upload_max_size_bytes)?;
    validate_description(&description).map_err(AppError::Validation)?;

    let public_id = Uuid::new_v4().to_string();
    let storage_path = format!("{}/{}_{}", user.username, public_id, filename);

    state
        .originals_store
        .store(&storage_path, bytes.clone())
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let video = Video {
        id: String::new(),
        rev: None,
        public_id: public_id.clone(),
        owner_username: user.username.clone(),
        description,
        uploaded_at: Utc::now(),
        storage_path,
        processed_storage_path: None,
        file_size: bytes.len() as u64,
        mime_type: content_type.unwrap_or_else(|| "video/mp4".to_string()),
        duration: None,
        status: VideoStatus::Uploaded,
    };

    let created = state.db.create_video(video, None).await.map_err(repo_err)?;

    log::info!("video {} uploaded by {}", created.public_id, user.username);

    Ok((axum::http::StatusCode::CREATED, Json(VideoResponse::from(&created))))
}

pub async fn list_videos(
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListVideosQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .db
        .list_videos_by_owner(&user.username, query.page, query.size)
        .await?;

    let items: Vec<VideoResponse> = page.items.iter().map(VideoResponse::from).collect();
    Ok(Json(clipcraft_shared::Page {
        items,
        page: page.page,
        size: page.size,
        total: page.total,
    }))
}

pub async fn get_video(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let video = owned_video(&state, &user, &public_id).await?;
    Ok(Json(VideoResponse::from(&video)))
}

pub async fn update_description(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateDescriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_description(&req.description).map_err(AppError::Validation)?;

    let mut video = owned_video(&state, &user, &public_id).await?;
    video.description = req.description;
    let updated = state.db.update_video(video, None).await.map_err(repo_err)?;
    Ok(Json(VideoResponse::from(&updated)))
}

pub async fn process_video(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(edit): Json<EditOptions>,
) -> Result<impl IntoResponse, AppError> {
    let video = owned_video(&state, &user, &public_id).await?;

    let updated = state.status_updater.to_processing(&video.id).await?;
    state.orchestrator.spawn(updated.id.clone(), updated.storage_path.clone(), edit);

    Ok((axum::http::StatusCode::ACCEPTED, Json(VideoResponse::from(&updated))))
}

pub async fn download_video(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let video = owned_video(&state, &user, &public_id).await?;

    if video.status != VideoStatus::Ready {
        return Err(AppError::Conflict("video is not ready for download".to_string()));
    }
    let processed_path = video
        .processed_storage_path
        .ok_or_else(|| AppError::Conflict("video has no processed output".to_string()))?;

    let processed_store = crate::services::blobstore::BlobStore::new(&state.config.storage_processed_path);
    let bytes = processed_store
        .load(&processed_path)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let body = AxumBytes::from(bytes);
    Ok((
        [
            (CONTENT_TYPE, "video/mp4".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.mp4\"", video.public_id),
            ),
        ],
        body,
    ))
}

pub async fn download_original_video(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let video = owned_video(&state, &user, &public_id).await?;

    let bytes = state
        .originals_store
        .load(&video.storage_path)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let body = AxumBytes::from(bytes);
    Ok((
        [
            (CONTENT_TYPE, video.mime_type.clone()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.mp4\"", video.public_id),
            ),
        ],
        body,
    ))
}

pub async fn delete_video(
    AuthenticatedUser(user): AuthenticatedUser,
    Path(public_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let video = owned_video(&state, &user, &public_id).await?;

    state.db.delete_video(&video).await?;

    let _ = state.originals_store.delete(&video.storage_path).await;
    if let Some(processed) = &video.processed_storage_path {
        let processed_store = crate::services::blobstore::BlobStore::new(&state.config.storage_processed_path);
        let _ = processed_store.delete(processed).await;
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}
