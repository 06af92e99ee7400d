use std::any::Any;

use anyhow::Result;
use async_trait::async_trait;
use clipcraft_shared::{Page, User, Video};
use thiserror::Error;

pub mod arangodb;

/// Transaction handle: commit/abort plus a downcast escape hatch so a
/// backend-specific repository method can reach its own transaction type.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(&mut self) -> Result<()>;
    async fn abort(&mut self) -> Result<()>;
    fn as_any(&mut self) -> &mut dyn Any;
}

pub type BoxTransaction = Box<dyn Transaction>;

/// Failure modes a repository call can surface beyond a bare I/O error,
/// so callers (the status updater, the video handlers) can react without
/// string-matching an `anyhow::Error`.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("version conflict")]
    VersionConflict,
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    /// Begin a server-side transaction. `None` if the backend has none (used
    /// by in-memory test doubles).
    async fn begin_transaction(&self) -> Result<Option<BoxTransaction>>;

    async fn create_user(&self, user: User, tx: Option<&mut BoxTransaction>) -> Result<User, RepoError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: User, tx: Option<&mut BoxTransaction>) -> Result<User, RepoError>;

    async fn create_video(&self, video: Video, tx: Option<&mut BoxTransaction>) -> Result<Video, RepoError>;
    async fn get_video_by_id(&self, id: &str) -> Result<Option<Video>>;
    async fn get_video_by_public_id(&self, public_id: &str) -> Result<Option<Video>>;
    async fn list_videos_by_owner(&self, owner_username: &str, page: u64, size: u64) -> Result<Page<Video>>;

    /// Replaces the document, enforcing optimistic concurrency against
    /// `video.rev`: a stale `rev` yields `RepoError::VersionConflict`.
    async fn update_video(&self, video: Video, tx: Option<&mut BoxTransaction>) -> Result<Video, RepoError>;
    async fn delete_video(&self, video: &Video) -> Result<()>;
}
