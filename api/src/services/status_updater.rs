//! Component C — Status Updater. Every lifecycle transition runs inside its
//! own database transaction; the status-changed event is only published to
//! the event bus after that transaction commits, so listeners never see a
//! status that the database might still roll back.

use std::sync::Arc;

use clipcraft_shared::{Video, VideoStatus, VideoStatusChanged};

use crate::db::{BoxTransaction, DatabaseInterface, RepoError};
use crate::errors::AppError;

use super::event_bus::EventBus;

pub struct StatusUpdater {
    db: Arc<dyn DatabaseInterface>,
    event_bus: Arc<EventBus>,
}

impl StatusUpdater {
    pub fn new(db: Arc<dyn DatabaseInterface>, event_bus: Arc<EventBus>) -> Self {
        Self { db, event_bus }
    }

    /// UPLOADED|READY|PROCESSING -> PROCESSING. Re-entering PROCESSING from
    /// PROCESSING is allowed (a retry after a transient orchestrator
    /// failure), and re-editing a READY video sends it back through the
    /// pipeline, clearing the stale processed output.
    pub async fn to_processing(&self, video_id: &str) -> Result<Video, AppError> {
        self.run_transition(
            video_id,
            |status| {
                matches!(
                    status,
                    VideoStatus::Uploaded | VideoStatus::Ready | VideoStatus::Processing
                )
            },
            |video| {
                video.status = VideoStatus::Processing;
                video.processed_storage_path = None;
            },
            None,
        )
        .await
    }

    pub async fn to_ready(
        &self,
        video_id: &str,
        processed_storage_path: String,
        duration: Option<f64>,
    ) -> Result<Video, AppError> {
        self.run_transition(
            video_id,
            |status| matches!(status, VideoStatus::Processing),
            move |video| {
                video.status = VideoStatus::Ready;
                video.processed_storage_path = Some(processed_storage_path.clone());
                video.duration = duration;
            },
            None,
        )
        .await
    }

    pub async fn to_failed(&self, video_id: &str, reason: impl Into<String>) -> Result<Video, AppError> {
        let reason = reason.into();
        self.run_transition(
            video_id,
            |status| matches!(status, VideoStatus::Processing),
            |video| {
                video.status = VideoStatus::Failed;
                video.processed_storage_path = None;
            },
            Some(reason),
        )
        .await
    }

    async fn run_transition(
        &self,
        video_id: &str,
        allowed_from: impl Fn(VideoStatus) -> bool,
        apply: impl FnOnce(&mut Video),
        message: Option<String>,
    ) -> Result<Video, AppError> {
        let mut tx: Option<BoxTransaction> = self.db.begin_transaction().await?;

        let current = self
            .db
            .get_video_by_id(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {video_id}")))?;

        if !allowed_from(current.status) {
            if let Some(mut tx) = tx.take() {
                let _ = tx.abort().await;
            }
            return Err(AppError::Conflict(format!(
                "cannot transition video {video_id} out of {}",
                current.status
            )));
        }

        let mut next = current.clone();
        apply(&mut next);

        let updated = match self.db.update_video(next, tx.as_mut()).await {
            Ok(v) => v,
            Err(RepoError::VersionConflict) => {
                if let Some(mut tx) = tx.take() {
                    let _ = tx.abort().await;
                }
                return Err(AppError::Conflict(format!(
                    "video {video_id} was modified concurrently"
                )));
            }
            Err(e) => {
                if let Some(mut tx) = tx.take() {
                    let _ = tx.abort().await;
                }
                return Err(AppError::from(anyhow::anyhow!(e.to_string())));
            }
        };

        if let Some(mut tx) = tx.take() {
            tx.commit().await.map_err(AppError::from)?;
        }

        let mut event = VideoStatusChanged::new(
            updated.id.clone(),
            updated.public_id.clone(),
            updated.owner_username.clone(),
            updated.status,
        );
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.event_bus.publish(event);

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use clipcraft_shared::{Page, User};
    use std::any::Any;
    use std::sync::Mutex;

    use super::*;
    use crate::db::Transaction;

    struct NoopTx;

    #[async_trait]
    impl Transaction for NoopTx {
        async fn commit(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn abort(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn as_any(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct FakeDb {
        video: Mutex<Video>,
    }

    #[async_trait]
    impl DatabaseInterface for FakeDb {
        async fn begin_transaction(&self) -> anyhow::Result<Option<BoxTransaction>> {
            Ok(Some(Box::new(NoopTx)))
        }

        async fn create_user(&self, user: User, _tx: Option<&mut BoxTransaction>) -> Result<User, RepoError> {
            Ok(user)
        }
        async fn get_user_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn update_user(&self, user: User, _tx: Option<&mut BoxTransaction>) -> Result<User, RepoError> {
            Ok(user)
        }

        async fn create_video(&self, video: Video, _tx: Option<&mut BoxTransaction>) -> Result<Video, RepoError> {
            Ok(video)
        }
        async fn get_video_by_id(&self, id: &str) -> anyhow::Result<Option<Video>> {
            let video = self.video.lock().unwrap();
            if video.id == id {
                Ok(Some(video.clone()))
            } else {
                Ok(None)
            }
        }
        async fn get_video_by_public_id(&self, _public_id: &str) -> anyhow::Result<Option<Video>> {
            Ok(None)
        }
        async fn list_videos_by_owner(&self, _owner: &str, page: u64, size: u64) -> anyhow::Result<Page<Video>> {
            Ok(Page { items: vec![], page, size, total: 0 })
        }
        async fn update_video(&self, video: Video, _tx: Option<&mut BoxTransaction>) -> Result<Video, RepoError> {
            let mut guard = self.video.lock().unwrap();
            *guard = video.clone();
            Ok(video)
        }
        async fn delete_video(&self, _video: &Video) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn video() -> Video {
        Video {
            id: "v1".to_string(),
            rev: Some("1".to_string()),
            public_id: "pub-1".to_string(),
            owner_username: "alice".to_string(),
            description: "clip".to_string(),
            uploaded_at: chrono::Utc::now(),
            storage_path: "originals/v1.mp4".to_string(),
            processed_storage_path: None,
            file_size: 100,
            mime_type: "video/mp4".to_string(),
            duration: None,
            status: VideoStatus::Uploaded,
        }
    }

    #[tokio::test]
    async fn advances_uploaded_to_processing() {
        let db = Arc::new(FakeDb { video: Mutex::new(video()) });
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let updater = StatusUpdater::new(db, bus);

        let updated = updater.to_processing("v1").await.unwrap();
        assert_eq!(updated.status, VideoStatus::Processing);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, VideoStatus::Processing);
    }

    #[tokio::test]
    async fn rejects_ready_from_uploaded() {
        let db = Arc::new(FakeDb { video: Mutex::new(video()) });
        let bus = Arc::new(EventBus::new(8));
        let updater = StatusUpdater::new(db, bus);

        let err = updater.to_ready("v1", "processed/v1.mp4".to_string(), Some(12.5)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn allows_processing_reentry() {
        let mut v = video();
        v.status = VideoStatus::Processing;
        let db = Arc::new(FakeDb { video: Mutex::new(v) });
        let bus = Arc::new(EventBus::new(8));
        let updater = StatusUpdater::new(db, bus);

        let updated = updater.to_processing("v1").await.unwrap();
        assert_eq!(updated.status, VideoStatus::Processing);
    }

    #[tokio::test]
    async fn reprocessing_a_ready_video_clears_processed_path() {
        let mut v = video();
        v.status = VideoStatus::Ready;
        v.processed_storage_path = Some("processed/v1.mp4".to_string());
        let db = Arc::new(FakeDb { video: Mutex::new(v) });
        let bus = Arc::new(EventBus::new(8));
        let updater = StatusUpdater::new(db, bus);

        let updated = updater.to_processing("v1").await.unwrap();
        assert_eq!(updated.status, VideoStatus::Processing);
        assert_eq!(updated.processed_storage_path, None);
    }
}
