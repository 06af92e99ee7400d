use std::collections::HashMap;

use anyhow::anyhow;
use arangors::document::Document;
use clipcraft_shared::{Page, Video};
use serde_json::Value;

use super::{ArangoDb, UNIQUE_CONSTRAINT_VIOLATED};
use crate::db::{BoxTransaction, RepoError};

impl ArangoDb {
    pub(crate) async fn do_create_video(
        &self,
        video: Video,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<Video, RepoError> {
        let doc = Document::new(video.clone());

        let result = if let Some(tr) = tx {
            let ar = Self::downcast_tx(tr)?;
            let col = ar
                .inner
                .collection("videos")
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            col.create_document(doc, Default::default()).await
        } else {
            self.videos.create_document(doc, Default::default()).await
        };

        match result {
            Ok(created) => {
                let mut video = video;
                video.id = created.header()._key.clone();
                video.rev = Some(created.header()._rev.clone());
                Ok(video)
            }
            Err(arangors::ClientError::Arango(e)) if e.code() == UNIQUE_CONSTRAINT_VIOLATED => {
                Err(RepoError::Duplicate(format!("video {}", video.public_id)))
            }
            Err(e) => Err(RepoError::Other(anyhow!(e.to_string()))),
        }
    }

    pub(crate) async fn do_get_video_by_id(&self, id: &str) -> anyhow::Result<Option<Video>> {
        match self.videos.document::<Video>(id).await {
            Ok(doc) => Ok(Some(doc.document)),
            Err(arangors::ClientError::Arango(e)) if e.code() == 404 => Ok(None),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }

    pub(crate) async fn do_get_video_by_public_id(&self, public_id: &str) -> anyhow::Result<Option<Video>> {
        let query = r#"
            FOR v IN videos
                FILTER v.public_id == @public_id
                LIMIT 1
                RETURN v
        "#;
        let vars = HashMap::from([("public_id", Value::String(public_id.to_string()))]);
        let mut rows: Vec<Video> = self
            .db
            .aql_bind_vars(query, vars)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(rows.pop())
    }

    pub(crate) async fn do_list_videos_by_owner(
        &self,
        owner_username: &str,
        page: u64,
        size: u64,
    ) -> anyhow::Result<Page<Video>> {
        let offset = page.saturating_sub(1) * size;

        let query = r#"
            FOR v IN videos
                FILTER v.owner_username == @owner
                SORT v.uploaded_at DESC
                LIMIT @offset, @size
                RETURN v
        "#;
        let vars: HashMap<&str, Value> = HashMap::from([
            ("owner", Value::String(owner_username.to_string())),
            ("offset", Value::from(offset)),
            ("size", Value::from(size)),
        ]);
        let items: Vec<Video> = self
            .db
            .aql_bind_vars(query, vars)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        let count_query = r#"
            RETURN LENGTH(
                FOR v IN videos
                    FILTER v.owner_username == @owner
                    RETURN 1
            )
        "#;
        let count_vars: HashMap<&str, Value> =
            HashMap::from([("owner", Value::String(owner_username.to_string()))]);
        let total: Vec<u64> = self
            .db
            .aql_bind_vars(count_query, count_vars)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        Ok(Page {
            items,
            page,
            size,
            total: total.into_iter().next().unwrap_or(0),
        })
    }

    pub(crate) async fn do_update_video(
        &self,
        video: Video,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<Video, RepoError> {
        let key = video.id.clone();
        let expected_rev = video.rev.clone();

        if let Some(expected_rev) = &expected_rev {
            let current = self
                .do_get_video_by_id(&key)
                .await
                .map_err(RepoError::Other)?
                .ok_or_else(|| RepoError::Other(anyhow!("video {key} vanished mid-update")))?;
            if current.rev.as_ref() != Some(expected_rev) {
                return Err(RepoError::VersionConflict);
            }
        }

        let doc = Document::new(video.clone());
        let result = if let Some(tr) = tx {
            let ar = Self::downcast_tx(tr)?;
            let col = ar
                .inner
                .collection("videos")
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            col.replace_document(&key, doc, Default::default(), None).await
        } else {
            self.videos
                .replace_document(&key, doc, Default::default(), None)
                .await
        };

        match result {
            Ok(updated) => {
                let mut video = video;
                video.rev = Some(updated.header()._rev.clone());
                Ok(video)
            }
            Err(arangors::ClientError::Arango(e)) if e.code() == UNIQUE_CONSTRAINT_VIOLATED => {
                Err(RepoError::Duplicate(format!("video {}", video.public_id)))
            }
            Err(e) => Err(RepoError::Other(anyhow!(e.to_string()))),
        }
    }

    pub(crate) async fn do_delete_video(&self, video: &Video) -> anyhow::Result<()> {
        self.videos
            .remove_document::<Value>(&video.id, Default::default(), None)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(())
    }
}
