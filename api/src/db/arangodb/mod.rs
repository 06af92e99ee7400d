//! ArangoDB-backed `DatabaseInterface`. Collections are expected to already
//! carry unique persistent indexes on `videos.public_id`,
//! `videos.storage_path`, `videos.processed_storage_path`, and the `users`
//! primary key doubling as username; this layer reacts to the resulting
//! unique-constraint violation (Arango error code 1210) rather than
//! creating indexes itself.

use std::any::Any;

use anyhow::{Result, anyhow};
use arangors::Connection;
use arangors::client::reqwest::ReqwestClient;
use arangors::collection::Collection;
use arangors::database::Database;
use arangors::transaction::{
    Transaction as ArangoInnerTx, TransactionCollections, TransactionSettings,
};
use async_trait::async_trait;

use super::{BoxTransaction, DatabaseInterface, RepoError, Transaction};

mod users;
mod videos;

pub(crate) const UNIQUE_CONSTRAINT_VIOLATED: i32 = 1210;

pub struct ArangoTx {
    pub(crate) inner: ArangoInnerTx<ReqwestClient>,
}

impl ArangoTx {
    fn new(inner: ArangoInnerTx<ReqwestClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transaction for ArangoTx {
    async fn commit(&mut self) -> Result<()> {
        self.inner.commit().await.map_err(|e| anyhow!(e.to_string()))?;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.inner.abort().await.map_err(|e| anyhow!(e.to_string()))?;
        Ok(())
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct ArangoDb {
    pub conn: Connection,
    pub db: Database<ReqwestClient>,
    pub(crate) videos: Collection<ReqwestClient>,
    pub(crate) users: Collection<ReqwestClient>,
}

impl ArangoDb {
    pub async fn connect(url: &str, user: &str, pass: &str, db_name: &str) -> Result<Self> {
        let conn = Connection::establish_basic_auth(url, user, pass)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        let db = match conn.db(db_name).await {
            Ok(db) => db,
            Err(_) => {
                conn.create_database(db_name)
                    .await
                    .map_err(|e| anyhow!(e.to_string()))?;
                conn.db(db_name).await.map_err(|e| anyhow!(e.to_string()))?
            }
        };

        let videos = match db.collection("videos").await {
            Ok(c) => c,
            Err(_) => db
                .create_collection("videos")
                .await
                .map_err(|e| anyhow!(e.to_string()))?,
        };
        let users = match db.collection("users").await {
            Ok(c) => c,
            Err(_) => db
                .create_collection("users")
                .await
                .map_err(|e| anyhow!(e.to_string()))?,
        };

        Ok(Self {
            conn,
            db,
            videos,
            users,
        })
    }

    pub(crate) fn downcast_tx(tx: &mut BoxTransaction) -> Result<&mut ArangoTx> {
        tx.as_any()
            .downcast_mut::<ArangoTx>()
            .ok_or_else(|| anyhow!("transaction is not an ArangoTx"))
    }
}

#[async_trait]
impl DatabaseInterface for ArangoDb {
    async fn begin_transaction(&self) -> Result<Option<BoxTransaction>> {
        let collections = TransactionCollections::builder()
            .write(vec!["videos".to_string(), "users".to_string()])
            .build();
        let settings = TransactionSettings::builder()
            .collections(collections)
            .wait_for_sync(true)
            .build();

        let tx = self
            .db
            .begin_transaction(settings)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        Ok(Some(Box::new(ArangoTx::new(tx))))
    }

    async fn create_user(
        &self,
        user: clipcraft_shared::User,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<clipcraft_shared::User, RepoError> {
        self.do_create_user(user, tx).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<clipcraft_shared::User>> {
        self.do_get_user_by_username(username).await
    }

    async fn update_user(
        &self,
        user: clipcraft_shared::User,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<clipcraft_shared::User, RepoError> {
        self.do_update_user(user, tx).await
    }

    async fn create_video(
        &self,
        video: clipcraft_shared::Video,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<clipcraft_shared::Video, RepoError> {
        self.do_create_video(video, tx).await
    }

    async fn get_video_by_id(&self, id: &str) -> Result<Option<clipcraft_shared::Video>> {
        self.do_get_video_by_id(id).await
    }

    async fn get_video_by_public_id(&self, public_id: &str) -> Result<Option<clipcraft_shared::Video>> {
        self.do_get_video_by_public_id(public_id).await
    }

    async fn list_videos_by_owner(
        &self,
        owner_username: &str,
        page: u64,
        size: u64,
    ) -> Result<clipcraft_shared::Page<clipcraft_shared::Video>> {
        self.do_list_videos_by_owner(owner_username, page, size).await
    }

    async fn update_video(
        &self,
        video: clipcraft_shared::Video,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<clipcraft_shared::Video, RepoError> {
        self.do_update_video(video, tx).await
    }

    async fn delete_video(&self, video: &clipcraft_shared::Video) -> Result<()> {
        self.do_delete_video(video).await
    }
}
