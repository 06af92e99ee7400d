use anyhow::anyhow;
use arangors::document::Document;
use clipcraft_shared::User;

use super::{ArangoDb, UNIQUE_CONSTRAINT_VIOLATED};
use crate::db::{BoxTransaction, RepoError};

impl ArangoDb {
    pub(crate) async fn do_create_user(
        &self,
        user: User,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<User, RepoError> {
        let doc = Document::new(user.clone());

        let result = if let Some(tr) = tx {
            let ar = Self::downcast_tx(tr)?;
            let col = ar
                .inner
                .collection("users")
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            col.create_document(doc, Default::default()).await
        } else {
            self.users.create_document(doc, Default::default()).await
        };

        match result {
            Ok(_) => Ok(user),
            Err(arangors::ClientError::Arango(e)) if e.code() == UNIQUE_CONSTRAINT_VIOLATED => {
                Err(RepoError::Duplicate(format!("username {}", user.username)))
            }
            Err(e) => Err(RepoError::Other(anyhow!(e.to_string()))),
        }
    }

    pub(crate) async fn do_get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        match self.users.document::<User>(username).await {
            Ok(doc) => Ok(Some(doc.document)),
            Err(arangors::ClientError::Arango(e)) if e.code() == 404 => Ok(None),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }

    pub(crate) async fn do_update_user(
        &self,
        user: User,
        tx: Option<&mut BoxTransaction>,
    ) -> Result<User, RepoError> {
        let key = user.username.clone();
        let expected_rev = user.rev.clone();

        if let Some(expected_rev) = &expected_rev {
            let current = self
                .do_get_user_by_username(&key)
                .await
                .map_err(RepoError::Other)?
                .ok_or_else(|| RepoError::Other(anyhow!("user {key} vanished mid-update")))?;
            if current.rev.as_ref() != Some(expected_rev) {
                return Err(RepoError::VersionConflict);
            }
        }

        let doc = Document::new(user.clone());
        let result = if let Some(tr) = tx {
            let ar = Self::downcast_tx(tr)?;
            let col = ar
                .inner
                .collection("users")
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            col.replace_document(&key, doc, Default::default(), None).await
        } else {
            self.users
                .replace_document(&key, doc, Default::default(), None)
                .await
        };

        result
            .map(|_| user)
            .map_err(|e| RepoError::Other(anyhow!(e.to_string())))
    }
}
